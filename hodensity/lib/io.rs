//! Plain-text matrix files.
//!
//! Matrices are stored one row per line with whitespace-separated entries.
//! Blank lines are ignored. A file may begin with an Armadillo text header
//! giving the expected shape,
//! ```text
//! ARMA_MAT_TXT_FN008
//! 3 3
//! ```
//! in which case the body must agree with it.

use std::{
    fs::File,
    io::{ BufRead, BufReader, BufWriter, Write },
    path::Path,
};
use ndarray as nd;
use crate::{ Arr2, error::DensityError };

/// First line of an Armadillo plain-text matrix file.
pub const ARMA_HEADER: &str = "ARMA_MAT_TXT_FN008";

pub type IoResult<T> = Result<T, DensityError>;

fn parse_shape(line: usize, s: &str) -> IoResult<(usize, usize)> {
    let dims: Vec<usize>
        = s.split_whitespace()
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|_| DensityError::parse(line, format!("bad shape token {tok:?}")))
        })
        .collect::<IoResult<_>>()?;
    match dims[..] {
        [rows, cols] => Ok((rows, cols)),
        _ => Err(DensityError::parse(line, "expected `rows cols` after header")),
    }
}

/// Parse a matrix from a reader.
pub fn parse_matrix<R>(reader: R) -> IoResult<nd::Array2<f64>>
where R: BufRead
{
    let mut shape: Option<(usize, usize)> = None;
    let mut expect_shape = false;
    let mut cols: Option<usize> = None;
    let mut data: Vec<f64> = Vec::new();
    let mut rows: usize = 0;
    for (k, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = k + 1;
        let trimmed = line.trim();
        if k == 0 && trimmed == ARMA_HEADER {
            expect_shape = true;
            continue;
        }
        if expect_shape {
            shape = Some(parse_shape(lineno, trimmed)?);
            expect_shape = false;
            continue;
        }
        if trimmed.is_empty() { continue; }
        let len0 = data.len();
        for tok in trimmed.split_whitespace() {
            let x: f64
                = tok.parse()
                .map_err(|_| DensityError::parse(lineno, format!("bad value {tok:?}")))?;
            data.push(x);
        }
        let len = data.len() - len0;
        match cols {
            Some(c) if c != len => {
                return Err(DensityError::parse(
                    lineno, format!("expected {c} entries; got {len}")));
            },
            Some(_) => { },
            None => { cols = Some(len); },
        }
        rows += 1;
    }
    if expect_shape {
        return Err(DensityError::parse(2, "missing shape after header"));
    }
    let cols = cols.unwrap_or(0);
    if let Some((hrows, hcols)) = shape {
        // an empty body stands for any empty shape
        if (rows, cols) != (hrows, hcols) && !(rows == 0 && hrows * hcols == 0) {
            return Err(DensityError::parse(
                2,
                format!("header gives {hrows}×{hcols}; body is {rows}×{cols}"),
            ));
        }
        if rows == 0 {
            return Ok(nd::Array2::zeros((hrows, hcols)));
        }
    }
    nd::Array2::from_shape_vec((rows, cols), data)
        .map_err(|err| DensityError::parse(0, err.to_string()))
}

/// Read a matrix from a file.
pub fn read_matrix<P>(path: P) -> IoResult<nd::Array2<f64>>
where P: AsRef<Path>
{
    parse_matrix(BufReader::new(File::open(path)?))
}

/// Write a matrix to a writer with an Armadillo header.
pub fn format_matrix<S, W>(mut writer: W, a: &Arr2<S>) -> IoResult<()>
where
    S: nd::Data<Elem = f64>,
    W: Write,
{
    writeln!(writer, "{ARMA_HEADER}")?;
    writeln!(writer, "{} {}", a.nrows(), a.ncols())?;
    for row in a.rows() {
        let mut first = true;
        for x in row.iter() {
            if !first { write!(writer, " ")?; }
            write!(writer, "{x:.16e}")?;
            first = false;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a matrix to a file with an Armadillo header.
pub fn write_matrix<P, S>(path: P, a: &Arr2<S>) -> IoResult<()>
where
    P: AsRef<Path>,
    S: nd::Data<Elem = f64>,
{
    format_matrix(BufWriter::new(File::create(path)?), a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> IoResult<nd::Array2<f64>> {
        parse_matrix(s.as_bytes())
    }

    fn parse_err_line(s: &str) -> usize {
        match parse(s) {
            Err(DensityError::Parse { line, .. }) => line,
            other => panic!("expected parse error; got {other:?}"),
        }
    }

    #[test]
    fn bare_matrix() {
        let a = parse("1 2 3\n4 5 6\n\n").unwrap();
        assert_eq!(a, nd::array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn armadillo_header() {
        let s = "ARMA_MAT_TXT_FN008\n2 2\n  1.5e0  -2.0\n-2.0 3.25e-1\n";
        let a = parse(s).unwrap();
        assert_eq!(a, nd::array![[1.5, -2.0], [-2.0, 0.325]]);
    }

    #[test]
    fn malformed_input() {
        assert_eq!(parse_err_line("1 2\n3\n"), 2);
        assert_eq!(parse_err_line("1 2\n3 x\n"), 2);
        assert_eq!(parse_err_line("ARMA_MAT_TXT_FN008\n3 3\n1 2 3\n"), 2);
        assert_eq!(parse_err_line("ARMA_MAT_TXT_FN008\nthree 3\n"), 2);
        assert_eq!(parse_err_line("ARMA_MAT_TXT_FN008\n"), 2);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse("").unwrap().shape(), &[0, 0]);
        assert_eq!(parse("ARMA_MAT_TXT_FN008\n0 0\n").unwrap().shape(), &[0, 0]);
    }

    #[test]
    fn write_then_read_file() {
        let a = nd::array![[0.1, -2.5e-12, 3.0], [4.0, 1.0 / 3.0, -6.0]];
        let path = std::env::temp_dir()
            .join(format!("hodensity-io-{}.txt", std::process::id()));
        write_matrix(&path, &a).unwrap();
        let b = read_matrix(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_matrix("/nonexistent/rho.arma"),
            Err(DensityError::Io(_)),
        ));
    }
}
