use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use rand::{ SeedableRng, rngs::StdRng };
use hodensity::{ Basis, BasisConfig, density::random_block_rho, io };

/// Write a random m-block-diagonal symmetric coefficient matrix for a basis.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Output path.
    #[arg(default_value = "rho.arma")]
    output: PathBuf,

    /// Truncation parameter N.
    #[arg(short = 'N', long, default_value_t = 14)]
    n: usize,

    /// Truncation parameter Q.
    #[arg(short = 'Q', long, default_value_t = 1.3)]
    q: f64,

    /// Random seed.
    #[arg(long, default_value_t = 10546)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let basis = Basis::new(BasisConfig { n: args.n, q: args.q, ..BasisConfig::default() })?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let rho = random_block_rho(&basis, &mut rng);
    io::write_matrix(&args.output, &rho)
        .with_context(|| format!("writing {:?}", args.output))?;
    println!("wrote {0} × {0} matrix to {1:?}", basis.size(), args.output);
    Ok(())
}
