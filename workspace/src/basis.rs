use clap::Parser;
use hodensity::{ Basis, BasisConfig };

/// List the states of a truncated basis with their flat indices.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Truncation parameter N.
    #[arg(short = 'N', long, default_value_t = 14)]
    n: usize,

    /// Truncation parameter Q.
    #[arg(short = 'Q', long, default_value_t = 1.3)]
    q: f64,

    /// Only print the truncation bounds.
    #[arg(short, long)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let basis = Basis::new(BasisConfig { n: args.n, q: args.q, ..BasisConfig::default() })?;
    println!("{basis}");
    println!("nMax = {:?}", basis.n_max());
    println!("n_zMax =\n{}", basis.nz_max());
    if args.summary { return Ok(()); }
    println!("{:>6} {:>4} {:>4} {:>4}", "k", "m", "n", "n_z");
    for (k, idx) in basis.indices().enumerate() {
        println!("{:>6} {:>4} {:>4} {:>4}", k, idx.m, idx.n, idx.nz);
    }
    Ok(())
}
