use std::{ path::PathBuf, time::Instant };
use anyhow::{ bail, Context };
use clap::Parser;
use ndarray as nd;
use rand::{ SeedableRng, rngs::StdRng };
use hodensity::{
    Basis,
    BasisConfig,
    DEF_EPSILON,
    DensityCalculator,
    GridConfig,
    Strategy,
    density::random_block_rho,
    utils::relative_diff,
};

/// Run every summation strategy on the same input and compare the results
/// against the reference.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Coefficient matrix file; a random m-block-diagonal matrix is used if
    /// absent.
    #[arg(long)]
    rho: Option<PathBuf>,

    /// Truncation parameter N.
    #[arg(short = 'N', long, default_value_t = 4)]
    n: usize,

    /// Truncation parameter Q.
    #[arg(short = 'Q', long, default_value_t = 1.3)]
    q: f64,

    /// Seed for the random coefficient matrix.
    #[arg(long, default_value_t = 10546)]
    seed: u64,

    /// Maximum allowed relative difference from the reference.
    #[arg(long, default_value_t = DEF_EPSILON)]
    epsilon: f64,

    /// Worker pool size for the factorized strategy.
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    lib::init_logging(args.verbose, false);

    let config = BasisConfig { n: args.n, q: args.q, ..BasisConfig::default() };
    let rho: nd::Array2<f64>
        = match &args.rho {
            Some(path) => hodensity::io::read_matrix(path)
                .with_context(|| format!("reading {path:?}"))?,
            None => {
                let basis = Basis::new(config)?;
                let mut rng = StdRng::seed_from_u64(args.seed);
                random_block_rho(&basis, &mut rng)
            },
        };
    let mut calc = DensityCalculator::new(config, rho)?;
    if let Some(threads) = args.threads {
        calc = calc.with_threads(threads)?;
    }
    println!("{}", calc.basis());

    let r = GridConfig::new(-10.0, 10.0, 21).linspace();
    let z = GridConfig::new(-20.0, 20.0, 21).linspace();
    let mut reference: Option<nd::Array2<f64>> = None;
    let mut failed = false;
    for strategy in Strategy::ALL {
        let t0 = Instant::now();
        let rho = calc.compute(&r, &z, strategy)?;
        let elapsed = t0.elapsed().as_secs_f64();
        match &reference {
            None => {
                println!("{strategy:>16}: {elapsed:9.4} s");
                reference = Some(rho);
            },
            Some(refr) => {
                let diff = relative_diff(&rho, refr)?;
                let ok = diff < args.epsilon;
                failed |= !ok;
                println!(
                    "{strategy:>16}: {elapsed:9.4} s  rel. diff = {diff:.3e} {}",
                    if ok { "ok" } else { "FAIL" },
                );
            },
        }
    }
    if failed { bail!("strategies disagree beyond {:e}", args.epsilon); }
    Ok(())
}
