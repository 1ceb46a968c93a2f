use std::{ path::PathBuf, time::Instant };
use anyhow::Context;
use clap::Parser;
use tracing::info;
use hodensity::{ DensityCalculator, RunConfig, Strategy, io };

/// Evaluate a density over an (r, z) grid from its basis coefficients.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML run configuration.
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Override the summation strategy.
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Override the worker pool size.
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Override the output path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Report span timings.
    #[arg(long)]
    timing: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    lib::init_logging(args.verbose, args.timing);

    let mut config = RunConfig::from_yaml(&args.config)
        .with_context(|| format!("loading {:?}", args.config))?;
    if let Some(strategy) = args.strategy { config.strategy = strategy; }
    if let Some(threads) = args.threads { config.threads = Some(threads); }
    if let Some(output) = args.output { config.output = output; }

    let mut calc = DensityCalculator::from_path(config.basis, &config.rho)
        .with_context(|| format!("loading coefficients from {:?}", config.rho))?;
    if let Some(threads) = config.threads {
        calc = calc.with_threads(threads)?;
    }
    info!(basis = %calc.basis(), "loaded coefficients");

    let r = config.r.linspace();
    let z = config.z.linspace();
    let t0 = Instant::now();
    let rho = calc.compute(&r, &z, config.strategy)?;
    info!(
        strategy = %config.strategy,
        elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
        "computed density"
    );

    if let Some(dir) = config.output.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    io::write_matrix(&config.output, &rho)
        .with_context(|| format!("writing {:?}", config.output))?;
    println!("wrote {} × {} grid to {:?}", rho.nrows(), rho.ncols(), config.output);
    Ok(())
}
