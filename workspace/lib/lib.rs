//! Shared pieces of the command-line tools.

/// Set up `tracing` output to stderr.
///
/// `verbosity` counts `-v` flags: warnings by default, then info, debug and
/// trace. With `timing`, closing spans are reported with their busy/idle
/// times.
pub fn init_logging(verbosity: u8, timing: bool) {
    use tracing_subscriber::{
        filter::LevelFilter,
        fmt::{ self, format::FmtSpan },
        layer::SubscriberExt,
        util::SubscriberInitExt,
    };

    let level
        = match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
    let spans = if timing { FmtSpan::CLOSE } else { FmtSpan::NONE };
    tracing_subscriber::registry()
        .with(level)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(spans)
                .with_target(false)
                .with_timer(fmt::time::uptime())
        )
        .init();
}
