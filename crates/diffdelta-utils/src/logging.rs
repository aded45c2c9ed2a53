//! Logging setup for the engine binary.
//!
//! Structured logging through `tracing` with an `EnvFilter`: `RUST_LOG`
//! wins when set, otherwise `diffdelta=info,warn` (or `debug` under
//! `--verbose`). Output is compact and colorless when stdout is not a
//! terminal or `NO_COLOR` is set.

use std::io::IsTerminal;

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber. Safe to call once per process.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("diffdelta=debug,info")
            } else {
                EnvFilter::try_new("diffdelta=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(use_color())
                .compact(),
        )
        .try_init()?;

    Ok(())
}
