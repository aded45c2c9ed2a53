//! CLI entrypoint: argument parsing, logging setup, and the exit-code
//! contract.
//!
//! Exit codes: 0 when every source finished `ok` or `disabled`; 1 when
//! any source errored, the configuration is missing, or an invariant
//! violation aborted the cycle.

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::warn;

use diffdelta_config::FleetConfig;
use diffdelta_orchestrator::Orchestrator;
use diffdelta_utils::exit_codes::ExitCode;
use diffdelta_utils::logging::init_tracing;
use diffdelta_utils::paths::OutputLayout;

/// Environment variable overriding the config path.
const CONFIG_ENV: &str = "DIFFDELTA_CONFIG";

#[derive(Debug, Parser)]
#[command(
    name = "diffdelta",
    version,
    about = "Deterministic change-detection engine emitting hash-addressed delta feeds"
)]
struct Cli {
    /// Path to sources.config.json. Defaults to $DIFFDELTA_CONFIG, then
    /// <root>/sources.config.json.
    #[arg(long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,

    /// Output root directory. All published paths resolve under it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: Utf8PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Run one engine cycle. Handles all output; the caller only maps the
/// returned code to `process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    // A second init (e.g. in tests) is harmless.
    let _ = init_tracing(cli.verbose);

    let layout = OutputLayout::new(cli.root.clone());

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(Utf8PathBuf::from))
        .unwrap_or_else(|| layout.default_config());

    let config = match FleetConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    if config.is_empty() {
        warn!("No sources configured");
        eprintln!("WARNING: No sources configured");
        return Ok(());
    }

    let orchestrator = match Orchestrator::new(config, layout) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            return Err(ExitCode::FAILURE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: failed to start runtime: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    let report = match runtime.block_on(orchestrator.run_cycle()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    println!("{}", report.summary_line());

    if report.has_errors() {
        Err(ExitCode::FAILURE)
    } else {
        Ok(())
    }
}
