// CLI module - Register and inspect log targets from the command line

mod output;

use crate::config::{LogTargetConfiguration, TargetsFile};
use crate::error::{LogTargetError, Result};
use crate::logs::{prepare_log_file, LogTargetManager, RoutingLayer, SetupOutcome, SinkRegistry};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Logger name used for `--sample` events
const SAMPLE_LOGGER: &str = "logtarget::sample";

/// logtarget - manage file log targets with line-count rollover
#[derive(Parser)]
#[command(name = "logtarget")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register every target from a configuration file
    Apply {
        /// Path to a .toml or .json targets file
        config: PathBuf,

        /// Emit one sample event per severity after registering
        #[arg(short, long)]
        sample: bool,
    },

    /// Show the targets defined in a configuration file
    Show {
        /// Path to a .toml or .json targets file
        config: PathBuf,
    },

    /// Register one of the preset targets
    Preset {
        /// Which preset to use
        #[arg(value_enum)]
        kind: PresetKind,

        /// Target name
        name: String,

        /// Log file path
        path: PathBuf,

        /// Emit one sample event per severity after registering
        #[arg(short, long)]
        sample: bool,
    },

    /// Create or roll over a log file without registering a target
    Rollover {
        /// Log file path
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetKind {
    /// Everything from Trace up, full layout
    Default,
    /// Warn and above, terse layout
    ErrorReport,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Apply { config, sample } => {
                let file = TargetsFile::from_file(config)?;
                self.register(&file.targets, *sample)
            }

            Commands::Show { config } => {
                let file = TargetsFile::from_file(config)?;
                output::print_targets(&file.targets);
                Ok(())
            }

            Commands::Preset {
                kind,
                name,
                path,
                sample,
            } => {
                let configuration = match kind {
                    PresetKind::Default => {
                        LogTargetConfiguration::default_preset(name.as_str(), path.as_path())
                    }
                    PresetKind::ErrorReport => {
                        LogTargetConfiguration::error_report_preset(name.as_str(), path.as_path())
                    }
                };
                self.register(std::slice::from_ref(&configuration), *sample)
            }

            // Degraded errors are printed once, by main
            Commands::Rollover { path } => match prepare_log_file(path) {
                SetupOutcome::Degraded(e) => Err(e),
                outcome => {
                    output::print_setup_outcome(path, &outcome);
                    Ok(())
                }
            },
        }
    }

    /// Register targets into a fresh registry wired into the global subscriber
    fn register(&self, configurations: &[LogTargetConfiguration], sample: bool) -> Result<()> {
        let registry = Arc::new(SinkRegistry::new());
        init_tracing(&registry)?;

        let manager = LogTargetManager::new(Arc::clone(&registry));
        let registrations = manager.register_all(configurations);
        output::print_registrations(&registrations);

        if sample {
            emit_samples();
            output::print_info(&format!(
                "Sample events written from logger '{}'",
                SAMPLE_LOGGER
            ));
        }

        Ok(())
    }
}

/// Install console output filtered by `RUST_LOG` plus routing into `registry`.
///
/// The console filter is per-layer so the routing layer still sees every
/// event and applies its own rules.
fn init_tracing(registry: &Arc<SinkRegistry>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .with(RoutingLayer::new(Arc::clone(registry)))
        .try_init()
        .map_err(|e| LogTargetError::Other(format!("Failed to install subscriber: {}", e)))
}

fn emit_samples() {
    tracing::trace!(target: SAMPLE_LOGGER, "sample trace event");
    tracing::debug!(target: SAMPLE_LOGGER, "sample debug event");
    tracing::info!(target: SAMPLE_LOGGER, "sample info event");
    tracing::warn!(target: SAMPLE_LOGGER, "sample warn event");
    tracing::error!(target: SAMPLE_LOGGER, error = "sample failure", "sample error event");
}
