//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use ownertrace_core::{ProgressReporter, RunSummary};
use ownertrace_shared::{
    AppConfig, ColumnVariant, EnrichConfig, InputShape, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ownertrace: enrich property owner records with people-search profiles.
#[derive(Parser)]
#[command(
    name = "ownertrace",
    version,
    about = "Resolve owner names and locations into contact and address profiles, written as CSV.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.ownertrace/ownertrace.toml).
    #[arg(long, global = true, env = "OWNERTRACE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich every owner in an input file and write the CSV.
    Run {
        /// Input records: JSON array (.json) or JSON Lines (.jsonl/.ndjson).
        input: PathBuf,

        /// Output CSV path (overwritten).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum requests in flight.
        #[arg(short, long)]
        concurrency: Option<u32>,

        /// Column schema: profile or merged.
        #[arg(long)]
        columns: Option<ColumnVariant>,

        /// Additional attempts for transient failures.
        #[arg(long)]
        retries: Option<u32>,

        /// Where address fields live: flat or nested.
        #[arg(long)]
        shape: Option<InputShape>,

        /// Stop after this many seconds and write what was collected.
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = ["ownertrace", "ownertrace_core", "ownertrace_crawler", "ownertrace_shared"]
        .map(|target| format!("{target}={level}"))
        .join(",");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            input,
            out,
            concurrency,
            columns,
            retries,
            shape,
            deadline_secs,
        } => {
            let app = resolve_config(cli.config.as_deref())?;
            let mut config = EnrichConfig::from(&app);
            if let Some(out) = out {
                config.output = out;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(columns) = columns {
                config.columns = columns;
            }
            if let Some(retries) = retries {
                config.retry.max_retries = retries;
            }
            if let Some(shape) = shape {
                config.input_shape = shape;
            }
            if let Some(secs) = deadline_secs {
                config.deadline = Some(Duration::from_secs(secs));
            }
            cmd_run(&input, &config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(input: &std::path::Path, config: &EnrichConfig) -> Result<()> {
    if !input.exists() {
        return Err(eyre!("input file '{}' does not exist", input.display()));
    }

    info!(
        input = %input.display(),
        output = %config.output.display(),
        concurrency = config.concurrency,
        "starting enrichment"
    );

    let reporter = CliProgress::new();
    let summary = ownertrace_core::run(config, input, &reporter)
        .await
        .wrap_err_with(|| format!("run over '{}' failed", input.display()))?;

    println!();
    println!("  Enrichment finished.");
    println!("  Queries:   {}", summary.total_queries);
    println!("  Matched:   {}", summary.matched);
    println!("  No match:  {}", summary.no_match);
    println!("  Failed:    {}", summary.failed);
    if summary.abandoned > 0 {
        println!("  Abandoned: {} (deadline)", summary.abandoned);
    }
    println!("  Written:   {} → {}", summary.written, config.output.display());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&std::path::Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn query_done(&self, processed: usize, total: usize) {
        self.spinner
            .set_message(format!("Resolving [{processed}/{total}]"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
