//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use compenrich_completion::{ClientOptions, CompletionRequest, HttpCompletionClient};
use compenrich_core::enrichment::{Enricher, EnrichmentConfig, build_messages};
use compenrich_core::pipeline::{self, PipelineObserver, RunConfig, RunSummary};
use compenrich_shared::{AppConfig, InputRow, OutputEntry, init_config, load_config, resolve_api_key};
use compenrich_storage::JsonArrayStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Enrich a company list with verified metadata.
#[derive(Parser)]
#[command(
    name = "compenrich",
    version,
    about = "Enrich a CSV of companies with verified metadata from an AI completion API.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ./compenrich.toml or ~/.compenrich/compenrich.toml.
    #[arg(long, global = true, value_name = "PATH")]
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
    /// Enrich every company in the input table and append results to the output file.
    Run {
        /// Input table (defaults to `defaults.input_path`).
        #[arg(short, long, env = "COMPENRICH_INPUT", value_name = "PATH")]
        input: Option<PathBuf>,

        /// Output JSON array (defaults to `defaults.output_path`).
        #[arg(short, long, env = "COMPENRICH_OUTPUT", value_name = "PATH")]
        output: Option<PathBuf>,

        /// Model identifier (defaults to `completion.model`).
        #[arg(short, long)]
        model: Option<String>,

        /// API base URL (defaults to `completion.base_url`).
        #[arg(long)]
        base_url: Option<String>,

        /// Stop after this many companies.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the request that would be sent for one company, without sending it.
    Prompt {
        /// Company name.
        #[arg(long)]
        company: String,

        /// Industry zone.
        #[arg(long)]
        zone: Option<String>,
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
    /// Initialize the user config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries records.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "compenrich=info",
        1 => "compenrich=debug",
        _ => "compenrich=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            input,
            output,
            model,
            base_url,
            limit,
        } => {
            let overrides = RunOverrides {
                input,
                output,
                model,
                base_url,
                limit,
            };
            cmd_run(config_path, overrides).await
        }
        Command::Prompt { company, zone } => cmd_prompt(config_path, &company, zone.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Flag values that take precedence over the config file.
struct RunOverrides {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    model: Option<String>,
    base_url: Option<String>,
    limit: Option<usize>,
}

impl RunOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.defaults.input_path = input.to_string_lossy().into_owned();
        }
        if let Some(output) = &self.output {
            config.defaults.output_path = output.to_string_lossy().into_owned();
        }
        if let Some(model) = &self.model {
            config.completion.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.completion.base_url = base_url.clone();
        }
    }
}

async fn cmd_run(config_path: Option<&Path>, overrides: RunOverrides) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);

    // Fail on a missing key before touching the input
    let api_key = resolve_api_key(&config.completion)?;

    let input_path = PathBuf::from(&config.defaults.input_path);
    if !input_path.exists() {
        return Err(eyre!("input table not found at '{}'", input_path.display()));
    }
    let output_path = PathBuf::from(&config.defaults.output_path);

    let client = HttpCompletionClient::new(&ClientOptions {
        base_url: config.completion.base_url.clone(),
        api_key,
        timeout_secs: config.completion.timeout_secs,
    })?;
    let enricher = Enricher::new(
        client,
        EnrichmentConfig {
            model: config.completion.model.clone(),
        },
    );
    let mut store = JsonArrayStore::new(&output_path);

    let run_config = RunConfig {
        input_path,
        delimiter: config.defaults.delimiter,
        limit: overrides.limit,
    };

    info!(
        input = %run_config.input_path.display(),
        output = %output_path.display(),
        model = %config.completion.model,
        "enriching companies"
    );

    let observer = CliObserver::new();
    let summary = pipeline::run(&run_config, &enricher, &mut store, &observer).await?;

    println!("Data saved to {}", output_path.display());
    eprintln!();
    eprintln!("  Rows read: {}", summary.rows_read);
    eprintln!("  Skipped:   {}", summary.rows_skipped);
    eprintln!("  Enriched:  {}", summary.enriched);
    eprintln!("  No data:   {}", summary.failed);
    eprintln!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    eprintln!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI observer
// ---------------------------------------------------------------------------

/// Prints each persisted record to stdout under an indicatif spinner.
struct CliObserver {
    spinner: ProgressBar,
}

impl CliObserver {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl PipelineObserver for CliObserver {
    fn row_started(&self, row: &InputRow) {
        self.spinner.set_message(format!(
            "Enriching [row {}] {}",
            row.row_number, row.company_name
        ));
    }

    fn row_skipped(&self, _row_number: usize) {}

    fn unparsable_response(&self, company_name: &str, raw: &str) {
        self.spinner
            .suspend(|| println!("Invalid JSON response for {company_name}: {raw}"));
    }

    fn entry_persisted(&self, _row: &InputRow, entry: &OutputEntry) {
        let line = serde_json::to_string(entry).unwrap_or_else(|e| format!("<unprintable: {e}>"));
        self.spinner.suspend(|| println!("{line}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// prompt / config
// ---------------------------------------------------------------------------

fn cmd_prompt(config_path: Option<&Path>, company: &str, zone: Option<&str>) -> Result<()> {
    let company = company.trim();
    if company.is_empty() {
        return Err(eyre!("company name must not be empty"));
    }

    let config = load_config(config_path)?;
    let request = CompletionRequest {
        model: config.completion.model,
        messages: build_messages(company, zone.map(str::trim).filter(|z| !z.is_empty())),
    };
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let mut config: AppConfig = load_config(config_path)?;
    if config.completion.api_key.is_some() {
        config.completion.api_key = Some("<redacted>".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
