//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use iodschema_core::pipeline::{
    DictionaryConfig, GenerateConfig, ProgressReporter, build_dictionary, generate,
};
use iodschema_fetch::{DocumentSource, FetchOptions};
use iodschema_shared::{AppConfig, Diagnostic, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// iodschema — extract DICOM IOD schemas from the DocBook standard.
#[derive(Parser)]
#[command(
    name = "iodschema",
    version,
    about = "Extract machine-readable IOD and module schemas from the DICOM standard.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.iodschema/iodschema.toml.
    #[arg(long, global = true, env = "IODSCHEMA_CONFIG")]
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
    /// Parse IODs and their modules into a JSON schema.
    Generate {
        /// IOD names to extract (e.g. "CT Image"). Defaults to all.
        iods: Vec<String>,

        /// PS3.3 source: URL or local DocBook file.
        #[arg(long)]
        part03: Option<String>,

        /// PS3.6 source: URL or local DocBook file.
        #[arg(long)]
        part06: Option<String>,

        /// Output file (defaults to the configured iods_path).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Dictionary cache file.
        #[arg(long)]
        dictionary: Option<PathBuf>,

        /// Rebuild the dictionary cache from PS3.6.
        #[arg(long)]
        refresh_dictionary: bool,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Build the data dictionary cache from PS3.6.
    Dictionary {
        /// PS3.6 source: URL or local DocBook file.
        #[arg(long)]
        part06: Option<String>,

        /// Output file (defaults to the configured dictionary_path).
        #[arg(short, long)]
        out: Option<PathBuf>,
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

    let filter = match cli.verbose {
        0 => "iodschema=info",
        1 => "iodschema=debug",
        _ => "iodschema=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config;
    match cli.command {
        Command::Generate {
            iods,
            part03,
            part06,
            out,
            dictionary,
            refresh_dictionary,
            pretty,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let generate_config = GenerateConfig {
                part03: DocumentSource::parse(part03.as_deref().unwrap_or(&config.sources.part03))?,
                part06: DocumentSource::parse(part06.as_deref().unwrap_or(&config.sources.part06))?,
                iods,
                output_path: out.unwrap_or_else(|| PathBuf::from(&config.output.iods_path)),
                dictionary_path: dictionary
                    .unwrap_or_else(|| PathBuf::from(&config.output.dictionary_path)),
                refresh_dictionary,
                pretty: pretty || config.output.pretty,
                fetch: FetchOptions::from(&config.fetch),
            };
            cmd_generate(&generate_config).await
        }
        Command::Dictionary { part06, out } => {
            let config = resolve_config(config_path.as_deref())?;
            let dictionary_config = DictionaryConfig {
                part06: DocumentSource::parse(part06.as_deref().unwrap_or(&config.sources.part06))?,
                output_path: out
                    .unwrap_or_else(|| PathBuf::from(&config.output.dictionary_path)),
                fetch: FetchOptions::from(&config.fetch),
            };
            cmd_dictionary(&dictionary_config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

/// Config from `--config` when given, else the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config: &GenerateConfig) -> Result<()> {
    info!(
        part03 = %config.part03,
        iods = ?config.iods,
        out = %config.output_path.display(),
        "generating IOD schema"
    );

    let reporter = CliProgress::new();
    let result = generate(config, &reporter).await?;

    println!();
    println!("  IOD schema written.");
    println!("  IODs:        {}", result.iod_count);
    println!("  Modules:     {}", result.module_count);
    println!(
        "  Dictionary:  {} entries{}",
        result.dictionary_entries,
        if result.dictionary_cached { " (cached)" } else { "" }
    );
    print_diagnostics(&result.diagnostics);
    println!("  Path:        {}", result.output_path.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_dictionary(config: &DictionaryConfig) -> Result<()> {
    info!(part06 = %config.part06, "building data dictionary");

    let reporter = CliProgress::new();
    let result = build_dictionary(config, &reporter).await?;

    println!();
    println!("  Data dictionary written.");
    println!("  Entries:     {}", result.entry_count);
    print_diagnostics(&result.diagnostics);
    println!("  Path:        {}", result.output_path.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Diagnostic totals per kind.
fn print_diagnostics(diagnostics: &[Diagnostic]) {
    println!("  Warnings:    {}", diagnostics.len());

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for diagnostic in diagnostics {
        *counts.entry(format!("{:?}", diagnostic.kind)).or_default() += 1;
    }
    for (kind, count) in counts {
        println!("    {kind}: {count}");
    }
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}
