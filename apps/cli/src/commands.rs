//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use daybook_core::{MergeOutcome, ProgressReporter, RunOptions, RunSummary};
use daybook_discovery::{DiscoveryOptions, discover};
use daybook_shared::{
    AppConfig, DateKey, RecordKind, config_file_path, init_config, load_config, load_config_from,
};
use daybook_sources::SourcePlan;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Used when the config sets an empty extension.
const FALLBACK_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Daybook: enrich your daily notes with the day's content.
#[derive(Parser)]
#[command(
    name = "daybook",
    version,
    about = "Append news, weather, charts and history exports to existing daily notes.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.daybook/daybook.toml.
    #[arg(long, global = true, env = "DAYBOOK_CONFIG")]
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
    /// Fetch every enabled source and merge its content into the daily notes.
    Run {
        /// Date stamped on today's snapshots (defaults to today).
        #[arg(long, value_parser = parse_date)]
        date: Option<DateKey>,

        /// Do everything except writing notes and consuming exports.
        #[arg(long)]
        dry_run: bool,

        /// Only run these sources (repeatable): news, weather, movies, charts,
        /// music, streaming, reviews.
        #[arg(long = "only", value_name = "SOURCE")]
        only: Vec<RecordKind>,
    },

    /// List the daily notes a run would enrich.
    Targets,

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

fn parse_date(raw: &str) -> std::result::Result<DateKey, String> {
    DateKey::parse_strict(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw:?}"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "daybook=info",
        1 => "daybook=debug",
        _ => "daybook=trace",
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
            date,
            dry_run,
            only,
        } => cmd_run(config_path, date, dry_run, &only).await,
        Command::Targets => cmd_targets(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn read_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn extension(config: &AppConfig) -> String {
    let ext = config.extension.trim().trim_start_matches('.');
    if ext.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        ext.to_string()
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    date: Option<DateKey>,
    dry_run: bool,
    only: &[RecordKind],
) -> Result<()> {
    let config = read_config(config_path)?;
    let options = RunOptions {
        target_dir: config.target_dir()?,
        extension: extension(&config),
        recursive: config.recursive,
        run_date: date.unwrap_or_else(DateKey::today),
        utc_offset: config.utc_offset()?,
        dry_run,
    };
    let plan = SourcePlan::from_config(&config, only);
    if plan.enabled.is_empty() {
        info!("no sources enabled; check the config");
    }

    info!(
        dir = %options.target_dir.display(),
        date = %options.run_date,
        dry_run,
        sources = plan.enabled.len(),
        "starting run"
    );

    let reporter = CliProgress::new();
    let summary = daybook_core::run(&plan, &options, &reporter).await?;
    print_summary(&summary);
    Ok(())
}

async fn cmd_targets(config_path: Option<&Path>) -> Result<()> {
    let config = read_config(config_path)?;
    let dir = config.target_dir()?;
    let opts = DiscoveryOptions {
        extension: extension(&config),
        recursive: config.recursive,
    };
    let targets = discover(&dir, &opts)?;

    if targets.is_empty() {
        println!("No daily notes found in {}", dir.display());
        return Ok(());
    }
    for target in targets.iter() {
        println!("{}  {}", target.date, target.path.display());
    }
    println!();
    println!("  {} notes in {}", targets.len(), dir.display());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let mut config = read_config(config_path)?;
    if config.api.key.is_some() {
        config.api.key = Some("********".to_string());
    }
    let source = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    println!("# {}", source.display());
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("could not render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary output
// ---------------------------------------------------------------------------

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.dry_run {
        println!("  Dry run: no notes were changed.");
    }
    println!("  Notes found:    {}", summary.targets);
    println!("  Notes written:  {}", summary.documents_written);
    println!("  Inserted:       {}", summary.inserted());
    println!("  Already there:  {}", summary.duplicates());
    println!("  No note:        {}", summary.orphaned());
    println!("  Time:           {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.sources.is_empty() {
        println!();
        println!(
            "  {:<10} {:>7} {:>8} {:>6} {:>7} {:>8} {:>9}",
            "source", "records", "inserted", "dupes", "no note", "rejected", "conflicts"
        );
        for s in &summary.sources {
            println!(
                "  {:<10} {:>7} {:>8} {:>6} {:>7} {:>8} {:>9}",
                s.name,
                s.records,
                s.inserted,
                s.duplicates,
                s.orphaned,
                s.rejected,
                s.conflicts + s.write_errors
            );
        }
    }

    if !summary.missing_dates.is_empty() {
        let dates: Vec<String> = summary.missing_dates.iter().map(|d| d.to_string()).collect();
        println!();
        println!("  Skipped dates without a note: {}", dates.join(", "));
    }
    for failed in &summary.failed {
        println!("  Failed: {} ({})", failed.name, failed.error);
    }
    for disabled in &summary.disabled {
        println!("  Disabled: {} ({})", disabled.kind, disabled.reason);
    }
    for path in &summary.consumed {
        println!("  Consumed export: {}", path.display());
    }
    for failed in &summary.consume_failures {
        println!("  Could not consume {} export: {}", failed.name, failed.error);
    }
    println!();
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_merged(&self, source: &str, outcome: MergeOutcome, current: usize, total: usize) {
        let verb = match outcome {
            MergeOutcome::Inserted => "inserted",
            MergeOutcome::SkippedDuplicate => "already there",
        };
        self.spinner
            .set_message(format!("Merging [{current}/{total}] {source}: {verb}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "daybook", "-vv", "run", "--date", "2025-04-26", "--dry-run", "--only", "music",
            "--only", "news",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                date,
                dry_run,
                only,
            } => {
                assert_eq!(date, DateKey::parse_strict("2025-04-26"));
                assert!(dry_run);
                assert_eq!(only, vec![RecordKind::Music, RecordKind::News]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn bad_date_and_source_are_rejected() {
        assert!(Cli::try_parse_from(["daybook", "run", "--date", "26/04/2025"]).is_err());
        assert!(Cli::try_parse_from(["daybook", "run", "--only", "podcasts"]).is_err());
    }

    #[test]
    fn empty_extension_falls_back() {
        let mut config = AppConfig::default();
        config.extension = " ".into();
        assert_eq!(extension(&config), "md");
        config.extension = ".txt".into();
        assert_eq!(extension(&config), "txt");
    }
}
