use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use statbench::config::{BenchConfig, ConfigOverrides};
use statbench::display;
use statbench::driver;
use statbench::stat;
use statbench::types::{IoPattern, OutputFormat, Reduction};

#[derive(Parser)]
#[command(
    name = "statbench",
    version,
    about = "Time stat() on a shared file or per-rank files across a synchronized group"
)]
struct Cli {
    /// TOML config file (defaults to <config dir>/statbench/config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the target file(s)
    #[arg(short, long)]
    mountpoint: Option<PathBuf>,

    /// Base name of the target file(s)
    #[arg(short, long)]
    filename: Option<String>,

    /// I/O pattern: n1 (shared file) or nn (file per rank)
    #[arg(short, long)]
    pattern: Option<IoPattern>,

    /// Invert the rank space when choosing per-rank files
    #[arg(short, long, overrides_with = "no_shuffle")]
    shuffle: bool,

    /// Turn off shuffle set by a config file
    #[arg(long, overrides_with = "shuffle")]
    no_shuffle: bool,

    /// Number of participants
    #[arg(short = 'n', long)]
    ranks: Option<usize>,

    /// Statistic combining per-rank timings
    #[arg(short, long)]
    reduction: Option<Reduction>,

    /// Create the target file(s) before timing
    #[arg(long, overrides_with = "no_create")]
    create: bool,

    #[arg(long, overrides_with = "create")]
    no_create: bool,

    /// Size in bytes of created files
    #[arg(long)]
    file_size: Option<u64>,

    /// Remove the target file(s) after the run
    #[arg(long, overrides_with = "no_cleanup")]
    cleanup: bool,

    #[arg(long, overrides_with = "cleanup")]
    no_cleanup: bool,

    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mountpoint: self.mountpoint.clone(),
            filename: self.filename.clone(),
            pattern: self.pattern,
            shuffle: switch(self.shuffle, self.no_shuffle),
            ranks: self.ranks,
            reduction: self.reduction,
            create: switch(self.create, self.no_create),
            file_size: self.file_size,
            cleanup: switch(self.cleanup, self.no_cleanup),
        }
    }
}

/// `--flag` / `--no-flag` pair; neither leaves the config file value alone.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("statbench=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = BenchConfig::load(cli.config.as_deref(), cli.overrides())?;
    tracing::debug!(?config, "configuration loaded");

    let report = driver::run_local_group(&config, stat::stat_path)?;

    eprint!("{}", display::format_failures(&report));
    let output = match cli.format {
        OutputFormat::Text => display::format_text(&report),
        OutputFormat::Json => display::format_json(&report, Utc::now()),
    };
    println!("{}", output);

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
