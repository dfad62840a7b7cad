use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};

use shift_tally::config::PipelineConfig;
use shift_tally::ingest::{load_machine_csv, load_schedule_csv};
use shift_tally::pipeline::Pipeline;

/// Per-shift machine state totals and jam counts
#[derive(Parser)]
#[command(name = "shift-tally", version)]
#[command(about = "Summarize machine states and jams per shift from schedule and machine CSVs", long_about = None)]
struct Cli {
    /// Shift schedule CSV (Shift Code, Shift Start Time, Shift End Time, Break/Lunch columns)
    #[arg(short, long)]
    schedule: PathBuf,

    /// Machine state CSV (Time column plus one column per machine)
    #[arg(short, long)]
    machines: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Aggregation worker threads (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Error state name (overrides config)
    #[arg(long)]
    error_state: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable report
    Text,
    /// Report and raw tables as JSON
    Json,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    debug!("shift-tally started with verbosity level: {}", cli.verbose);

    if let Err(e) = run(&cli) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    if let Some(state) = &cli.error_state {
        config = config.with_error_state(state.clone());
    }
    config.check()?;

    let rows = load_schedule_csv(&cli.schedule)?;
    info!(path = %cli.schedule.display(), rows = rows.len(), "loaded schedule");

    let streams = load_machine_csv(&cli.machines, config.fallback_duration_secs)?;
    info!(path = %cli.machines.display(), machines = streams.len(), "loaded machine data");

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&rows, &streams).context("calculation failed")?;
    let report = pipeline.report(&output);

    match cli.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "report": report,
                "tables": output.tables,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
