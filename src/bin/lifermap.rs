use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lifermap::aggregate;
use lifermap::app::App;
use lifermap::batch::NoopProgress;
use lifermap::config::{Config, ConfigLoader, RegionEntry, starter_config};
use lifermap::domain::SpeciesCode;
use lifermap::ebird::EbirdHttpClient;
use lifermap::error::LifermapError;
use lifermap::output::{JsonOutput, StderrProgress};
use lifermap::retry::NoopDiagnostics;

#[derive(Parser)]
#[command(name = "lifermap")]
#[command(about = "Batch-fetch bird sightings and aggregate them into map-ready location bins")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a batch fetch and print aggregated bins")]
    Fetch(FetchArgs),
    #[command(about = "Write a starter lifermap.json")]
    Init,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    /// Region codes to fetch; overrides the config file's regions.
    #[arg(long)]
    region: Vec<String>,

    #[arg(long)]
    start: Option<NaiveDate>,

    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    retries: Option<u32>,

    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Re-filter the display bins to these species codes.
    #[arg(long)]
    species: Vec<String>,

    /// Drop bins with fewer observations than this.
    #[arg(long)]
    min_count: Option<usize>,

    /// Emit a GeoJSON FeatureCollection instead of the fetch report.
    #[arg(long)]
    geojson: bool,

    /// Suppress the textual progress indicator.
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<LifermapError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LifermapError) -> u8 {
    match error {
        LifermapError::MissingConfig
        | LifermapError::ConfigRead(_)
        | LifermapError::ConfigParse(_)
        | LifermapError::MissingApiToken => 2,
        LifermapError::EbirdHttp(_)
        | LifermapError::EbirdStatus { .. }
        | LifermapError::MalformedResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Init => run_init(),
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let mut raw = if args.config.is_some() || args.region.is_empty() {
        ConfigLoader::load(args.config.as_deref())?
    } else {
        Config::default()
    };

    if !args.region.is_empty() {
        raw.regions = args
            .region
            .iter()
            .map(|region| RegionEntry::Shorthand(region.clone()))
            .collect();
    }
    if args.start.is_some() {
        raw.start = args.start;
    }
    if args.end.is_some() {
        raw.end = args.end;
    }
    if args.concurrency.is_some() {
        raw.concurrency = args.concurrency;
    }
    if args.retries.is_some() {
        raw.retries = args.retries;
    }
    if args.retry_delay_ms.is_some() {
        raw.retry_delay_ms = args.retry_delay_ms;
    }

    let config = ConfigLoader::resolve_config(raw)?;
    if config.regions.is_empty() {
        return Err(miette::Report::msg(
            "no regions to fetch (pass --region or list regions in lifermap.json)",
        ));
    }

    let species_filter = args
        .species
        .iter()
        .map(|code| code.parse())
        .collect::<Result<Vec<SpeciesCode>, LifermapError>>()?;

    let client = EbirdHttpClient::new()?;
    let app = App::new(client);
    let mut outcome = if args.quiet {
        app.run(&config, &NoopProgress, &NoopDiagnostics)
    } else {
        app.run(&config, &StderrProgress, &NoopDiagnostics)
    };

    if !species_filter.is_empty() {
        outcome.bins = aggregate::filter_bins(&outcome.bins, |obs| {
            species_filter.contains(&obs.species)
        });
    }
    if let Some(min_count) = args.min_count {
        outcome.bins.retain(|bin| bin.observations.len() >= min_count);
    }

    if args.geojson {
        JsonOutput::print_geojson(&outcome.bins).into_diagnostic()?;
    } else {
        JsonOutput::print_outcome(&outcome).into_diagnostic()?;
    }
    Ok(())
}

fn run_init() -> miette::Result<()> {
    let path = std::path::Path::new("lifermap.json");
    if path.exists() {
        return Err(miette::Report::msg("lifermap.json already exists"));
    }
    let content = serde_json::to_string_pretty(&starter_config()).into_diagnostic()?;
    std::fs::write(path, content + "\n")
        .map_err(|err| LifermapError::Filesystem(err.to_string()))?;
    eprintln!("wrote lifermap.json");
    Ok(())
}
