use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use pano_hunter::io::{ConfigDocError, ConfigDocument, IoError, Overrides};
use pano_hunter::output::OutputFormat;
use pano_hunter::report::write_outputs;
use pano_hunter::streetview::{
    probe_api_key, KeyVerdict, StreetViewClient, StreetViewError, StreetViewOptions, METADATA_URL,
};
use pano_hunter::{AreaPreset, BoundingBox, GeoPoint, RunState};

/// Find Street View panoramas inside an area by probing a regular grid.
#[derive(Parser, Debug)]
#[command(name = "pano-hunter", version, about)]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log through tracing as JSON lines (filter from RUST_LOG)
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search an area and write the panoramas found
    Search(SearchArgs),
    /// Show the grid a search would probe, without any requests
    Plan(PlanArgs),
    /// Check that an API key can reach the metadata endpoint
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
struct ApiKeyArgs {
    /// Google Cloud API key with the Street View Static API enabled
    #[arg(long, env = "PANO_HUNTER_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, hide = true, default_value = METADATA_URL)]
    endpoint: String,
}

#[derive(Args, Debug)]
struct AreaArgs {
    /// TOML, JSON or YAML search document
    #[arg(long, conflicts_with_all = ["lat_min", "preset"])]
    config: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true, requires_all = ["lat_max", "lon_min", "lon_max"])]
    lat_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat_min")]
    lat_max: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat_min")]
    lon_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat_min")]
    lon_max: Option<f64>,

    /// Area size preset: small, medium, large or metropolis
    #[arg(long, requires = "center", conflicts_with = "lat_min")]
    preset: Option<AreaPreset>,
    /// Preset centre as LAT,LON
    #[arg(long, allow_hyphen_values = true)]
    center: Option<GeoPoint>,

    /// Grid spacing in km
    #[arg(long)]
    step_km: Option<f64>,
    /// Lookup radius in metres
    #[arg(long)]
    search_radius: Option<f64>,
    /// Probe at most this many points (0 = no limit)
    #[arg(long)]
    max_points: Option<usize>,
    /// Seconds between requests, across all workers
    #[arg(long)]
    delay: Option<f64>,
    #[arg(long)]
    workers: Option<usize>,
    /// Outdoor panoramas only
    #[arg(long)]
    outdoor: bool,

    #[arg(long)]
    output: Option<String>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Google domain for links (de, com, ru, ...)
    #[arg(long)]
    domain: Option<String>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    key: ApiKeyArgs,
    #[command(flatten)]
    area: AreaArgs,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    area: AreaArgs,
    /// Save the resolved document (.toml, .json or .yaml)
    #[arg(long)]
    write_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    #[command(flatten)]
    key: ApiKeyArgs,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigDocError),
    #[error(transparent)]
    Client(#[from] StreetViewError),
    #[error("failed to write results: {0}")]
    Output(#[from] IoError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) | CliError::Client(_) => ExitCode::from(2),
            CliError::Output(_) => ExitCode::FAILURE,
        }
    }
}

impl AreaArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            step_km: self.step_km,
            search_radius: self.search_radius,
            max_points: self.max_points,
            delay: self.delay,
            workers: self.workers,
            outdoor: self.outdoor,
            filename: self.output.clone(),
            format: self.format,
            domain: self.domain.clone(),
        }
    }

    fn document(&self) -> Result<ConfigDocument, ConfigDocError> {
        let mut doc = if let Some(path) = &self.config {
            ConfigDocument::load(path)?
        } else if let (Some(preset), Some(center)) = (self.preset, self.center) {
            ConfigDocument::from_preset(preset, center)?
        } else if let (Some(lat_min), Some(lat_max), Some(lon_min), Some(lon_max)) =
            (self.lat_min, self.lat_max, self.lon_min, self.lon_max)
        {
            ConfigDocument::new(BoundingBox {
                lat_min,
                lat_max,
                lon_min,
                lon_max,
            })
        } else {
            return Err(ConfigDocError::MissingArea);
        };
        doc.apply(&self.overrides());
        Ok(doc)
    }
}

fn client(key: ApiKeyArgs, options: StreetViewOptions) -> Result<StreetViewClient, CliError> {
    let options = StreetViewOptions {
        endpoint: key.endpoint,
        ..options
    };
    Ok(StreetViewClient::with_options(key.api_key, options)?)
}

fn search(args: SearchArgs) -> Result<ExitCode, CliError> {
    let search = args
        .area
        .document()?
        .resolve()
        .map_err(ConfigDocError::from)?;
    let options = StreetViewOptions {
        source: search.source,
        ..StreetViewOptions::default()
    };
    let client = client(args.key, options)?;

    let report = pano_hunter::run_search(&search, client).map_err(ConfigDocError::from)?;
    write_outputs(&search.output, &report)?;

    println!("{}", report.stats.summary());
    let records = report.record_summary();
    if records.count > 0 {
        println!(
            "distance to grid: avg {:.1} m, max {:.1} m; {} capture date(s); efficiency {:.1}%",
            records.avg_distance_m,
            records.max_distance_m,
            records.unique_capture_dates,
            100.0 * report.stats.efficiency()
        );
        println!("results: {}", search.output.path.display());
    }

    Ok(match report.state {
        RunState::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn plan(args: PlanArgs) -> Result<ExitCode, CliError> {
    let doc = args.area.document()?;
    let search = doc.resolve().map_err(ConfigDocError::from)?;
    let plan = pano_hunter::plan(&search).map_err(ConfigDocError::from)?;

    let b = &search.bounds;
    let (width_km, height_km) = b.size_km();
    println!(
        "area: {:.5}..{:.5} lat, {:.5}..{:.5} lon",
        b.lat_min, b.lat_max, b.lon_min, b.lon_max
    );
    println!(
        "size: {width_km:.2} x {height_km:.2} km ({:.2} km2)",
        b.area_km2()
    );
    println!(
        "grid: {} rows x {} cols = {} points at {} km",
        plan.rows, plan.cols, plan.total, search.config.step_km
    );
    if plan.is_truncated() {
        println!("probing: {} of {} points (max_points)", plan.limit, plan.total);
    } else {
        println!("probing: {} points", plan.limit);
    }
    println!(
        "duration: at least {:.1} min at {} s/request",
        search.config.estimated_duration(plan.limit).as_secs_f64() / 60.0,
        search.config.request_interval_s
    );

    if let Some(path) = args.write_config {
        doc.write(&path)?;
        println!("config: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn probe(args: ProbeArgs) -> Result<ExitCode, CliError> {
    let client = client(args.key, StreetViewOptions::default())?;
    let check = probe_api_key(&client);
    match &check.verdict {
        KeyVerdict::Valid => info!("API key works"),
        KeyVerdict::NoCoverage => warn!("API answered, but no panoramas at the check locations"),
        KeyVerdict::Rejected(reason) => error!("API key rejected: {reason}"),
        KeyVerdict::Unreachable(reason) => error!("metadata endpoint unreachable: {reason}"),
    }
    for (name, result) in &check.attempts {
        match result {
            Ok(pano_id) => println!("{name}: {pano_id}"),
            Err(err) => println!("{name}: {err}"),
        }
    }
    Ok(if check.verdict.is_usable() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    if cli.log_json {
        if let Err(err) = pano_hunter::core::init_tracing(true) {
            eprintln!("tracing subscriber already installed: {err}");
        }
        return;
    }
    let level = pano_hunter::core::level_from_verbosity(cli.verbose);
    if let Err(err) = pano_hunter::core::init_with_level(level) {
        eprintln!("logger already installed: {err}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Search(args) => search(args),
        Command::Plan(args) => plan(args),
        Command::Probe(args) => probe(args),
    };
    result.unwrap_or_else(|err| {
        error!("{err}");
        err.exit_code()
    })
}
