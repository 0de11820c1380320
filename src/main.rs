//! CLI entry point for the air-quality heatmap engine.
//!
//! Provides subcommands for fetching and merging measurements from the
//! configured sources, rendering an interpolated heatmap grid, and printing
//! the baseline pollen forecast.

use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use aq_heatmap::aggregate::{Aggregator, TimeWindow, merge};
use aq_heatmap::aqi;
use aq_heatmap::config::{AggregatorConfig, OPENAQ_API_KEY_VAR, WAQI_API_TOKEN_VAR};
use aq_heatmap::fetch::{
    BasicClient,
    auth::{ApiKey, UrlParam},
};
use aq_heatmap::forecast::{forecast_points, pm25_proxy_near};
use aq_heatmap::heatmap::{Observation, Sample, blend, interpolate};
use aq_heatmap::output::{append_record, load_readings, write_grid_json, write_json_pretty};
use aq_heatmap::reading::{Bounds, Reading};
use aq_heatmap::sources::{
    DEFAULT_CITIES, OpenAqSource, SourceAdapter, WaqiBoundsSource, WaqiCitySource,
};
use aq_heatmap::stats::ReadingStats;

#[derive(Parser)]
#[command(name = "aq_heatmap")]
#[command(about = "Aggregate air-quality measurements and render heatmap grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Geographic bounds flags shared by the fetch and heatmap subcommands.
/// Defaults cover India, the primary deployment region.
#[derive(Args)]
struct BoundsArgs {
    #[arg(long, default_value_t = 37.6)]
    north: f64,

    #[arg(long, default_value_t = 6.4)]
    south: f64,

    #[arg(long, default_value_t = 97.25)]
    east: f64,

    #[arg(long, default_value_t = 68.7)]
    west: f64,
}

impl BoundsArgs {
    fn to_bounds(&self) -> Result<Bounds> {
        Ok(Bounds::new(self.north, self.south, self.east, self.west)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch measurements from all configured sources and append them to a CSV
    Fetch {
        #[command(flatten)]
        bounds: BoundsArgs,

        /// CSV file to append merged readings to
        #[arg(short, long, default_value = "readings.csv")]
        output: String,

        /// Maximum number of concurrent source fetches
        #[arg(short, long, default_value_t = 5)]
        concurrency: usize,

        /// Per-source timeout in seconds
        #[arg(short = 't', long, default_value_t = 30)]
        timeout_secs: u64,

        /// Merge window: keep readings observed within this many hours
        #[arg(short = 'w', long, default_value_t = 24)]
        window_hours: i64,
    },
    /// Interpolate readings into a heatmap grid, optionally blended with
    /// local observations
    Heatmap {
        #[command(flatten)]
        bounds: BoundsArgs,

        /// CSV file of readings to interpolate
        #[arg(short, long, default_value = "readings.csv")]
        input: String,

        /// Lattice spacing in degrees
        #[arg(long, default_value_t = 0.1)]
        step: f64,

        /// Value assigned to cells outside the sample coverage
        #[arg(long, default_value_t = 50.0)]
        fill_value: f64,

        /// Optional CSV of local observations to blend in
        #[arg(long)]
        observations: Option<String>,

        /// Blending cutoff radius in kilometers
        #[arg(long, default_value_t = 20.0)]
        radius_km: f64,

        /// File to write the grid JSON to (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the baseline pollen point-forecast for a location
    Forecast {
        #[arg(value_name = "LAT")]
        lat: f64,

        #[arg(value_name = "LON")]
        lon: f64,

        /// Number of days ahead
        #[arg(short, long, default_value_t = 3)]
        days: u32,

        /// Optional readings CSV to derive the local PM2.5 proxy from
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aq_heatmap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aq_heatmap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            bounds,
            output,
            concurrency,
            timeout_secs,
            window_hours,
        } => {
            let bounds = bounds.to_bounds()?;
            let config = AggregatorConfig {
                concurrency,
                per_source_timeout: StdDuration::from_secs(timeout_secs),
            };
            fetch_and_store(&bounds, config, window_hours, &output).await?;
        }
        Commands::Heatmap {
            bounds,
            input,
            step,
            fill_value,
            observations,
            radius_km,
            output,
        } => {
            let bounds = bounds.to_bounds()?;
            render_heatmap(
                &bounds,
                &input,
                step,
                fill_value,
                observations.as_deref(),
                radius_km,
                output.as_deref(),
            )?;
        }
        Commands::Forecast {
            lat,
            lon,
            days,
            input,
        } => {
            // 55 km roughly matches a half-degree lookup box at these latitudes.
            let pm25_proxy = input
                .as_deref()
                .map(load_readings)
                .transpose()?
                .and_then(|readings| pm25_proxy_near(&readings, lat, lon, 55.0))
                .unwrap_or(50.0);

            let points = forecast_points(Utc::now().date_naive(), days, pm25_proxy);
            write_json_pretty(std::io::stdout().lock(), &points)?;
        }
    }

    Ok(())
}

/// Builds the source list from environment credentials. Sources without
/// credentials are skipped with a warning rather than failing the cycle.
fn build_sources() -> Vec<Arc<dyn SourceAdapter>> {
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    match std::env::var(OPENAQ_API_KEY_VAR) {
        Ok(key) => {
            let client = ApiKey::x_api_key(BasicClient::new(), key);
            sources.push(Arc::new(OpenAqSource::new(client, "IN")));
        }
        Err(_) => warn!(
            var = OPENAQ_API_KEY_VAR,
            "OpenAQ key not set, skipping source"
        ),
    }

    match std::env::var(WAQI_API_TOKEN_VAR) {
        Ok(token) => {
            let cities = DEFAULT_CITIES.iter().map(|c| c.to_string()).collect();
            let city_client = UrlParam {
                inner: BasicClient::new(),
                param_name: "token".to_string(),
                key: token.clone(),
            };
            sources.push(Arc::new(WaqiCitySource::new(city_client, cities)));

            let bounds_client = UrlParam {
                inner: BasicClient::new(),
                param_name: "token".to_string(),
                key: token,
            };
            sources.push(Arc::new(WaqiBoundsSource::new(bounds_client)));
        }
        Err(_) => warn!(
            var = WAQI_API_TOKEN_VAR,
            "WAQI token not set, skipping sources"
        ),
    }

    sources
}

#[tracing::instrument(skip(bounds, config))]
async fn fetch_and_store(
    bounds: &Bounds,
    config: AggregatorConfig,
    window_hours: i64,
    output: &str,
) -> Result<()> {
    let sources = build_sources();
    if sources.is_empty() {
        bail!("no sources configured; set {OPENAQ_API_KEY_VAR} and/or {WAQI_API_TOKEN_VAR}");
    }

    let aggregator = Aggregator::new(sources, config);
    let report = aggregator.fetch_all(bounds).await;

    for failure in &report.failures {
        warn!(source = %failure.source, error = %failure.error, "Source excluded from this cycle");
    }

    let partial = report.is_partial();
    let now = Utc::now();
    let window = TimeWindow {
        start: now - Duration::hours(window_hours),
        end: now + Duration::hours(1),
    };
    let merged = merge(report.readings, &window);

    let stats = ReadingStats::from_readings(&merged);
    info!(
        total = stats.total,
        sources = stats.sources,
        with_index = stats.with_index,
        mean_index = stats.mean_index,
        worst = stats.max_index.map(aqi::category),
        partial,
        "Fetch cycle merged"
    );

    for reading in &merged {
        append_record(output, reading)?;
    }
    info!(count = merged.len(), output, "Readings appended");

    Ok(())
}

fn render_heatmap(
    bounds: &Bounds,
    input: &str,
    step: f64,
    fill_value: f64,
    observations: Option<&str>,
    radius_km: f64,
    output: Option<&str>,
) -> Result<()> {
    let readings = load_readings(input)?;
    let samples = index_samples(&readings);
    info!(
        readings = readings.len(),
        samples = samples.len(),
        "Interpolating grid"
    );

    let mut grid = interpolate(&samples, bounds, step, fill_value)?;

    if let Some(obs_path) = observations {
        let obs_readings = load_readings(obs_path)?;
        let obs: Vec<Observation> = index_samples(&obs_readings);
        info!(observations = obs.len(), radius_km, "Blending grid");
        grid = blend(&grid, &obs, radius_km);
    }

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_grid_json(file, &grid)?;
            info!(cells = grid.len(), path, "Grid written");
        }
        None => write_grid_json(std::io::stdout().lock(), &grid)?,
    }

    Ok(())
}

/// Projects readings with a defined index into `(lat, lon, value)` samples.
fn index_samples(readings: &[Reading]) -> Vec<Sample> {
    readings
        .iter()
        .filter_map(|r| r.index.map(|idx| (r.lat, r.lon, idx as f64)))
        .collect()
}
