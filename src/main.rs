//! CLI entry point for the Bluebikes station traffic tool.
//!
//! Loads the station list and trip table, narrows trips to a time of day,
//! and produces per-station marks (radius, departure-ratio bucket, tooltip)
//! for a map renderer.

use anyhow::{Result, bail};
use bluebike_traffic::{
    fetch::{BasicClient, load_source},
    model::{Station, Trip},
    output::{build_marks, print_json, write_csv},
    parser::{parse_stations, parse_trips},
    traffic::{
        FlowScale, RadiusScale, TimeFilter, busiest_station, compute_station_traffic,
        filter::LAST_MINUTE, filter_trips_by_time, format_time,
    },
};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_STATIONS_SOURCE: &str = "https://dsc106.com/labs/lab07/data/bluebikes-stations.json";
const DEFAULT_TRIPS_SOURCE: &str = "https://dsc106.com/labs/lab07/data/bluebikes-traffic-2024-03.csv";

#[derive(Parser)]
#[command(name = "bluebike_traffic")]
#[command(about = "Station traffic for bike-share trip data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute station marks for one time-of-day selection
    Traffic {
        /// Station JSON file or URL (default: $STATIONS_SOURCE or the Bluebikes feed)
        #[arg(long)]
        stations: Option<String>,

        /// Trip CSV file or URL (default: $TRIPS_SOURCE or the March 2024 trips)
        #[arg(long)]
        trips: Option<String>,

        /// Time of day: -1 or "any" for all trips, a minute 0-1439, or HH:MM
        #[arg(short, long, default_value = "any", allow_hyphen_values = true)]
        time: TimeFilter,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// CSV file to write marks to
        #[arg(short, long, default_value = "traffic.csv")]
        output: String,
    },
    /// Sweep the time slider over the day and summarize each position
    Timeline {
        #[arg(long)]
        stations: Option<String>,

        #[arg(long)]
        trips: Option<String>,

        /// Slider step in minutes
        #[arg(short, long, default_value_t = 60)]
        step: u32,
    },
    /// Load and validate the station list
    Stations {
        #[arg(long)]
        stations: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bluebike_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bluebike_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Traffic {
            stations,
            trips,
            time,
            format,
            output,
        } => {
            let (stations, trips) = load_dataset(stations, trips).await?;
            traffic(&stations, &trips, time, format, &output)?;
        }
        Commands::Timeline {
            stations,
            trips,
            step,
        } => {
            if step == 0 {
                bail!("--step must be at least 1 minute");
            }
            let (stations, trips) = load_dataset(stations, trips).await?;
            timeline(&stations, &trips, step)?;
        }
        Commands::Stations { stations } => {
            let source = stations_source(stations);
            let client = BasicClient::new();
            let parsed = parse_stations(&load_source(&client, &source).await?)?;

            for station in &parsed.records {
                info!(
                    short_name = %station.short_name,
                    name = station.name.as_deref().unwrap_or(""),
                    lat = station.lat,
                    lon = station.lon,
                    "Station"
                );
            }
            info!(
                stations = parsed.records.len(),
                rejected = parsed.rejected.len(),
                "Station list summary"
            );
        }
    }

    Ok(())
}

fn stations_source(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("STATIONS_SOURCE").ok())
        .unwrap_or_else(|| DEFAULT_STATIONS_SOURCE.to_string())
}

fn trips_source(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("TRIPS_SOURCE").ok())
        .unwrap_or_else(|| DEFAULT_TRIPS_SOURCE.to_string())
}

/// Fetches and validates stations and trips concurrently.
#[tracing::instrument(skip_all)]
async fn load_dataset(
    stations: Option<String>,
    trips: Option<String>,
) -> Result<(Vec<Station>, Vec<Trip>)> {
    let stations_src = stations_source(stations);
    let trips_src = trips_source(trips);
    let client = BasicClient::new();

    let (station_bytes, trip_bytes) = tokio::try_join!(
        load_source(&client, &stations_src),
        load_source(&client, &trips_src)
    )?;

    let stations = parse_stations(&station_bytes)?;
    let trips = parse_trips(&trip_bytes)?;

    if !stations.rejected.is_empty() || !trips.rejected.is_empty() {
        warn!(
            stations_rejected = stations.rejected.len(),
            trips_rejected = trips.rejected.len(),
            "Some records were rejected during loading"
        );
    }
    info!(
        stations = stations.records.len(),
        trips = trips.records.len(),
        "Dataset loaded"
    );

    Ok((stations.records, trips.records))
}

/// Computes marks for one time selection and writes them out.
///
/// The radius scale comes from the unfiltered trips so circle sizes stay
/// comparable across time selections.
#[tracing::instrument(skip(stations, trips, time, format), fields(time = %time))]
fn traffic(
    stations: &[Station],
    trips: &[Trip],
    time: TimeFilter,
    format: Format,
    output: &str,
) -> Result<()> {
    let radius = RadiusScale::from_traffic(&compute_station_traffic(stations, trips));
    let flow = FlowScale::default();

    let filtered = filter_trips_by_time(trips, time);
    let station_traffic = compute_station_traffic(stations, &filtered);
    let marks = build_marks(&station_traffic, &radius, &flow);

    info!(
        matched_trips = filtered.len(),
        total_trips = trips.len(),
        "Computed station traffic"
    );

    match format {
        Format::Csv => {
            write_csv(output, &marks)?;
            info!(output, rows = marks.len(), "Station marks written");
        }
        Format::Json => print_json(&marks)?,
    }
    Ok(())
}

#[tracing::instrument(skip(stations, trips))]
fn timeline(stations: &[Station], trips: &[Trip], step: u32) -> Result<()> {
    for minute in (0..=LAST_MINUTE).step_by(step as usize) {
        let filtered = filter_trips_by_time(trips, TimeFilter::at(minute)?);
        let station_traffic = compute_station_traffic(stations, &filtered);
        let busiest = busiest_station(&station_traffic);

        info!(
            minute,
            time = %format_time(minute),
            trips = filtered.len(),
            busiest = busiest.map(|t| t.id()).unwrap_or("-"),
            busiest_traffic = busiest.map(|t| t.total_traffic()).unwrap_or(0),
            "Timeline position"
        );
    }
    Ok(())
}
