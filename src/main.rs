//! CLI entry point for the wildfire dashboard.
//!
//! Provides subcommands for rendering the dashboard once, exporting the
//! selected detections as CSV, listing available dates, and serving the
//! dashboard over HTTP.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use wildfire_dash::{
    cache::{FeedCache, load_cached},
    config::Config,
    dashboard::{Basemap, City, DashboardState, EXPORT_FILE_NAME, Layers, Province, render, select},
    fetch::{BasicClient, Retry},
    filter::available_dates,
    output::{print_json, print_pretty, write_export},
    server::{AppState, serve},
    stats::PLACEHOLDER,
};

#[derive(Parser)]
#[command(name = "wildfire_dash")]
#[command(about = "Canada wildfire hotspot dashboard over NASA FIRMS data", long_about = None)]
struct Cli {
    /// Path to file or URL of the FIRMS CSV feed (overrides FIRMS_URL)
    #[arg(short, long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct Selection {
    /// Acquisition date to show (defaults to the most recent in the feed)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Province: All, Quebec, Alberta, Ontario
    #[arg(long, default_value = "All")]
    province: Province,

    /// City: All, "Red Deer", Toronto
    #[arg(long, default_value = "All")]
    city: City,

    /// Basemap: OpenStreetMap, CartoDB.Positron, CartoDB.DarkMatter
    #[arg(long, default_value = "OpenStreetMap")]
    basemap: Basemap,

    /// Hide the hotspot heat layer
    #[arg(long, default_value_t = false)]
    no_heatmap: bool,
}

impl Selection {
    fn into_state(self) -> DashboardState {
        DashboardState {
            province: self.province,
            city: self.city,
            date: self.date,
            basemap: self.basemap,
            layers: Layers {
                hotspots: !self.no_heatmap,
                ..Layers::default()
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the dashboard once and log it
    Show {
        #[command(flatten)]
        selection: Selection,

        /// Log the full view as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the selected detections to a CSV file
    Export {
        #[command(flatten)]
        selection: Selection,

        /// CSV file to write
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: String,
    },
    /// List acquisition dates present in the feed
    Dates,
    /// Serve the dashboard over HTTP
    Serve {
        /// Address to bind (overrides BIND_ADDR)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/wildfire_dash.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("wildfire_dash.log"));

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

    let mut config = Config::from_env()?;
    if let Some(source) = cli.source {
        config.feed_url = source;
    }

    let client = Arc::new(Retry::new(
        BasicClient::with_timeout(config.fetch_timeout)?,
        config.fetch_retries,
        config.fetch_backoff,
    ));
    let cache = Arc::new(FeedCache::new(config.cache_ttl));

    match cli.command {
        Commands::Show { selection, json } => {
            let table = load_cached(&cache, client.as_ref(), &config.feed_url).await?;
            let view = render(&table, &selection.into_state());

            print_pretty(&view);
            if json {
                print_json(&view)?;
            } else {
                let [count, max_brightness, latest] = view.kpis.display();
                info!(
                    date = %view.selected_date.map(|d| d.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string()),
                    total_fires = %count,
                    max_brightness = %max_brightness,
                    latest_detection = %latest,
                    basemap = view.map.basemap,
                    "Key metrics"
                );
                for share in &view.charts.satellite_share {
                    info!(satellite = %share.name, count = share.count, percent = share.percent, "Fire % by satellite");
                }
                for bin in &view.charts.hourly {
                    info!(hour = bin.hour, count = bin.count, "Hourly fire frequency");
                }
                for bin in &view.charts.confidence {
                    info!(confidence = %bin.label, count = bin.count, "Confidence levels");
                }
            }
            if let Some(message) = view.message {
                warn!("{message}");
            }
        }
        Commands::Export { selection, output } => {
            let table = load_cached(&cache, client.as_ref(), &config.feed_url).await?;
            let rows = select(&table, &selection.into_state());

            if !write_export(&output, &rows)? {
                warn!("No fire data available for selected date.");
            }
        }
        Commands::Dates => {
            let table = load_cached(&cache, client.as_ref(), &config.feed_url).await?;
            let dates = available_dates(&table);
            info!(
                total = dates.len(),
                rows = table.len(),
                dropped = table.dropped,
                "Available dates"
            );
            for date in dates {
                info!(%date, "Date");
            }
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            let state = Arc::new(AppState::new(&config, cache, client));
            serve(&config, state).await?;
        }
    }

    Ok(())
}
