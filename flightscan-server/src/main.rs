//! flightscan: CLI + web server for nearby live flights.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing_subscriber::EnvFilter;

use flightscan_core::config::{self, Config, Credentials};
use flightscan_core::format::{
    format_altitude, format_distance, format_heading, format_speed, format_vertical_rate,
};
use flightscan_core::{FlightResponse, SearchArea};

mod adsbdb;
mod fanout;
mod opensky;
mod pipeline;
mod retry;
mod web;

#[cfg(test)]
mod fakes;

use adsbdb::AdsbdbClient;
use opensky::OpenSkyClient;
use pipeline::{Pipeline, Settings};

#[derive(Parser)]
#[command(
    name = "flightscan",
    version,
    about = "Live flights near a point, from OpenSky with adsbdb enrichment"
)]
struct Cli {
    /// Config file (default ~/.flightscan/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// OpenSky username (overrides the config file)
    #[arg(long, global = true, env = "OPENSKY_USERNAME", hide_env_values = true)]
    opensky_username: Option<String>,

    /// OpenSky password (overrides the config file)
    #[arg(long, global = true, env = "OPENSKY_PASSWORD", hide_env_values = true)]
    opensky_password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (default from config, 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port (default from config, 3000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Query once and print a table of nearby aircraft
    Nearby {
        /// Center latitude
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Center longitude
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Radius in statute miles
        radius: f64,

        /// Skip adsbdb route and aircraft lookups
        #[arg(long)]
        no_enrich: bool,

        /// Print the JSON response instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_file);
    if let Commands::InitConfig { force } = cli.command {
        cmd_init_config(&config_path, force);
        return;
    }

    let config = match config::load_config_from(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %config_path.display(), error = %e, "Cannot load config");
            std::process::exit(1);
        }
    };
    let credentials = resolve_credentials(&cli, &config);

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            cmd_serve(&config, credentials, &host, port).await;
        }
        Commands::Nearby {
            lat,
            lon,
            radius,
            no_enrich,
            json,
        } => cmd_nearby(&config, credentials, lat, lon, radius, no_enrich, json).await,
        Commands::InitConfig { .. } => {}
    }
}

/// CLI/env credentials replace the file's as a pair; partial input means
/// anonymous access.
fn select_credentials(
    username: Option<&str>,
    password: Option<&str>,
    config: &Config,
) -> Option<Credentials> {
    if username.is_some() || password.is_some() {
        Credentials::resolve(username, password)
    } else {
        config.credentials()
    }
}

fn resolve_credentials(cli: &Cli, config: &Config) -> Option<Credentials> {
    let credentials = select_credentials(
        cli.opensky_username.as_deref(),
        cli.opensky_password.as_deref(),
        config,
    );

    match &credentials {
        Some(c) => tracing::info!(username = %c.username, "OpenSky access: authenticated"),
        None => tracing::info!("OpenSky access: anonymous"),
    }
    credentials
}

fn build_pipeline(config: &Config, credentials: Option<Credentials>, settings: Settings) -> Pipeline {
    let source = match OpenSkyClient::from_config(&config.opensky, credentials) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build OpenSky client");
            std::process::exit(1);
        }
    };
    let enricher = match AdsbdbClient::from_config(&config.adsbdb) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build adsbdb client");
            std::process::exit(1);
        }
    };
    Pipeline::new(Arc::new(source), Arc::new(enricher), settings)
}

async fn cmd_serve(config: &Config, credentials: Option<Credentials>, host: &str, port: u16) {
    let pipeline = build_pipeline(config, credentials, Settings::from_config(config));
    let state = Arc::new(web::AppState { pipeline });

    if let Err(e) = web::serve(state, host, port).await {
        tracing::error!(host, port, error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn cmd_nearby(
    config: &Config,
    credentials: Option<Credentials>,
    lat: f64,
    lon: f64,
    radius: f64,
    no_enrich: bool,
    json: bool,
) {
    if !(lat.is_finite() && lon.is_finite() && radius.is_finite()) || radius < 0.0 {
        eprintln!("Invalid parameter values");
        std::process::exit(1);
    }

    let mut settings = Settings::from_config(config);
    if no_enrich {
        settings.enrich_limit = 0;
    }
    let pipeline = build_pipeline(config, credentials, settings);

    let response = match pipeline.run(&SearchArea::new(lat, lon, radius)).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error fetching flights: {e}");
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&response) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error encoding response: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    print_flights(&response, lat, lon, radius);
}

fn print_flights(response: &FlightResponse, lat: f64, lon: f64, radius: f64) {
    println!();
    println!(
        "{} aircraft within {radius} mi of ({lat:.4}, {lon:.4})",
        response.count
    );

    if response.flights.is_empty() {
        return;
    }

    println!();
    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Callsign", "Dist", "Alt", "Speed", "Hdg", "V/S", "Route", "Type", "Country",
    ]);

    for f in &response.flights {
        let altitude = if f.on_ground {
            "Ground".to_string()
        } else {
            format_altitude(f.altitude)
        };
        table.add_row(vec![
            Cell::new(&f.icao24),
            Cell::new(&f.callsign),
            Cell::new(format_distance(f.distance_from_center)),
            Cell::new(altitude),
            Cell::new(format_speed(f.ground_speed)),
            Cell::new(format_heading(f.heading)),
            Cell::new(format_vertical_rate(f.vertical_rate)),
            Cell::new(format!("{} → {}", f.departure_airport, f.arrival_airport)),
            Cell::new(&f.aircraft_type),
            Cell::new(&f.origin_country),
        ]);
    }

    println!("{table}");
}

fn cmd_init_config(path: &std::path::Path, force: bool) {
    if path.exists() && !force {
        eprintln!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = config::save_config_to(&Config::default(), path) {
        eprintln!("Error writing {}: {e}", path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", path.display());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
