//! EV Charging Load Prediction
//!
//! Command-line entry point for the ingest, training, serving and
//! monitoring pipeline.

use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, build_object_store};
use ev_charging::commands;
use ml_model::TrainingConfig;
use station_structs::StationFeatures;
use tracing_subscriber::EnvFilter;

/// EV Charging Load Prediction
#[derive(Parser)]
#[command(name = "ev-charging")]
#[command(about = "Predicts daily charging sessions for EV charging stations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch stations from Open Charge Map and build the processed dataset
    Ingest {
        /// Ignore cached responses and processed data
        #[arg(long)]
        refresh: bool,
    },

    /// Train the model on the processed dataset
    Train {
        /// Number of ensemble members
        #[arg(long, default_value = "5")]
        n_estimators: usize,

        /// Training epochs per member
        #[arg(short, long, default_value = "150")]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.005")]
        learning_rate: f64,

        /// Share of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Random seed for the split and training
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict daily sessions for one station profile
    Predict {
        #[arg(long)]
        region: String,

        /// "urban", "suburban" or "rural"
        #[arg(long)]
        city_type: String,

        /// "AC" or "DC"
        #[arg(long)]
        charger_type: String,

        #[arg(long)]
        power_kw: f64,

        #[arg(long)]
        num_connectors: i64,
    },

    /// Serve the prediction API
    Serve {
        /// Listen address (defaults to API_BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Compare training data with logged predictions
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let store = build_object_store(&config.data_root)?;

    match cli.command {
        Commands::Ingest { refresh } => {
            commands::ingest::run(store, &config.ingest, refresh).await?;
        }
        Commands::Train {
            n_estimators,
            epochs,
            batch_size,
            learning_rate,
            test_size,
            seed,
        } => {
            let training = TrainingConfig {
                n_estimators,
                epochs,
                batch_size,
                learning_rate,
                test_size,
                seed,
                ..TrainingConfig::default()
            };
            commands::train::run(store, &training).await?;
        }
        Commands::Predict {
            region,
            city_type,
            charger_type,
            power_kw,
            num_connectors,
        } => {
            let features = StationFeatures {
                region,
                city_type,
                charger_type,
                power_kw,
                num_connectors,
            };
            commands::predict::run(store, features).await?;
        }
        Commands::Serve { bind } => {
            commands::serve::run(store, bind.unwrap_or(config.bind_addr)).await?;
        }
        Commands::Report => {
            commands::report::run(store).await?;
        }
    }

    Ok(())
}
