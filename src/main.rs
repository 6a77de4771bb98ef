//! SawiTrack - plantation operations backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sawitrack::{config::LogFormat, db::MongoClient, server, AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sawitrack={},info", args.log_level).into());
    match args.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  SawiTrack - plantation operations");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    if args.memory_store {
        info!("Storage: in-memory");
    } else {
        info!("Storage: MongoDB {} / {}", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let state = if args.memory_store {
        warn!("In-memory storage enabled - data is lost on restart");
        AppState::in_memory(args)?
    } else {
        let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                client
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };
        AppState::connect(args, mongo).await?
    };

    server::run(Arc::new(state)).await?;

    Ok(())
}
