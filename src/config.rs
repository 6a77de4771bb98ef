//! Configuration for SawiTrack
//!
//! CLI arguments with environment variable fallbacks via clap. A `.env` file
//! is loaded by `main` before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use uuid::Uuid;

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// SawiTrack - plantation operations backend
#[derive(Parser, Debug, Clone)]
#[command(name = "sawitrack")]
#[command(about = "Plantation operations records with monthly period closing")]
pub struct Args {
    /// Unique identifier for this server instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "sawitrack")]
    pub mongodb_db: String,

    /// Keep all data in memory instead of MongoDB (dev mode only)
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// Secret for verifying access tokens (required outside dev mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds for tokens minted by this service
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Development mode: tokenless requests act as an admin
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Allowed CORS origin
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required outside dev mode".to_string()),
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }

            if self.memory_store {
                return Err("MEMORY_STORE is only allowed in dev mode".to_string());
            }
        }

        if self.mongodb_db.trim().is_empty() {
            return Err("MONGODB_DB must not be empty".to_string());
        }

        Ok(())
    }
}
