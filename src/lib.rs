//! SawiTrack - plantation operations backend
//!
//! REST service over MongoDB for daily reports, operational costs, harvest
//! (panen), transport (angkut) and yield estimation (taksasi), with monthly
//! period closing.
//!
//! ## Services
//!
//! - **Records**: per-kind CRUD and recaps
//! - **Closing**: closed periods and the gate every record write passes through
//! - **Activity**: audit trail of mutations and closing operations

pub mod activity;
pub mod auth;
pub mod closing;
pub mod config;
pub mod db;
pub mod records;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, SawitError};
