//! Shared types

mod date;
mod error;

pub use date::{format_day, parse_day};
pub use error::{Result, SawitError};
