//! Error types for SawiTrack
//!
//! Every error reaches the client as `{"error": "<display text>"}`, so the
//! display strings here are user-facing.

use chrono::NaiveDate;
use hyper::StatusCode;

/// Main error type for SawiTrack operations
#[derive(Debug, thiserror::Error)]
pub enum SawitError {
    #[error("{0}")]
    Validation(String),

    /// Write rejected because the record's date lies in a closed period
    #[error("Periode untuk tanggal {0} sudah ditutup.")]
    PeriodClosed(NaiveDate),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SawitError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PeriodClosed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() }).to_string();
        (status, body)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<std::io::Error> for SawitError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SawitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid JSON body: {}", err))
    }
}

impl From<hyper::Error> for SawitError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for SawitError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for SawitError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode failed: {}", err))
    }
}

impl From<bson::de::Error> for SawitError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode failed: {}", err))
    }
}

/// Result type alias for SawiTrack operations
pub type Result<T> = std::result::Result<T, SawitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_closed_names_date() {
        let err = SawitError::PeriodClosed(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(err.to_string(), "Periode untuk tanggal 2025-01-15 sudah ditutup.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SawitError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(SawitError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            SawitError::Database("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_is_error_object() {
        let (status, body) = SawitError::not_found("Report not found").into_status_code_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"], "Report not found");
    }
}
