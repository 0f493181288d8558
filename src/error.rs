//! Application-wide error types using thiserror
//!
//! Each layer has its own error enum (`ExchangeError`, `ApiError`,
//! `SessionError`); all of them convert into `AppError`.

use crate::adapters::errors::ExchangeError;
use crate::api::ApiError;
use crate::core::session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_converts_to_app_error() {
        let exchange_err = ExchangeError::ConnectionFailed("timeout".into());
        let app_err: AppError = exchange_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("Exchange error"), "Got: {}", msg);
        assert!(msg.contains("timeout"), "Got: {}", msg);
    }

    #[test]
    fn test_api_error_converts_to_app_error() {
        let api_err = ApiError::Rejected {
            status: 400,
            message: "Insufficient balance".into(),
        };
        let app_err: AppError = api_err.into();
        let msg = app_err.to_string();
        assert!(msg.starts_with("API error"), "Got: {}", msg);
        assert!(msg.contains("Insufficient balance"), "Got: {}", msg);
    }

    #[test]
    fn test_session_error_converts_to_app_error() {
        let app_err: AppError = SessionError::NotAuthenticated.into();
        assert!(app_err.to_string().contains("Session error"));
    }

    #[test]
    fn test_serde_error_converts_to_app_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = serde_err.into();
        assert!(app_err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_io_error_converts_to_app_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let app_err: AppError = io_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("IO error"), "Got: {}", msg);
        assert!(msg.contains("file missing"), "Got: {}", msg);
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("feed.ws_url must start with ws://".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: feed.ws_url must start with ws://"
        );
    }
}
