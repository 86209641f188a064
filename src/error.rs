//! Error types for loading, flattening, exporting and authenticating.
//!
//! The core returns typed errors; [`LoadError::user_message`] and friends turn them into
//! the short messages shown in a tab's status line.

use thiserror::Error;

/// Row nesting exceeded the flattening depth bound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Row is nested deeper than {max_depth} levels at '{path}'")]
pub struct StructuralError {
    /// Dotted path of the object that crossed the bound.
    pub path: String,
    pub max_depth: usize,
}

/// Failure of a page load.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The endpoint could not be reached (DNS, connect, TLS, timeout, broken body).
    #[error("Network error reaching {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a status outside 2xx.
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16, url: String },

    /// The body was not the expected `{ "data": ..., "meta": {...} }` shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A load for this tab is still running.
    #[error("A load is already in progress for this tab")]
    InProgress,

    #[error("No endpoint configured for this tab")]
    MissingEndpoint,

    #[error("Load cancelled")]
    Cancelled,
}

impl LoadError {
    /// True for errors that reject a request before it starts. These never touch tab state.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InProgress | Self::MissingEndpoint)
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { url, message } => {
                format!("Could not reach {url}. Check the URL and your connection ({message}).")
            }
            Self::HttpStatus { status, .. } => match status {
                401 | 403 => format!("HTTP error! status: {status}. Log in and try again."),
                404 => format!("HTTP error! status: {status}. Check the endpoint URL."),
                _ => format!("HTTP error! status: {status}"),
            },
            Self::MalformedResponse(msg) => format!("Unexpected response: {msg}"),
            Self::Structural(e) => e.to_string(),
            Self::InProgress => "Still loading, wait for the current load to finish.".to_string(),
            Self::MissingEndpoint => "Enter an endpoint URL first.".to_string(),
            Self::Cancelled => "Load cancelled.".to_string(),
        }
    }
}

/// Failure of a CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    EmptyData,

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure obtaining a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Network error reaching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Authentication failed (status {status})")]
    HttpStatus { status: u16 },

    #[error("Malformed authentication response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            Self::HttpStatus { status: 400 | 401 | 403 } => {
                "Authentication failed. Check username and password.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_carries_code() {
        let err = LoadError::HttpStatus {
            status: 500,
            url: "http://h/x".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert_eq!(err.user_message(), "HTTP error! status: 500");
    }

    #[test]
    fn unauthorized_suggests_login() {
        let err = LoadError::HttpStatus {
            status: 401,
            url: String::new(),
        };
        assert!(err.user_message().contains("Log in"));
    }

    #[test]
    fn rejections_are_distinguished() {
        assert!(LoadError::InProgress.is_rejection());
        assert!(LoadError::MissingEndpoint.is_rejection());
        assert!(!LoadError::Cancelled.is_rejection());
        assert!(!LoadError::MalformedResponse("x".into()).is_rejection());
    }

    #[test]
    fn structural_error_converts_into_load_error() {
        let err: LoadError = StructuralError {
            path: "a.b".to_string(),
            max_depth: 64,
        }
        .into();
        assert!(err.user_message().contains("deeper than 64"));
    }

    #[test]
    fn empty_export_message() {
        assert_eq!(ExportError::EmptyData.to_string(), "No data to export");
    }
}
