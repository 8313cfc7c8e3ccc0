use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HakbotError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HakbotError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for failures caused by the data files on disk
    /// (missing, unreadable, slow, or malformed).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Csv(_) | Self::Json(_) | Self::Timeout(_)
        )
    }
}

impl From<csv::Error> for HakbotError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HakbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = HakbotError::io(
            "/srv/data/meals.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/srv/data/meals.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_data_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(HakbotError::Json(json_err).is_data_error());
        assert!(HakbotError::Csv("bad row".into()).is_data_error());
        assert!(HakbotError::Timeout("meals.csv".into()).is_data_error());
    }

    #[test]
    fn test_non_data_errors() {
        assert!(!HakbotError::Unauthorized("no session".into()).is_data_error());
        assert!(!HakbotError::Storage("locked".into()).is_data_error());
        assert!(!HakbotError::Config("missing path".into()).is_data_error());
    }
}
