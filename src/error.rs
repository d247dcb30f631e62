use thiserror::Error;

/// Main error type for Critsvis
#[derive(Error, Debug)]
pub enum VisError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encode/decode errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity lookup failed in the backing store
    #[error("Repository error: {0}")]
    Repository(String),

    /// Traversal exceeded its node or time budget
    #[error("Traversal budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using VisError
pub type Result<T> = std::result::Result<T, VisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let vis_err: VisError = rusqlite_err.into();
        assert!(matches!(vis_err, VisError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vis_err: VisError = io_err.into();
        assert!(matches!(vis_err, VisError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let vis_err: VisError = json_err.into();
        assert!(matches!(vis_err, VisError::Serialization(_)));
    }

    #[test]
    fn test_budget_exceeded_display() {
        let err = VisError::BudgetExceeded("node limit 10 reached".to_string());
        assert_eq!(err.to_string(), "Traversal budget exceeded: node limit 10 reached");
    }
}
