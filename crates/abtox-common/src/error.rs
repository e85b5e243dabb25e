use thiserror::Error;

/// Error taxonomy shared by the ingestion and aggregation crates.
///
/// `Http` and `Transport` are fatal for a run. `MalformedRecord` is raised
/// per study and caught at the per-trial boundary.
#[derive(Debug, Error)]
pub enum AbtoxError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed registry record: {0}")]
    MalformedRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sandbox denied request: {0}")]
    SecurityError(String),

    #[error("Run interrupted before completion")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AbtoxError {
    /// True for errors that must abort the whole run rather than skip a record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AbtoxError::MalformedRecord(_))
    }
}

pub type Result<T> = std::result::Result<T, AbtoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_is_not_fatal() {
        assert!(!AbtoxError::MalformedRecord("no nctId".into()).is_fatal());
        assert!(AbtoxError::Transport("HTTP 503".into()).is_fatal());
        assert!(AbtoxError::Interrupted.is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let e = AbtoxError::Config("page_size must be > 0".into());
        assert_eq!(e.to_string(), "Configuration error: page_size must be > 0");
    }
}
