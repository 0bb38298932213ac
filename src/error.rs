use std::path::PathBuf;

use thiserror::Error;

use crate::data::matcher::QueryField;

/// The roll could not be loaded. Fatal for the session: no search can run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataLoadError {
    #[error("voter roll not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported voter roll format '.{extension}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to read voter roll {}: {cause}", path.display())]
    Unreadable { path: PathBuf, cause: String },

    #[error("voter roll {} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// A search request that was not executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("enter a voter name or a relation name")]
    EmptyQuery,

    #[error("{0} is required for an exact search")]
    MissingField(QueryField),

    #[error("no voter data available: {0}")]
    DataUnavailable(#[from] DataLoadError),
}

impl SearchError {
    /// Validation problems the user can fix by editing the query.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SearchError::DataUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown search mode '{0}' (expected 'substring' or 'exact')")]
    InvalidMode(String),
}
