//! Error types for the copy pipeline.

use thiserror::Error;

/// Errors that abort a copy run or a single bulk flush.
#[derive(Error, Debug)]
pub enum Error {
    #[error("the database provider '{0}' is not supported")]
    UnsupportedProvider(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{provider} connection failed: {detail}")]
    Connection { provider: &'static str, detail: String },

    #[error("{provider} query failed: {detail}")]
    Query { provider: &'static str, detail: String },

    #[error("couldn't find timestamp field: '{0}'")]
    MissingTimestampField(String),

    #[error("bulk request to '{url}' failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("failed to serialize document as JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write '{path}': {source}")]
    SideFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn config(detail: impl std::fmt::Display) -> Self {
        Error::Config(detail.to_string())
    }

    pub fn connection(provider: &'static str, detail: impl std::fmt::Display) -> Self {
        Error::Connection {
            provider,
            detail: detail.to_string(),
        }
    }

    pub fn query(provider: &'static str, detail: impl std::fmt::Display) -> Self {
        Error::Query {
            provider,
            detail: detail.to_string(),
        }
    }

    pub fn transport(url: &str, detail: impl std::fmt::Display) -> Self {
        Error::Transport {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn side_file(path: &str, source: std::io::Error) -> Self {
        Error::SideFile {
            path: path.to_string(),
            source,
        }
    }
}

/// Result type alias for copy pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
