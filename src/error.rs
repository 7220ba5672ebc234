//! Error types for feed loading.
//!
//! Only failures to obtain or structurally read the feed are errors. Invalid
//! rows are dropped during normalization and an empty selection is a normal
//! state, so neither appears here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Feed unreachable: transport failure, non-success status or unreadable file.
    #[error("failed to fetch feed from {source_location}: {message}")]
    Fetch {
        source_location: String,
        message: String,
    },

    /// The document is not well-formed CSV.
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The header lacks one of the columns the dashboard depends on.
    #[error("feed is missing required column '{0}'")]
    Schema(&'static str),
}

impl FeedError {
    pub fn fetch(source_location: &str, message: impl ToString) -> Self {
        FeedError::Fetch {
            source_location: source_location.to_string(),
            message: message.to_string(),
        }
    }

    /// `true` for transport-level failures that may succeed on retry.
    pub fn is_fetch(&self) -> bool {
        matches!(self, FeedError::Fetch { .. })
    }
}
