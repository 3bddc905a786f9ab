//! Error types for the retrieval-and-answer pipeline.
//!
//! Library modules return [`RagError`]; `main` wraps it with `anyhow` for
//! context chains on stderr.

/// Fatal failures of one question-answering invocation.
///
/// A classifier reply that names no known title is not an error: it produces
/// an empty selection (see `rag::select`).
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Invalid configuration value.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network failure or non-success status while fetching a corpus document.
    #[error("fetch failed for {source_id}: {message}")]
    Fetch { source_id: String, message: String },

    /// Fetched bytes could not be turned into page text.
    #[error("decode failed for {source_id}: {message}")]
    Decode { source_id: String, message: String },

    /// Completion backend unreachable, errored, or returned an unusable envelope.
    #[error("generation error: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn fetch(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn decode(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }
}
