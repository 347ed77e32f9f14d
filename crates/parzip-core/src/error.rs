use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParzipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid container format: {0}")]
    InvalidFormat(&'static str),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("decompression error: {0}")]
    Decompression(String),
    #[error("pipeline error: {0}")]
    Pipeline(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ParzipError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ParzipError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Attaches the file the error belongs to, for per-file diagnostics.
    pub fn for_file(self, path: &Path) -> Self {
        self.with_context(path.display().to_string())
    }
}
