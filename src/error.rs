//! Error types shared by the report and converter pipelines.
//!
//! Drawing problems come in two flavours. [`DrawError::Font`] is recoverable:
//! the painter retries with the default font family and reports a degraded
//! chart. Everything else is a [`RenderFailure`] that aborts one chart only.

use std::path::PathBuf;
use thiserror::Error;

/// Low-level failure raised while painting a single image.
#[derive(Debug, Error)]
pub enum DrawError {
    /// The requested font family could not be resolved or rasterised.
    #[error("font unavailable: {0}")]
    Font(String),

    /// Any other backend failure (bitmap encoding, layout, I/O on present).
    #[error("drawing backend error: {0}")]
    Backend(String),
}

/// Fatal-per-chart failure surfaced to the report assembler.
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write image '{path}': {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Failure converting one file. Directory runs record these and move on.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create backup '{path}': {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure loading a label-mapping resource that exists but is unusable.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("cannot read label table '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("label table '{path}' is not a flat string map: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
