//! Error taxonomy for the validator pipeline.
//!
//! `ArtifactError` and `ProbeError` are fatal for a run; `InferenceError`
//! is local to one probe and never aborts the remaining battery.

use std::path::PathBuf;

/// Errors raised while opening a packaged model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("malformed model artifact: {0}")]
    Malformed(String),

    #[error("unsupported tensor element type: {0}")]
    UnsupportedElementType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building the synthetic probe battery.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("cannot probe tensor shape {shape:?}: {reason}")]
    UnsupportedShape { shape: Vec<usize>, reason: String },

    #[error("cannot decode probe image: {0}")]
    Image(#[from] image::ImageError),
}

/// Per-probe interpreter failures. Recorded against the probe, the run
/// continues.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("input type mismatch: interpreter expects {expected}, probe holds {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("input shape mismatch: interpreter expects {expected:?}, probe holds {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("interpreter execution failed: {0}")]
    Execution(String),

    #[error("cannot decode output tensor: {0}")]
    Decode(String),
}
