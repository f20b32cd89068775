//! Error types for the outline2md library.
//!
//! Only conditions that make the session pointless to continue are modelled
//! as errors: bad configuration, failure to open or write the output, or a
//! capability provider that cannot be set up at all.
//!
//! Everything that goes wrong *during* a pass — a stale node handle, a block
//! whose inner structure is missing, an unpainted canvas, an unrecognised
//! class — degrades instead: a retry on a later pass, a fallback fragment, or
//! a skip with a `tracing` warning. A hostile render never aborts the
//! session; at worst it converges with less content.

use crate::dom::DomError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the outline2md library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Output errors ─────────────────────────────────────────────────────
    /// The output file could not be created.
    #[error("Cannot create output file '{path}': {source}\nCheck the directory exists and is writable.")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the output sink failed.
    #[error("Cannot write output: {source}")]
    OutputWrite {
        #[source]
        source: std::io::Error,
    },

    /// An image file could not be persisted.
    #[error("Cannot write image '{path}': {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Session errors ────────────────────────────────────────────────────
    /// A DOM failure outside the per-pass retry envelope, e.g. while
    /// locating the document container during setup.
    #[error("DOM capability failed: {0}")]
    Dom(#[from] DomError),

    /// The capability provider session could not be established.
    #[error("Session setup failed: {0}")]
    Session(String),

    // ── Configuration errors ──────────────────────────────────────────────
    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
