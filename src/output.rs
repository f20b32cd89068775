//! Result types for an extraction session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Statistics from a completed extraction session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Scan passes performed before convergence.
    pub passes: u64,
    /// Blocks converted and admitted to the output.
    pub blocks_converted: usize,
    /// Canvas images persisted to disk.
    pub images_captured: usize,
    /// Canvases given up on after the configured attempt limit.
    pub canvases_abandoned: usize,
    /// Blocks emitted through the unknown-class diagnostic fallback.
    pub unknown_blocks: usize,
    /// Fragments appended to the output.
    pub fragments_written: u64,
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// Wall-clock duration of the session in milliseconds.
    pub total_duration_ms: u64,
}

/// Output of a completed extraction session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    /// Path of the Markdown file, when the session wrote one.
    pub output_path: Option<PathBuf>,
    /// Paths of captured canvas images, in capture order.
    pub images: Vec<PathBuf>,
    /// Session statistics.
    pub stats: ExtractStats,
}
