//! Progress-callback trait for per-pass extraction events.
//!
//! Inject an [`Arc<dyn ExtractProgressCallback>`] via
//! [`crate::config::ExtractConfigBuilder::progress_callback`] to receive
//! real-time events as the scroll loop works through the document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, or a terminal
//! progress bar — without the library knowing anything about how the host
//! application communicates. Unlike a page count, the total amount of work is
//! unknown up front (the document reveals itself as it scrolls), so events
//! report running totals rather than fractions.

use std::sync::Arc;

/// Called by the extraction session as each pass completes.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ExtractProgressCallback: Send + Sync {
    /// Called after each scan pass.
    ///
    /// # Arguments
    /// * `pass`         — 1-indexed pass number
    /// * `new_blocks`   — blocks admitted on this pass
    /// * `total_blocks` — blocks admitted so far across all passes
    fn on_pass(&self, pass: u64, new_blocks: usize, total_blocks: usize) {
        let _ = (pass, new_blocks, total_blocks);
    }

    /// Called when a canvas image is persisted for the first time.
    ///
    /// # Arguments
    /// * `id`   — the block identity the image belongs to
    /// * `path` — filesystem path of the written PNG
    fn on_image_captured(&self, id: &str, path: &std::path::Path) {
        let _ = (id, path);
    }

    /// Called once when the stall counter reaches its threshold.
    ///
    /// # Arguments
    /// * `passes`       — total passes performed
    /// * `total_blocks` — blocks emitted over the whole session
    fn on_converged(&self, passes: u64, total_blocks: usize) {
        let _ = (passes, total_blocks);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractConfig`].
pub type ProgressCallback = Arc<dyn ExtractProgressCallback>;
