//! Configuration types for outline extraction.
//!
//! All extraction behaviour is controlled through [`ExtractConfig`], built
//! via its [`ExtractConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder lets callers set only what they care about and rely on documented
//! defaults for the rest.

use crate::error::ExtractError;
use crate::progress::ExtractProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an outline extraction session.
///
/// Built via [`ExtractConfig::builder()`] or using
/// [`ExtractConfig::default()`].
///
/// # Example
/// ```rust
/// use outline2md::ExtractConfig;
///
/// let config = ExtractConfig::builder()
///     .output_path("notes.md")
///     .scroll_step(400)
///     .stall_threshold(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Path of the Markdown output file. Default: `out.md`.
    pub output_path: PathBuf,

    /// Directory for captured canvas images. Default: the output file's
    /// parent directory. Created on first capture if missing.
    pub image_dir: Option<PathBuf>,

    /// Vertical scroll distance per gesture in pixels. Default: 250.
    ///
    /// Smaller steps give the virtualised renderer more chances to
    /// materialise every block; larger steps finish faster on documents
    /// that render eagerly.
    pub scroll_step: i64,

    /// Upper bound on one scroll gesture in milliseconds. Default: 1000.
    ///
    /// The gesture only needs to be dispatched. A WebDriver round-trip that
    /// hangs past this bound is abandoned and the pass continues; the next
    /// pass scrolls again.
    pub gesture_timeout_ms: u64,

    /// Wait after each scroll for the renderer to settle, in milliseconds.
    /// Default: 3000.
    ///
    /// Virtualised outlines load content asynchronously after a scroll.
    /// Lowering this speeds up extraction but risks passes that see nothing
    /// new and push the stall counter toward a premature convergence.
    pub settle_delay_ms: u64,

    /// Consecutive no-new-content passes before declaring convergence.
    /// Default: 5.
    pub stall_threshold: u32,

    /// Failed capture attempts before a canvas is given up on. Default: 8.
    /// `None` retries forever (a canvas the renderer never paints then keeps
    /// the session scrolling until the stall threshold ends it).
    pub max_canvas_attempts: Option<u32>,

    /// Wait before the first pass so the initial viewport renders, in
    /// milliseconds. Default: 1000.
    pub initial_wait_ms: u64,

    /// Progress callback invoked on pass and capture events.
    pub progress_callback: Option<Arc<dyn ExtractProgressCallback>>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("out.md"),
            image_dir: None,
            scroll_step: 250,
            gesture_timeout_ms: 1000,
            settle_delay_ms: 3000,
            stall_threshold: 5,
            max_canvas_attempts: Some(8),
            initial_wait_ms: 1000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("output_path", &self.output_path)
            .field("image_dir", &self.image_dir)
            .field("scroll_step", &self.scroll_step)
            .field("gesture_timeout_ms", &self.gesture_timeout_ms)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("stall_threshold", &self.stall_threshold)
            .field("max_canvas_attempts", &self.max_canvas_attempts)
            .field("initial_wait_ms", &self.initial_wait_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory canvas images are written to.
    pub fn resolved_image_dir(&self) -> PathBuf {
        match &self.image_dir {
            Some(dir) => dir.clone(),
            None => self
                .output_path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = Some(dir.into());
        self
    }

    pub fn scroll_step(mut self, px: i64) -> Self {
        self.config.scroll_step = px;
        self
    }

    pub fn gesture_timeout_ms(mut self, ms: u64) -> Self {
        self.config.gesture_timeout_ms = ms;
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn stall_threshold(mut self, n: u32) -> Self {
        self.config.stall_threshold = n;
        self
    }

    pub fn max_canvas_attempts(mut self, n: Option<u32>) -> Self {
        self.config.max_canvas_attempts = n;
        self
    }

    pub fn initial_wait_ms(mut self, ms: u64) -> Self {
        self.config.initial_wait_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ExtractProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, ExtractError> {
        let c = &self.config;
        if c.stall_threshold == 0 {
            return Err(ExtractError::InvalidConfig(
                "stall_threshold must be at least 1".into(),
            ));
        }
        if c.scroll_step == 0 {
            return Err(ExtractError::InvalidConfig(
                "scroll_step must be non-zero".into(),
            ));
        }
        if c.gesture_timeout_ms == 0 {
            return Err(ExtractError::InvalidConfig(
                "gesture_timeout_ms must be at least 1".into(),
            ));
        }
        if matches!(c.max_canvas_attempts, Some(0)) {
            return Err(ExtractError::InvalidConfig(
                "max_canvas_attempts must be at least 1 (or unset)".into(),
            ));
        }
        Ok(self.config)
    }
}
