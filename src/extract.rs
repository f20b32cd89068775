//! Scroll-convergence extraction session.
//!
//! The controller alternates scan passes with scroll gestures until the
//! document stops yielding new blocks. Convergence is purely observational:
//! a pass that admits nothing bumps a stall counter, any new content resets
//! it, and the session ends once the counter passes its threshold. There is
//! no notion of document length — a virtualised renderer does not expose
//! one.
//!
//! The scroll gesture is bounded by [`tokio::time::timeout`]: a WebDriver
//! round-trip that hangs must not wedge the loop, and a missed gesture only
//! costs one pass of progress.

use crate::config::ExtractConfig;
use crate::dom::{selectors, DomCapability};
use crate::error::ExtractError;
use crate::output::{ExtractOutput, ExtractStats};
use crate::pipeline::block::convert_block;
use crate::pipeline::scan::scan_roots;
use crate::pipeline::writer::MarkupWriter;
use crate::registry::{AppearRegistry, ImageRegistry};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncWrite, BufWriter};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Mutable state shared by the controller and the converters for the
/// lifetime of one extraction.
pub(crate) struct ExtractSession<'a, D: DomCapability, W> {
    pub dom: &'a D,
    pub config: &'a ExtractConfig,
    pub appear: AppearRegistry,
    pub images: ImageRegistry,
    pub writer: MarkupWriter<W>,
    pub stats: ExtractStats,
    pub image_dir: PathBuf,
    pub image_paths: Vec<PathBuf>,
}

impl<'a, D, W> ExtractSession<'a, D, W>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    fn new(dom: &'a D, config: &'a ExtractConfig, sink: W) -> Self {
        Self {
            dom,
            config,
            appear: AppearRegistry::new(),
            images: ImageRegistry::new(),
            writer: MarkupWriter::new(sink),
            stats: ExtractStats::default(),
            image_dir: config.resolved_image_dir(),
            image_paths: Vec::new(),
        }
    }

    /// Append a fragment to the output at the given depth.
    pub(crate) async fn write(&mut self, fragment: &str, depth: usize) -> Result<(), ExtractError> {
        self.writer
            .append(fragment, depth)
            .await
            .map_err(|source| ExtractError::OutputWrite { source })
    }

    /// Admit an identity, counting it once.
    pub(crate) fn admit_block(&mut self, id: &str) -> bool {
        let first = self.appear.admit(id);
        if first {
            self.stats.blocks_converted += 1;
        }
        first
    }

    /// One scan pass over the root block list. Returns the number of
    /// newly-admitted top-level blocks.
    async fn pass(&mut self) -> Result<usize, ExtractError> {
        let roots = match scan_roots(self.dom).await {
            Ok(roots) => roots,
            Err(e) => {
                warn!("root scan failed, treating pass as empty: {e}");
                Vec::new()
            }
        };

        let mut newly = 0;
        for block in &roots {
            // Canvas blocks bypass the registry check so capture can retry;
            // their output is deduplicated downstream.
            if !block.kind.is_canvas() && self.appear.contains(&block.id) {
                continue;
            }
            if convert_block(self, block, 0).await? && self.admit_block(&block.id) {
                newly += 1;
            }
        }
        Ok(newly)
    }

    /// Dispatch one scroll gesture, bounded by the configured timeout.
    /// Failures are tolerated; the next pass scrolls again.
    async fn scroll_gesture(&self) {
        let gesture = async {
            let container = self
                .dom
                .query_one(selectors::SCROLL_CONTAINER, None)
                .await?;
            match container {
                Some(container) => {
                    self.dom
                        .scroll_by(&container, 0, self.config.scroll_step)
                        .await
                }
                None => {
                    debug!("scroll container not found");
                    Ok(())
                }
            }
        };
        let bound = Duration::from_millis(self.config.gesture_timeout_ms);
        match timeout(bound, gesture).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("scroll gesture failed: {e}"),
            Err(_) => debug!("scroll gesture timed out after {:?}", bound),
        }
    }

    /// Run passes until the stall counter exceeds its threshold.
    async fn run(&mut self) -> Result<(), ExtractError> {
        if self.config.initial_wait_ms > 0 {
            sleep(Duration::from_millis(self.config.initial_wait_ms)).await;
        }

        let mut stall = 0u32;
        loop {
            self.stats.passes += 1;
            let newly = self.pass().await?;
            debug!(
                pass = self.stats.passes,
                newly,
                total = self.appear.len(),
                "pass complete"
            );
            if let Some(cb) = &self.config.progress_callback {
                cb.on_pass(self.stats.passes, newly, self.appear.len());
            }

            self.scroll_gesture().await;
            if self.config.settle_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
            }

            if newly == 0 {
                stall += 1;
                if stall > self.config.stall_threshold {
                    break;
                }
            } else {
                stall = 0;
            }
        }

        info!(
            passes = self.stats.passes,
            blocks = self.stats.blocks_converted,
            images = self.stats.images_captured,
            "extraction converged"
        );
        if let Some(cb) = &self.config.progress_callback {
            cb.on_converged(self.stats.passes, self.stats.blocks_converted);
        }
        Ok(())
    }
}

/// Extract the document into the configured output file.
///
/// The file is created up front, held open for the whole session, and
/// flushed at convergence. Canvas images land next to it (or in
/// `image_dir`).
///
/// # Errors
/// Fatal only: invalid config, output or image I/O, session setup. Per-pass
/// DOM trouble degrades to retries and never surfaces here.
pub async fn extract<D>(dom: &D, config: &ExtractConfig) -> Result<ExtractOutput, ExtractError>
where
    D: DomCapability,
{
    let file = tokio::fs::File::create(&config.output_path)
        .await
        .map_err(|source| ExtractError::OutputCreate {
            path: config.output_path.clone(),
            source,
        })?;
    let (mut output, _sink) = run_session(dom, config, BufWriter::new(file)).await?;
    output.output_path = Some(config.output_path.clone());
    Ok(output)
}

/// Extract into an arbitrary async sink instead of a file.
///
/// The sink is returned alongside the results so in-memory callers can
/// inspect what was written.
pub async fn extract_with_writer<D, W>(
    dom: &D,
    config: &ExtractConfig,
    sink: W,
) -> Result<(ExtractOutput, W), ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    run_session(dom, config, sink).await
}

async fn run_session<D, W>(
    dom: &D,
    config: &ExtractConfig,
    sink: W,
) -> Result<(ExtractOutput, W), ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    info!(output = %config.output_path.display(), "starting extraction");
    let start = Instant::now();

    let mut session = ExtractSession::new(dom, config, sink);
    session.run().await?;

    let ExtractSession {
        writer,
        mut stats,
        image_paths,
        ..
    } = session;
    let (sink, fragments, bytes) = writer
        .finish()
        .await
        .map_err(|source| ExtractError::OutputWrite { source })?;
    stats.fragments_written = fragments;
    stats.bytes_written = bytes;
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    Ok((
        ExtractOutput {
            output_path: None,
            images: image_paths,
            stats,
        },
        sink,
    ))
}
