//! Canvas capture: export, validate, persist, reference.
//!
//! Whiteboard and synced-source blocks render onto a `<canvas>` that the
//! renderer paints some time after the block enters the viewport. Capture is
//! therefore best-effort per pass: a missing canvas or an export that yields
//! garbage counts as one failed attempt and the block stays unadmitted so a
//! later pass retries. Attempts are bounded by
//! [`max_canvas_attempts`](crate::config::ExtractConfig::max_canvas_attempts);
//! a canvas that never paints is eventually given up on so the session can
//! converge.
//!
//! Only filesystem failures are fatal here: if the PNG cannot be written the
//! whole session is in trouble, not just this block.

use crate::dom::{selectors, DomCapability, ScriptArg};
use crate::error::ExtractError;
use crate::extract::ExtractSession;
use crate::pipeline::scan::ScannedBlock;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

/// Capture the canvas within `block`, once per identity.
///
/// Returns `true` when the block needs no further passes: its image is
/// persisted and referenced, or it has been given up on.
pub(crate) async fn capture_canvas<D, W>(
    session: &mut ExtractSession<'_, D, W>,
    block: &ScannedBlock<D::Node>,
    depth: usize,
) -> Result<bool, ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    let id = &block.id;

    if session.images.is_captured(id) {
        return Ok(true);
    }
    if let Some(limit) = session.config.max_canvas_attempts {
        if session.images.attempts(id) >= limit {
            return Ok(true);
        }
    }

    let png = match export_png(session, block).await {
        Some(png) => png,
        None => return Ok(record_failure(session, id)),
    };

    let file_name = format!("canvas-{}.png", id);
    let dir = session.image_dir.clone();
    let path = dir.join(&file_name);

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| ExtractError::ImageWrite {
            path: dir.clone(),
            source,
        })?;
    tokio::fs::write(&path, &png)
        .await
        .map_err(|source| ExtractError::ImageWrite {
            path: path.clone(),
            source,
        })?;

    // Reference relative to the output file when the image sits next to it.
    let reference = if session.config.image_dir.is_none() {
        file_name
    } else {
        path.display().to_string()
    };
    session
        .write(&format!("![canvas]({})\n\n", reference), depth)
        .await?;

    info!(id = %id, path = %path.display(), "canvas captured");
    session.images.mark_captured(id);
    session.stats.images_captured += 1;
    session.image_paths.push(path.clone());
    if let Some(cb) = &session.config.progress_callback {
        cb.on_image_captured(id, &path);
    }

    Ok(true)
}

/// Export and validate the canvas payload. `None` is a transient failure.
async fn export_png<D, W>(
    session: &ExtractSession<'_, D, W>,
    block: &ScannedBlock<D::Node>,
) -> Option<Vec<u8>>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    let canvas = match session
        .dom
        .query_one(selectors::CANVAS, Some(&block.node))
        .await
    {
        Ok(Some(canvas)) => canvas,
        Ok(None) => {
            debug!(id = %block.id, "canvas element not rendered yet");
            return None;
        }
        Err(e) => {
            debug!(id = %block.id, "canvas lookup failed: {e}");
            return None;
        }
    };

    let value = match session
        .dom
        .evaluate(selectors::CANVAS_TO_PNG, vec![ScriptArg::Node(canvas)])
        .await
    {
        Ok(value) => value,
        Err(e) => {
            debug!(id = %block.id, "canvas export script failed: {e}");
            return None;
        }
    };

    let encoded = value.as_str()?;
    let png = match STANDARD.decode(encoded) {
        Ok(png) => png,
        Err(e) => {
            debug!(id = %block.id, "canvas payload is not valid base64: {e}");
            return None;
        }
    };

    // An unpainted canvas exports as a valid-looking but empty or truncated
    // payload; decoding proves we have a real PNG before persisting it.
    if let Err(e) = image::load_from_memory(&png) {
        debug!(id = %block.id, "canvas payload is not a decodable image: {e}");
        return None;
    }

    Some(png)
}

/// Record one failed attempt; returns `true` when the canvas is given up on.
fn record_failure<D, W>(session: &mut ExtractSession<'_, D, W>, id: &str) -> bool
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    let attempts = session.images.record_attempt(id);
    if let Some(limit) = session.config.max_canvas_attempts {
        if attempts >= limit {
            warn!(id = %id, attempts, "giving up on canvas");
            session.stats.canvases_abandoned += 1;
            return true;
        }
    }
    false
}
