//! Block-to-Markdown conversion.
//!
//! One block in, one fragment out. The dispatch is keyed on [`BlockKind`];
//! ordered-list items re-enter the scanner for their nested children at
//! `depth + 1`. A `true` return means the block's content is in the output
//! (now or on an earlier pass) and its identity can be admitted; `false`
//! means the block is incomplete and should be retried on a later pass.

use crate::error::ExtractError;
use crate::extract::ExtractSession;
use crate::pipeline::inline::{format_line, LINE_FALLBACK};
use crate::pipeline::media;
use crate::pipeline::scan::{scan_blocks, BlockKind, ScannedBlock};
use crate::dom::{selectors, DomCapability};
use async_recursion::async_recursion;
use tokio::io::AsyncWrite;
use tracing::warn;

/// Convert one block, writing its fragment at `depth`.
///
/// DOM failures inside the conversion are transient by contract: the block
/// is left unadmitted and the next pass tries again.
#[async_recursion]
pub(crate) async fn convert_block<D, W>(
    session: &mut ExtractSession<'_, D, W>,
    block: &ScannedBlock<D::Node>,
    depth: usize,
) -> Result<bool, ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    match dispatch(session, block, depth).await {
        Ok(emitted) => Ok(emitted),
        Err(ExtractError::Dom(e)) => {
            warn!(id = %block.id, "block read failed, deferring to next pass: {e}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn dispatch<D, W>(
    session: &mut ExtractSession<'_, D, W>,
    block: &ScannedBlock<D::Node>,
    depth: usize,
) -> Result<bool, ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    match block.kind {
        BlockKind::Heading1 => {
            let text = line_or_fallback(session, &block.node).await?;
            session.write(&format!("# {}\n\n", text), depth).await?;
            Ok(true)
        }
        BlockKind::Heading2 => {
            let text = line_or_fallback(session, &block.node).await?;
            session.write(&format!("## {}\n\n", text), depth).await?;
            Ok(true)
        }
        BlockKind::Paragraph => {
            let text = line_or_fallback(session, &block.node).await?;
            session.write(&format!("{}\n\n", text), depth).await?;
            Ok(true)
        }
        BlockKind::Code => {
            let raw = session.dom.text(&block.node).await?;
            session
                .write(&format!("```\n{}\n```\n\n", raw), depth)
                .await?;
            Ok(true)
        }
        BlockKind::OrderedListItem => convert_list(session, block, depth).await,
        BlockKind::UnorderedListItem => {
            // The renderer puts the bullet glyph on its own line; fold it
            // back into the item text.
            let raw = session.dom.text(&block.node).await?;
            let text = raw.trim().replacen('\n', " ", 1);
            session.write(&format!("{}\n\n", text), depth).await?;
            Ok(true)
        }
        BlockKind::TodoItem => {
            let raw = session.dom.text(&block.node).await?;
            session
                .write(&format!("- {}\n\n", raw.trim()), depth)
                .await?;
            Ok(true)
        }
        BlockKind::CanvasEmbed => media::capture_canvas(session, block, depth).await,
        BlockKind::Unknown => {
            warn!(id = %block.id, class = %block.class, "unrecognised block class");
            let raw = session.dom.text(&block.node).await?;
            session
                .write(&format!("{}:{}\n\n", block.class, raw.trim()), depth)
                .await?;
            session.stats.unknown_blocks += 1;
            Ok(true)
        }
    }
}

/// Ordered-list item: emit the item's own line, then convert nested child
/// blocks one level deeper.
async fn convert_list<D, W>(
    session: &mut ExtractSession<'_, D, W>,
    block: &ScannedBlock<D::Node>,
    depth: usize,
) -> Result<bool, ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    // Resolve everything the item needs before touching the output: a
    // transient read failure here must leave nothing written, or the retry
    // pass would emit the head line twice.
    let head_text = match session
        .dom
        .query_one(selectors::LIST_HEAD, Some(&block.node))
        .await?
    {
        Some(head) => format_line(session.dom, &head)
            .await?
            .unwrap_or_else(|| LINE_FALLBACK.to_string()),
        None => LINE_FALLBACK.to_string(),
    };
    let child_blocks = match session
        .dom
        .query_one(selectors::LIST_CHILDREN, Some(&block.node))
        .await?
    {
        Some(children) => {
            scan_blocks(session.dom, Some(&children), selectors::CHILD_BLOCKS).await?
        }
        None => Vec::new(),
    };

    session.write(&format!("{}\n\n", head_text), depth).await?;

    // Children catch their own transient failures inside convert_block, so
    // nothing below can error between the head write and Ok(true) except
    // fatal output I/O.
    for child in &child_blocks {
        if convert_block(session, child, depth + 1).await? {
            session.admit_block(&child.id);
        }
    }

    Ok(true)
}

async fn line_or_fallback<D, W>(
    session: &ExtractSession<'_, D, W>,
    node: &D::Node,
) -> Result<String, ExtractError>
where
    D: DomCapability,
    W: AsyncWrite + Unpin + Send + Sync,
{
    Ok(format_line(session.dom, node)
        .await?
        .unwrap_or_else(|| LINE_FALLBACK.to_string()))
}
