//! Block discovery and classification.
//!
//! A pass starts by scanning the root block list; list conversion re-enters
//! here to scan nested children. Each discovered block is resolved to its
//! identity (`data-record-id`) and a [`BlockKind`] derived from the class
//! attribute. Blocks the renderer has not fully materialised yet carry no
//! identity and are skipped for the pass.

use crate::dom::{selectors, DomCapability, DomError};
use tracing::debug;

/// The closed taxonomy of block classes the renderer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading1,
    Heading2,
    Paragraph,
    Code,
    OrderedListItem,
    UnorderedListItem,
    TodoItem,
    /// Whiteboard or synced-source embed rendered onto a canvas.
    CanvasEmbed,
    Unknown,
}

impl BlockKind {
    /// Classify from the element's class attribute (substring match; the
    /// renderer appends state classes around the type class).
    pub fn from_class(class: &str) -> Self {
        if class.contains("docx-heading1-block") {
            BlockKind::Heading1
        } else if class.contains("docx-heading2-block") {
            BlockKind::Heading2
        } else if class.contains("docx-text-block") {
            BlockKind::Paragraph
        } else if class.contains("docx-code-block") {
            BlockKind::Code
        } else if class.contains("docx-ordered-block") {
            BlockKind::OrderedListItem
        } else if class.contains("docx-unordered-block") {
            BlockKind::UnorderedListItem
        } else if class.contains("docx-todo-block") {
            BlockKind::TodoItem
        } else if class.contains("docx-whiteboard-block")
            || class.contains("docx-synced_source-block")
        {
            BlockKind::CanvasEmbed
        } else {
            BlockKind::Unknown
        }
    }

    /// Canvas blocks bypass scan-level dedup so capture can be retried.
    pub fn is_canvas(self) -> bool {
        matches!(self, BlockKind::CanvasEmbed)
    }
}

/// A discovered block: node handle plus resolved identity and kind.
#[derive(Debug, Clone)]
pub struct ScannedBlock<N> {
    pub node: N,
    pub id: String,
    pub class: String,
    pub kind: BlockKind,
}

/// Scan blocks matching `selector` under `scope`.
///
/// Id-less blocks are dropped with a debug log; they reappear with an
/// identity on a later pass once the renderer finishes materialising them.
pub async fn scan_blocks<D: DomCapability>(
    dom: &D,
    scope: Option<&D::Node>,
    selector: &str,
) -> Result<Vec<ScannedBlock<D::Node>>, DomError> {
    let nodes = dom.query_all(selector, scope).await?;
    let mut blocks = Vec::with_capacity(nodes.len());

    for node in nodes {
        let id = match dom.attribute(&node, selectors::RECORD_ID_ATTR).await? {
            Some(id) if !id.is_empty() => id,
            _ => {
                debug!("skipping block without record id");
                continue;
            }
        };
        let class = dom
            .attribute(&node, "class")
            .await?
            .unwrap_or_default();
        let kind = BlockKind::from_class(&class);
        blocks.push(ScannedBlock {
            node,
            id,
            class,
            kind,
        });
    }

    Ok(blocks)
}

/// Scan the document's top-level blocks.
pub async fn scan_roots<D: DomCapability>(
    dom: &D,
) -> Result<Vec<ScannedBlock<D::Node>>, DomError> {
    scan_blocks(dom, None, selectors::ROOT_BLOCKS).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_taxonomy() {
        assert_eq!(BlockKind::from_class("docx-heading1-block"), BlockKind::Heading1);
        assert_eq!(BlockKind::from_class("docx-heading2-block"), BlockKind::Heading2);
        assert_eq!(BlockKind::from_class("docx-text-block"), BlockKind::Paragraph);
        assert_eq!(BlockKind::from_class("docx-code-block"), BlockKind::Code);
        assert_eq!(
            BlockKind::from_class("docx-ordered-block"),
            BlockKind::OrderedListItem
        );
        assert_eq!(
            BlockKind::from_class("docx-unordered-block"),
            BlockKind::UnorderedListItem
        );
        assert_eq!(BlockKind::from_class("docx-todo-block"), BlockKind::TodoItem);
        assert_eq!(
            BlockKind::from_class("docx-whiteboard-block"),
            BlockKind::CanvasEmbed
        );
        assert_eq!(
            BlockKind::from_class("docx-synced_source-block"),
            BlockKind::CanvasEmbed
        );
        assert_eq!(BlockKind::from_class("docx-table-block"), BlockKind::Unknown);
    }

    #[test]
    fn classification_matches_substrings() {
        assert_eq!(
            BlockKind::from_class("block docx-text-block selected"),
            BlockKind::Paragraph
        );
    }

    #[test]
    fn canvas_flag() {
        assert!(BlockKind::CanvasEmbed.is_canvas());
        assert!(!BlockKind::Paragraph.is_canvas());
    }
}
