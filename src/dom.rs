//! DOM capability abstraction.
//!
//! The extraction engine never talks to a browser directly. Everything it
//! needs from the rendered page goes through [`DomCapability`]: a small set
//! of read primitives (query, attribute, text, computed style), script
//! evaluation, and one write primitive (a scroll gesture). The production
//! implementation lives in [`crate::webdriver`]; integration tests supply a
//! scripted in-memory provider.
//!
//! Node handles are opaque to the engine. Providers pick whatever handle type
//! is cheap for them to clone — a WebDriver element reference, an index into
//! an in-memory tree — via the associated `Node` type.

use async_trait::async_trait;
use thiserror::Error;

/// A DOM read/write primitive failed.
///
/// The engine treats every `DomError` during a pass as transient: the block
/// is skipped and retried on a later pass. Providers should fold connection
/// and protocol failures into this one type.
#[derive(Debug, Error)]
#[error("dom operation failed: {0}")]
pub struct DomError(pub String);

impl DomError {
    pub fn new(msg: impl Into<String>) -> Self {
        DomError(msg.into())
    }
}

/// Argument passed to [`DomCapability::evaluate`].
pub enum ScriptArg<N> {
    /// A node handle, marshalled as a script element argument.
    Node(N),
    /// A plain JSON value.
    Json(serde_json::Value),
}

/// Read and scroll primitives over a rendered document.
///
/// `scope: None` queries from the document root; `Some(node)` queries within
/// that node's subtree. Selectors are CSS, including `:scope >` child forms.
#[async_trait]
pub trait DomCapability: Send + Sync {
    /// Opaque node handle. Cloning must be cheap; handles may go stale when
    /// the renderer recycles virtualised nodes, in which case reads fail
    /// with [`DomError`].
    type Node: Clone + Send + Sync;

    /// All nodes matching `selector` under `scope`, in document order.
    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Vec<Self::Node>, DomError>;

    /// First node matching `selector` under `scope`, if any.
    async fn query_one(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Option<Self::Node>, DomError>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(&self, node: &Self::Node, name: &str)
        -> Result<Option<String>, DomError>;

    /// Rendered text content of the node's subtree.
    async fn text(&self, node: &Self::Node) -> Result<String, DomError>;

    /// Resolved computed-style property value, e.g. `font-weight`.
    async fn computed_style(
        &self,
        node: &Self::Node,
        property: &str,
    ) -> Result<String, DomError>;

    /// Run a script in the page, returning its JSON result. Node arguments
    /// are available as `arguments[i]` in selector order.
    async fn evaluate(
        &self,
        script: &str,
        args: Vec<ScriptArg<Self::Node>>,
    ) -> Result<serde_json::Value, DomError>;

    /// Dispatch a scroll gesture of (`dx`, `dy`) pixels at `origin`.
    ///
    /// The gesture only has to be dispatched, not completed: the caller
    /// bounds it with a timeout and waits separately for the renderer to
    /// settle.
    async fn scroll_by(&self, origin: &Self::Node, dx: i64, dy: i64) -> Result<(), DomError>;
}

/// CSS selectors and scripts for the outline renderer's DOM shape.
pub mod selectors {
    /// Top-level content blocks of the document.
    pub const ROOT_BLOCKS: &str = ".root-render-unit-container > .render-unit-wrapper > .block";
    /// Scroll container receiving wheel gestures.
    pub const SCROLL_CONTAINER: &str = ".render-unit-wrapper";
    /// Text line container within a block.
    pub const TEXT_LINE: &str = ".ace-line";
    /// Direct span children of a text line (the rich-text runs).
    pub const LINE_SPANS: &str = ":scope > span";
    /// Document-mention element within a run.
    pub const MENTION: &str = ".mention-doc";
    /// Hyperlink element within a run.
    pub const LINK: &str = ".link";
    /// Inline-code element within a run.
    pub const INLINE_CODE: &str = ".inline-code";
    /// Head (own text line) of a list item.
    pub const LIST_HEAD: &str = ".list-wrapper > .list";
    /// Container of a list item's nested children.
    pub const LIST_CHILDREN: &str = ".list-wrapper > .list-children";
    /// Child blocks within a list-children container.
    pub const CHILD_BLOCKS: &str = ":scope > .render-unit-wrapper > .block";
    /// Canvas element within an embed block.
    pub const CANVAS: &str = "canvas";
    /// Attribute carrying a block's stable identity.
    pub const RECORD_ID_ATTR: &str = "data-record-id";
    /// Export a canvas as base64 PNG, with the `data:image/png;base64,`
    /// prefix (22 chars) stripped.
    pub const CANVAS_TO_PNG: &str =
        "return arguments[0].toDataURL('image/png').substring(22);";
}
