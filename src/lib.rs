//! # outline2md
//!
//! Extract virtualised web outline documents to Markdown over WebDriver.
//!
//! ## Why this crate?
//!
//! Outline renderers virtualise aggressively: only the blocks near the
//! viewport exist in the DOM, and saving the page or running a one-shot
//! scraper yields a fraction of the document. This crate scrolls the
//! document the way a reader would, scanning the block list after every
//! gesture and converting each block exactly once, until repeated passes
//! stop turning up anything new. Headings, nested lists, inline formatting,
//! and whiteboard canvases all survive the trip.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Scan     discover blocks, read identities, classify
//!  ├─ 2. Convert  per-kind Markdown fragments, recursing into lists
//!  ├─ 3. Capture  canvas → PNG, deduplicated per identity
//!  ├─ 4. Write    depth-indented append to the output file
//!  └─ 5. Scroll   bounded gesture + settle, repeat until stalled
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outline2md::{extract, ExtractConfig, WebDriverDom};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dom = WebDriverDom::connect("http://localhost:9515", false).await?;
//!     dom.open("https://example.com/docx/abc123").await?;
//!
//!     let config = ExtractConfig::builder().output_path("doc.md").build()?;
//!     let output = extract(&dom, &config).await?;
//!     eprintln!("{} blocks in {} passes", output.stats.blocks_converted, output.stats.passes);
//!
//!     dom.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `outline2md` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! outline2md = { version = "0.3", default-features = false }
//! ```
//!
//! ## Bring your own provider
//!
//! The engine is generic over [`DomCapability`]; [`WebDriverDom`] is the
//! production implementation, and the integration tests drive the same
//! engine with an in-memory scripted provider.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod webdriver;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractConfig, ExtractConfigBuilder};
pub use dom::{DomCapability, DomError, ScriptArg};
pub use error::ExtractError;
pub use extract::{extract, extract_with_writer};
pub use output::{ExtractOutput, ExtractStats};
pub use progress::{ExtractProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{AppearRegistry, ImageRegistry};
pub use webdriver::WebDriverDom;
