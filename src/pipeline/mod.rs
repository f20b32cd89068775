//! Pipeline stages for outline-to-Markdown extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different capability provider) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! scan ──▶ block ──▶ inline / media ──▶ writer
//! (discover) (dispatch)  (runs / canvas)  (indent + append)
//! ```
//!
//! 1. [`scan`]   — discover blocks under a scope, read identities, classify
//! 2. [`block`]  — per-kind fragment conversion, recursing into list children
//! 3. [`inline`] — rich-text runs within a text line
//! 4. [`media`]  — canvas export, validation, persistence, dedup
//! 5. [`writer`] — depth indentation and the append-only output sink
//!
//! The pass loop driving these lives in [`crate::extract`].

pub(crate) mod block;
pub mod inline;
pub(crate) mod media;
pub mod scan;
pub mod writer;
