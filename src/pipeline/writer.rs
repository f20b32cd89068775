//! Append-only Markdown sink with depth indentation.
//!
//! Every fragment the converters produce goes through [`MarkupWriter::append`]
//! with the nesting depth it was produced at. The writer owns the two
//! formatting rules that depend on depth and position:
//!
//! - each non-empty line of the fragment is prefixed with three spaces per
//!   depth level;
//! - a fragment ending in a space has that space replaced with a newline, so
//!   a following sibling starts on its own line.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Spaces per nesting level.
const INDENT_WIDTH: usize = 3;

/// Indent prefix for a nesting depth.
pub fn indent(depth: usize) -> String {
    " ".repeat(INDENT_WIDTH * depth)
}

/// Apply depth indentation to every non-empty line of a fragment.
///
/// Empty lines (blank separators inside the fragment) stay empty so the
/// output has no trailing-whitespace lines. The fragment's trailing newlines
/// are preserved.
pub fn indent_fragment(fragment: &str, depth: usize) -> String {
    if depth == 0 {
        return normalize_tail(fragment.to_string());
    }
    let prefix = indent(depth);
    let mut out = String::with_capacity(fragment.len() + prefix.len() * 4);
    for (i, line) in fragment.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !line.is_empty() {
            out.push_str(&prefix);
            out.push_str(line);
        }
    }
    normalize_tail(out)
}

/// Replace a single trailing space with a newline.
fn normalize_tail(mut s: String) -> String {
    if s.ends_with(' ') {
        s.pop();
        s.push('\n');
    }
    s
}

/// Buffered append-only writer over any async byte sink.
pub struct MarkupWriter<W> {
    sink: W,
    fragments: u64,
    bytes: u64,
}

impl<W: AsyncWrite + Unpin + Send + Sync> MarkupWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            fragments: 0,
            bytes: 0,
        }
    }

    /// Append one fragment at the given depth.
    pub async fn append(&mut self, fragment: &str, depth: usize) -> io::Result<()> {
        let rendered = indent_fragment(fragment, depth);
        self.sink.write_all(rendered.as_bytes()).await?;
        self.fragments += 1;
        self.bytes += rendered.len() as u64;
        Ok(())
    }

    /// Flush and return the sink plus (fragments, bytes) written.
    pub async fn finish(mut self) -> io::Result<(W, u64, u64)> {
        self.sink.flush().await?;
        Ok((self.sink, self.fragments, self.bytes))
    }
}
