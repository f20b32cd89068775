//! Inline rich-text formatting.
//!
//! A text line is a `.ace-line` container whose direct span children are the
//! rich-text runs. Each run is classified into exactly one style variant, in
//! a fixed priority order (mention beats link beats inline code beats bold),
//! then rendered to Markdown. Classification is DOM-bound; rendering is pure
//! so it can be tested without a provider.

use crate::dom::{selectors, DomCapability, DomError};
use tracing::trace;

/// Emitted when a block that should carry a text line has none.
pub const LINE_FALLBACK: &str = "not line text";

/// Style of a single rich-text run. A run has exactly one style; styled runs
/// never also carry bold markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStyle {
    Plain,
    InlineCode,
    Link { href: String },
    /// Cross-document mention, rendered as a link with the mention alias.
    Mention { href: String },
}

/// One contiguous run of identically-styled text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichRun {
    pub text: String,
    pub bold: bool,
    pub style: RunStyle,
}

/// Render classified runs to a Markdown line (no trailing newline).
pub fn render_runs(runs: &[RichRun]) -> String {
    let mut out = String::new();
    for run in runs {
        match &run.style {
            RunStyle::Mention { href } | RunStyle::Link { href } => {
                out.push('[');
                out.push_str(&run.text);
                out.push_str("](");
                out.push_str(href);
                out.push(')');
            }
            RunStyle::InlineCode => {
                out.push('`');
                out.push_str(&run.text);
                out.push('`');
            }
            RunStyle::Plain => {
                if run.bold {
                    out.push_str("**");
                    out.push_str(&run.text);
                    out.push_str("**");
                } else {
                    out.push_str(&run.text);
                }
            }
        }
    }
    out
}

/// Whether a computed `font-weight` value means bold.
pub fn is_bold_weight(weight: &str) -> bool {
    let w = weight.trim();
    w == "bold" || w.parse::<u32>().map(|n| n >= 600).unwrap_or(false)
}

/// Classify one span into a [`RichRun`].
///
/// Priority: mention, then hyperlink, then inline code, then plain with bold
/// from the computed font weight. The first matching inner element wins.
pub async fn classify_span<D: DomCapability>(
    dom: &D,
    span: &D::Node,
) -> Result<RichRun, DomError> {
    if let Some(mention) = dom.query_one(selectors::MENTION, Some(span)).await? {
        let text = dom.text(&mention).await?;
        let href = dom
            .attribute(&mention, "href")
            .await?
            .unwrap_or_default();
        return Ok(RichRun {
            text,
            bold: false,
            style: RunStyle::Mention { href },
        });
    }

    if let Some(link) = dom.query_one(selectors::LINK, Some(span)).await? {
        let text = dom.text(&link).await?;
        let href = dom.attribute(&link, "href").await?.unwrap_or_default();
        return Ok(RichRun {
            text,
            bold: false,
            style: RunStyle::Link { href },
        });
    }

    if let Some(code) = dom.query_one(selectors::INLINE_CODE, Some(span)).await? {
        let text = dom.text(&code).await?;
        return Ok(RichRun {
            text,
            bold: false,
            style: RunStyle::InlineCode,
        });
    }

    let text = dom.text(span).await?;
    let weight = dom.computed_style(span, "font-weight").await?;
    Ok(RichRun {
        text,
        bold: is_bold_weight(&weight),
        style: RunStyle::Plain,
    })
}

/// Format the text line within `scope`.
///
/// Returns `Ok(None)` when `scope` has no `.ace-line` container; the caller
/// decides between the [`LINE_FALLBACK`] sentinel and skipping the block.
pub async fn format_line<D: DomCapability>(
    dom: &D,
    scope: &D::Node,
) -> Result<Option<String>, DomError> {
    let line = match dom.query_one(selectors::TEXT_LINE, Some(scope)).await? {
        Some(line) => line,
        None => return Ok(None),
    };

    let spans = dom.query_all(selectors::LINE_SPANS, Some(&line)).await?;
    trace!(spans = spans.len(), "formatting text line");

    let mut runs = Vec::with_capacity(spans.len());
    for span in &spans {
        runs.push(classify_span(dom, span).await?);
    }
    Ok(Some(render_runs(&runs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str, bold: bool) -> RichRun {
        RichRun {
            text: text.to_string(),
            bold,
            style: RunStyle::Plain,
        }
    }

    #[test]
    fn plain_runs_concatenate() {
        let runs = vec![plain("Hello ", false), plain("world", false)];
        assert_eq!(render_runs(&runs), "Hello world");
    }

    #[test]
    fn bold_run_is_wrapped() {
        let runs = vec![plain("a ", false), plain("b", true), plain(" c", false)];
        assert_eq!(render_runs(&runs), "a **b** c");
    }

    #[test]
    fn link_ignores_bold() {
        let runs = vec![RichRun {
            text: "docs".into(),
            bold: true,
            style: RunStyle::Link {
                href: "https://example.com".into(),
            },
        }];
        assert_eq!(render_runs(&runs), "[docs](https://example.com)");
    }

    #[test]
    fn mention_renders_as_link() {
        let runs = vec![RichRun {
            text: "Design Notes".into(),
            bold: false,
            style: RunStyle::Mention {
                href: "https://example.com/doc/42".into(),
            },
        }];
        assert_eq!(render_runs(&runs), "[Design Notes](https://example.com/doc/42)");
    }

    #[test]
    fn inline_code_uses_backticks() {
        let runs = vec![
            plain("run ", false),
            RichRun {
                text: "cargo".into(),
                bold: false,
                style: RunStyle::InlineCode,
            },
        ];
        assert_eq!(render_runs(&runs), "run `cargo`");
    }

    #[test]
    fn font_weight_parsing() {
        assert!(is_bold_weight("bold"));
        assert!(is_bold_weight("600"));
        assert!(is_bold_weight("700"));
        assert!(!is_bold_weight("400"));
        assert!(!is_bold_weight("normal"));
        assert!(!is_bold_weight(""));
    }
}
