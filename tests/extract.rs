//! End-to-end extraction tests against a scripted in-memory DOM.
//!
//! `FakeDom` models a virtualised renderer: root blocks become visible in
//! batches keyed to how many scroll gestures have happened, nodes can be
//! told to fail reads a number of times, and canvases can be told to start
//! painting only after N scrolls. The delay knobs are all zeroed so the
//! convergence loop runs flat out.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use outline2md::dom::{selectors, DomCapability, DomError, ScriptArg};
use outline2md::{extract_with_writer, ExtractConfig};
use std::collections::HashMap;
use std::sync::Mutex;

// ── Scripted DOM ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeNode {
    attrs: HashMap<&'static str, String>,
    text: String,
    font_weight: String,
    children: HashMap<&'static str, Vec<usize>>,
    /// Canvas child revealed once this many scrolls have happened.
    canvas: Option<(usize, usize)>,
    /// Remaining reads that fail before this node becomes readable.
    fail_reads: u32,
    /// Per-selector counts of child queries that fail before succeeding.
    fail_queries: HashMap<&'static str, u32>,
}

struct State {
    nodes: Vec<FakeNode>,
    /// `schedule[i]` = root indices that become visible after `i` scrolls.
    schedule: Vec<Vec<usize>>,
    scrolls: usize,
}

struct FakeDom {
    state: Mutex<State>,
}

struct DomBuilder {
    nodes: Vec<FakeNode>,
    schedule: Vec<Vec<usize>>,
}

impl DomBuilder {
    fn new() -> Self {
        // Node 0 is the scroll container.
        Self {
            nodes: vec![FakeNode::default()],
            schedule: vec![Vec::new()],
        }
    }

    fn push(&mut self, node: FakeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// A plain styled span holding `text`.
    fn span(&mut self, text: &str, weight: &str) -> usize {
        self.push(FakeNode {
            text: text.to_string(),
            font_weight: weight.to_string(),
            ..FakeNode::default()
        })
    }

    /// A span wrapping an inner element (mention, link, inline code).
    fn styled_span(&mut self, inner_selector: &'static str, text: &str, href: &str) -> usize {
        let mut attrs = HashMap::new();
        if !href.is_empty() {
            attrs.insert("href", href.to_string());
        }
        let inner = self.push(FakeNode {
            text: text.to_string(),
            attrs,
            ..FakeNode::default()
        });
        let mut span = FakeNode::default();
        span.children.insert(inner_selector, vec![inner]);
        self.push(span)
    }

    /// An `.ace-line` with the given spans.
    fn line(&mut self, spans: Vec<usize>) -> usize {
        let mut node = FakeNode::default();
        node.children.insert(selectors::LINE_SPANS, spans);
        self.push(node)
    }

    /// A block with a class, record id, and an optional text line.
    fn block(&mut self, class: &str, id: &str, line: Option<usize>, text: &str) -> usize {
        let mut node = FakeNode {
            text: text.to_string(),
            ..FakeNode::default()
        };
        node.attrs.insert("data-record-id", id.to_string());
        node.attrs.insert("class", class.to_string());
        if let Some(line) = line {
            node.children.insert(selectors::TEXT_LINE, vec![line]);
        }
        self.push(node)
    }

    /// A block whose line is a single plain span.
    fn text_block(&mut self, class: &str, id: &str, text: &str) -> usize {
        let span = self.span(text, "400");
        let line = self.line(vec![span]);
        self.block(class, id, Some(line), text)
    }

    /// Reveal these roots once `after_scrolls` gestures have happened.
    fn reveal(&mut self, after_scrolls: usize, roots: Vec<usize>) {
        while self.schedule.len() <= after_scrolls {
            self.schedule.push(Vec::new());
        }
        self.schedule[after_scrolls].extend(roots);
    }

    fn build(self) -> FakeDom {
        FakeDom {
            state: Mutex::new(State {
                nodes: self.nodes,
                schedule: self.schedule,
                scrolls: 0,
            }),
        }
    }
}

impl FakeDom {
    fn read_check(state: &mut State, node: usize) -> Result<(), DomError> {
        if state.nodes[node].fail_reads > 0 {
            state.nodes[node].fail_reads -= 1;
            return Err(DomError::new("stale element reference"));
        }
        Ok(())
    }
}

#[async_trait]
impl DomCapability for FakeDom {
    type Node = usize;

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&usize>,
    ) -> Result<Vec<usize>, DomError> {
        let mut state = self.state.lock().unwrap();
        match scope {
            None if selector == selectors::ROOT_BLOCKS => {
                let visible = state.scrolls.min(state.schedule.len() - 1);
                Ok(state.schedule[..=visible].iter().flatten().copied().collect())
            }
            None if selector == selectors::SCROLL_CONTAINER => Ok(vec![0]),
            None => Ok(Vec::new()),
            Some(&node) => {
                if let Some(n) = state.nodes[node].fail_queries.get_mut(selector) {
                    if *n > 0 {
                        *n -= 1;
                        return Err(DomError::new("stale element reference"));
                    }
                }
                if selector == selectors::CANVAS {
                    if let Some((canvas, ready_after)) = state.nodes[node].canvas {
                        return Ok(if state.scrolls >= ready_after {
                            vec![canvas]
                        } else {
                            Vec::new()
                        });
                    }
                }
                Ok(state.nodes[node]
                    .children
                    .get(selector)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    async fn query_one(
        &self,
        selector: &str,
        scope: Option<&usize>,
    ) -> Result<Option<usize>, DomError> {
        Ok(self.query_all(selector, scope).await?.into_iter().next())
    }

    async fn attribute(&self, node: &usize, name: &str) -> Result<Option<String>, DomError> {
        let state = self.state.lock().unwrap();
        Ok(state.nodes[*node].attrs.get(name).cloned())
    }

    async fn text(&self, node: &usize) -> Result<String, DomError> {
        let mut state = self.state.lock().unwrap();
        Self::read_check(&mut state, *node)?;
        Ok(state.nodes[*node].text.clone())
    }

    async fn computed_style(&self, node: &usize, property: &str) -> Result<String, DomError> {
        let state = self.state.lock().unwrap();
        if property == "font-weight" {
            let w = &state.nodes[*node].font_weight;
            return Ok(if w.is_empty() { "400".into() } else { w.clone() });
        }
        Ok(String::new())
    }

    async fn evaluate(
        &self,
        script: &str,
        args: Vec<ScriptArg<usize>>,
    ) -> Result<serde_json::Value, DomError> {
        if script != selectors::CANVAS_TO_PNG {
            return Err(DomError::new(format!("unexpected script: {script}")));
        }
        let node = match args.into_iter().next() {
            Some(ScriptArg::Node(node)) => node,
            _ => return Err(DomError::new("expected a node argument")),
        };
        let state = self.state.lock().unwrap();
        match state.nodes[node].attrs.get("payload") {
            Some(payload) => Ok(serde_json::Value::String(payload.clone())),
            None => Err(DomError::new("node is not a canvas")),
        }
    }

    async fn scroll_by(&self, _origin: &usize, _dx: i64, _dy: i64) -> Result<(), DomError> {
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn fast_config() -> outline2md::config::ExtractConfigBuilder {
    ExtractConfig::builder()
        .initial_wait_ms(0)
        .settle_delay_ms(0)
        .stall_threshold(2)
}

async fn run(dom: &FakeDom, config: &ExtractConfig) -> (outline2md::ExtractOutput, String) {
    let (output, sink) = extract_with_writer(dom, config, Vec::new())
        .await
        .expect("extraction failed");
    (output, String::from_utf8(sink).expect("output was not UTF-8"))
}

fn tiny_png_base64() -> String {
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([12, 34, 56, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    STANDARD.encode(buf)
}

fn canvas_block(b: &mut DomBuilder, id: &str, ready_after: usize, payload: &str) -> usize {
    let mut canvas = FakeNode::default();
    canvas.attrs.insert("payload", payload.to_string());
    let canvas = b.push(canvas);
    let block = b.block("block docx-whiteboard-block", id, None, "");
    b.nodes[block].canvas = Some((canvas, ready_after));
    block
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn heading_and_paragraph_render_exactly() {
    let mut b = DomBuilder::new();
    let h = b.text_block("block docx-heading1-block", "h1", "Intro");
    let p = b.text_block("block docx-text-block", "p1", "Hello world");
    b.reveal(0, vec![h, p]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md, "# Intro\n\nHello world\n\n");
    assert_eq!(output.stats.blocks_converted, 2);
}

#[tokio::test]
async fn blocks_are_emitted_once_across_passes() {
    let mut b = DomBuilder::new();
    let p = b.text_block("block docx-text-block", "p1", "once");
    b.reveal(0, vec![p]);
    let dom = b.build();

    let config = fast_config().stall_threshold(4).build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md.matches("once").count(), 1);
    assert_eq!(output.stats.blocks_converted, 1);
    assert!(output.stats.passes > 4, "loop must outlive the stall window");
}

/// An ordered item "1. Fruit" with one nested child item "1. Apple".
fn nested_fruit_list(b: &mut DomBuilder) -> usize {
    let child_span = b.span("1. Apple", "400");
    let child_line = b.line(vec![child_span]);
    let child_head = {
        let mut n = FakeNode::default();
        n.children.insert(selectors::TEXT_LINE, vec![child_line]);
        b.push(n)
    };
    let child = b.block("block docx-ordered-block", "li2", None, "");
    b.nodes[child]
        .children
        .insert(selectors::LIST_HEAD, vec![child_head]);

    let parent_span = b.span("1. Fruit", "400");
    let parent_line = b.line(vec![parent_span]);
    let parent_head = {
        let mut n = FakeNode::default();
        n.children.insert(selectors::TEXT_LINE, vec![parent_line]);
        b.push(n)
    };
    let children_container = {
        let mut n = FakeNode::default();
        n.children.insert(selectors::CHILD_BLOCKS, vec![child]);
        b.push(n)
    };
    let parent = b.block("block docx-ordered-block", "li1", None, "");
    b.nodes[parent]
        .children
        .insert(selectors::LIST_HEAD, vec![parent_head]);
    b.nodes[parent]
        .children
        .insert(selectors::LIST_CHILDREN, vec![children_container]);
    parent
}

#[tokio::test]
async fn nested_list_children_are_indented_one_level_deeper() {
    let mut b = DomBuilder::new();
    let parent = nested_fruit_list(&mut b);
    b.reveal(0, vec![parent]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md, "1. Fruit\n\n   1. Apple\n\n");
    // Parent and child both admitted.
    assert_eq!(output.stats.blocks_converted, 2);
}

#[tokio::test]
async fn inline_styles_follow_priority_order() {
    let mut b = DomBuilder::new();
    let mention = b.styled_span(selectors::MENTION, "Design Notes", "https://example.com/doc/42");
    let sep = b.span(" and ", "400");
    let bold = b.span("loud", "700");
    let code = b.styled_span(selectors::INLINE_CODE, "cargo", "");
    let line = b.line(vec![mention, sep, bold, code]);
    let p = b.block("block docx-text-block", "p1", Some(line), "");
    b.reveal(0, vec![p]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (_, md) = run(&dom, &config).await;

    assert_eq!(
        md,
        "[Design Notes](https://example.com/doc/42) and **loud**`cargo`\n\n"
    );
}

#[tokio::test]
async fn missing_text_line_falls_back_to_sentinel() {
    let mut b = DomBuilder::new();
    let p = b.block("block docx-text-block", "p1", None, "");
    b.reveal(0, vec![p]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (_, md) = run(&dom, &config).await;

    assert_eq!(md, "not line text\n\n");
}

#[tokio::test]
async fn unknown_class_emits_diagnostic_fragment() {
    let mut b = DomBuilder::new();
    let t = b.block("block docx-table-block", "t1", None, "cells");
    b.reveal(0, vec![t]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md, "block docx-table-block:cells\n\n");
    assert_eq!(output.stats.unknown_blocks, 1);
}

#[tokio::test]
async fn convergence_follows_stall_threshold() {
    let mut b = DomBuilder::new();
    let first: Vec<usize> = (0..5)
        .map(|i| b.text_block("block docx-text-block", &format!("a{i}"), "early"))
        .collect();
    let second: Vec<usize> = (0..3)
        .map(|i| b.text_block("block docx-text-block", &format!("b{i}"), "late"))
        .collect();
    b.reveal(0, first);
    b.reveal(1, second);
    let dom = b.build();

    let config = fast_config().stall_threshold(5).build().unwrap();
    let (output, _) = run(&dom, &config).await;

    // Pass 1 admits 5, pass 2 admits 3, then six empty passes exhaust the
    // stall counter.
    assert_eq!(output.stats.passes, 8);
    assert_eq!(output.stats.blocks_converted, 8);
}

#[tokio::test]
async fn transient_read_failure_defers_block_to_next_pass() {
    let mut b = DomBuilder::new();
    let todo = b.block("block docx-todo-block", "td1", None, "ship it");
    b.nodes[todo].fail_reads = 1;
    b.reveal(0, vec![todo]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md, "- ship it\n\n");
    assert_eq!(output.stats.blocks_converted, 1);
}

#[tokio::test]
async fn canvas_is_captured_once_across_passes() {
    let images = tempfile::tempdir().unwrap();
    let payload = tiny_png_base64();

    let mut b = DomBuilder::new();
    let c = canvas_block(&mut b, "c1", 0, &payload);
    b.reveal(0, vec![c]);
    let dom = b.build();

    let config = fast_config()
        .stall_threshold(3)
        .image_dir(images.path())
        .build()
        .unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md.matches("![canvas](").count(), 1);
    assert_eq!(output.stats.images_captured, 1);
    assert_eq!(output.images.len(), 1);
    let file = images.path().join("canvas-c1.png");
    assert!(file.exists(), "png must be persisted");
    assert_eq!(output.images[0], file);
    // The persisted bytes decode back to an image.
    image::load_from_memory(&std::fs::read(&file).unwrap()).unwrap();
}

#[tokio::test]
async fn canvas_retries_until_renderer_paints_it() {
    let images = tempfile::tempdir().unwrap();
    let payload = tiny_png_base64();

    let mut b = DomBuilder::new();
    let c = canvas_block(&mut b, "c1", 2, &payload);
    b.reveal(0, vec![c]);
    let dom = b.build();

    let config = fast_config()
        .stall_threshold(4)
        .image_dir(images.path())
        .build()
        .unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(output.stats.images_captured, 1);
    assert_eq!(output.stats.canvases_abandoned, 0);
    assert_eq!(md.matches("![canvas](").count(), 1);
    assert!(images.path().join("canvas-c1.png").exists());
}

#[tokio::test]
async fn unpaintable_canvas_is_abandoned_after_attempt_limit() {
    let images = tempfile::tempdir().unwrap();
    let payload = tiny_png_base64();

    let mut b = DomBuilder::new();
    let c = canvas_block(&mut b, "c1", usize::MAX, &payload);
    b.reveal(0, vec![c]);
    let dom = b.build();

    let config = fast_config()
        .stall_threshold(2)
        .max_canvas_attempts(Some(2))
        .image_dir(images.path())
        .build()
        .unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(output.stats.images_captured, 0);
    assert_eq!(output.stats.canvases_abandoned, 1);
    assert!(!md.contains("![canvas]("));
    assert!(!images.path().join("canvas-c1.png").exists());
}

#[tokio::test]
async fn garbage_canvas_payload_is_not_persisted() {
    let images = tempfile::tempdir().unwrap();

    let mut b = DomBuilder::new();
    let c = canvas_block(&mut b, "c1", 0, &STANDARD.encode(b"not a png"));
    b.reveal(0, vec![c]);
    let dom = b.build();

    let config = fast_config()
        .max_canvas_attempts(Some(3))
        .image_dir(images.path())
        .build()
        .unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(output.stats.images_captured, 0);
    assert_eq!(output.stats.canvases_abandoned, 1);
    assert!(!md.contains("![canvas]("));
    assert!(!images.path().join("canvas-c1.png").exists());
}

#[tokio::test]
async fn code_block_keeps_raw_text_fenced() {
    let mut b = DomBuilder::new();
    let c = b.block(
        "block docx-code-block",
        "cd1",
        None,
        "fn main() {\n    println!(\"hi\");\n}",
    );
    b.reveal(0, vec![c]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (_, md) = run(&dom, &config).await;

    assert_eq!(md, "```\nfn main() {\n    println!(\"hi\");\n}\n```\n\n");
}

#[tokio::test]
async fn failed_child_scan_does_not_duplicate_list_head() {
    let mut b = DomBuilder::new();
    let parent = nested_fruit_list(&mut b);
    // The children lookup goes stale once; the whole item must be retried
    // without the head line landing in the output twice.
    b.nodes[parent]
        .fail_queries
        .insert(selectors::LIST_CHILDREN, 1);
    b.reveal(0, vec![parent]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (output, md) = run(&dom, &config).await;

    assert_eq!(md, "1. Fruit\n\n   1. Apple\n\n");
    assert_eq!(md.matches("1. Fruit").count(), 1);
    assert_eq!(output.stats.blocks_converted, 2);
}

#[tokio::test]
async fn extraction_can_run_on_a_spawned_task() {
    let mut b = DomBuilder::new();
    let p = b.text_block("block docx-text-block", "p1", "hi");
    b.reveal(0, vec![p]);
    let dom = std::sync::Arc::new(b.build());

    // tokio::spawn demands a Send future, which in turn demands the session
    // state be shareable across await points.
    let handle = tokio::spawn(async move {
        let config = fast_config().build().unwrap();
        extract_with_writer(&*dom, &config, Vec::new())
            .await
            .expect("extraction failed")
    });
    let (output, sink) = handle.await.unwrap();

    assert_eq!(String::from_utf8(sink).unwrap(), "hi\n\n");
    assert_eq!(output.stats.blocks_converted, 1);
}

#[tokio::test]
async fn unordered_item_folds_bullet_line_into_text() {
    let mut b = DomBuilder::new();
    let u = b.block("block docx-unordered-block", "u1", None, "•\nbanana");
    b.reveal(0, vec![u]);
    let dom = b.build();

    let config = fast_config().build().unwrap();
    let (_, md) = run(&dom, &config).await;

    assert_eq!(md, "• banana\n\n");
}
