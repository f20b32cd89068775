//! CLI binary for outline2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use outline2md::{
    extract, ExtractConfig, ExtractProgressCallback, ProgressCallback, WebDriverDom,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner with running pass/block totals.
/// The document reveals itself as it scrolls, so there is no length to
/// anchor a bar to.
struct CliProgressCallback {
    spinner: ProgressBar,
    images: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        spinner.set_style(style);
        spinner.set_prefix("Extracting");
        spinner.set_message("Waiting for first render…");
        spinner.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            spinner,
            images: AtomicUsize::new(0),
        })
    }
}

impl ExtractProgressCallback for CliProgressCallback {
    fn on_pass(&self, pass: u64, new_blocks: usize, total_blocks: usize) {
        self.spinner.set_message(format!(
            "pass {pass}  +{new_blocks} blocks  ({total_blocks} total)"
        ));
        if new_blocks > 0 {
            self.spinner.println(format!(
                "  {} pass {:>3}  {}",
                green("✓"),
                pass,
                dim(&format!("+{new_blocks} blocks, {total_blocks} total")),
            ));
        }
    }

    fn on_image_captured(&self, id: &str, path: &std::path::Path) {
        self.images.fetch_add(1, Ordering::SeqCst);
        self.spinner.println(format!(
            "  {} canvas {}  →  {}",
            cyan("◆"),
            dim(id),
            path.display()
        ));
    }

    fn on_converged(&self, passes: u64, total_blocks: usize) {
        self.spinner.finish_and_clear();
        eprintln!(
            "{} {} blocks extracted in {} passes ({} images)",
            green("✔"),
            bold(&total_blocks.to_string()),
            passes,
            self.images.load(Ordering::SeqCst),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a document (chromedriver already running on :9515)
  outline2md https://example.feishu.cn/docx/Q3c6dJG5Go3ov6xXofZcGp43nfb

  # Choose the output file and image directory
  outline2md https://example.feishu.cn/docx/abc -o notes.md --images-dir assets

  # Headless session against a remote WebDriver server
  outline2md --webdriver-url http://10.0.0.7:4444 --headless https://… -o doc.md

  # Slow renderer: scroll gently and wait longer between passes
  outline2md --scroll-step 150 --settle-ms 5000 --stall-threshold 8 https://…

  # Machine-readable stats
  outline2md --json https://… -o doc.md > stats.json

SETUP:
  1. Start a WebDriver server:   chromedriver --port=9515
  2. Extract:                    outline2md <document-url> -o out.md

  The browser session is created and torn down by outline2md; only the
  WebDriver server itself must already be running. Documents behind a login
  need a --user-data-dir profile that is already authenticated.

ENVIRONMENT VARIABLES:
  OUTLINE2MD_WEBDRIVER_URL   WebDriver server URL (same as --webdriver-url)
  OUTLINE2MD_OUTPUT          Output path (same as --output)
"#;

/// Extract virtualised web outline documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "outline2md",
    version,
    about = "Extract virtualised web outline documents to Markdown via WebDriver",
    long_about = "Scrolls a lazily-rendered outline document in a real browser session, \
converting each block to Markdown exactly once, until repeated passes stop finding new \
content. Preserves heading structure, nested lists, inline formatting, and whiteboard \
canvases (exported as PNG files).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL of the outline document.
    url: String,

    /// Write Markdown to this file.
    #[arg(short, long, env = "OUTLINE2MD_OUTPUT", default_value = "out.md")]
    output: PathBuf,

    /// Directory for captured canvas images (default: next to the output).
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// WebDriver server URL.
    #[arg(long, env = "OUTLINE2MD_WEBDRIVER_URL", default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Run the browser headless.
    #[arg(long)]
    headless: bool,

    /// Vertical scroll distance per gesture, in pixels.
    #[arg(long, default_value_t = 250)]
    scroll_step: i64,

    /// Wait after each scroll for the renderer to settle, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    settle_ms: u64,

    /// Upper bound on one scroll gesture, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    gesture_timeout_ms: u64,

    /// Consecutive empty passes before declaring the document complete.
    #[arg(long, default_value_t = 5)]
    stall_threshold: u32,

    /// Capture attempts per canvas before giving up (0 = retry forever).
    #[arg(long, default_value_t = 8)]
    max_canvas_attempts: u32,

    /// Wait before the first pass, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    initial_wait_ms: u64,

    /// Print extraction stats as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractProgressCallback>)
    } else {
        None
    };

    let mut builder = ExtractConfig::builder()
        .output_path(&cli.output)
        .scroll_step(cli.scroll_step)
        .settle_delay_ms(cli.settle_ms)
        .gesture_timeout_ms(cli.gesture_timeout_ms)
        .stall_threshold(cli.stall_threshold)
        .initial_wait_ms(cli.initial_wait_ms)
        .max_canvas_attempts(if cli.max_canvas_attempts == 0 {
            None
        } else {
            Some(cli.max_canvas_attempts)
        });
    if let Some(ref dir) = cli.images_dir {
        builder = builder.image_dir(dir);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Connect and extract ──────────────────────────────────────────────
    let dom = WebDriverDom::connect(&cli.webdriver_url, cli.headless)
        .await
        .with_context(|| format!("Failed to connect to WebDriver at {}", cli.webdriver_url))?;
    dom.open(&cli.url)
        .await
        .with_context(|| format!("Failed to open {}", cli.url))?;

    let result = extract(&dom, &config).await;

    // Tear the session down even when extraction failed.
    if let Err(e) = dom.quit().await {
        eprintln!("warning: failed to close browser session: {e}");
    }

    let output = result.context("Extraction failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} blocks  {} passes  {}ms  →  {}",
            green("✔"),
            output.stats.blocks_converted,
            output.stats.passes,
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if output.stats.images_captured > 0 {
            eprintln!(
                "   {} canvas images captured",
                dim(&output.stats.images_captured.to_string())
            );
        }
        if output.stats.canvases_abandoned > 0 {
            eprintln!(
                "   {} canvases never rendered and were skipped",
                output.stats.canvases_abandoned
            );
        }
        if output.stats.unknown_blocks > 0 {
            eprintln!(
                "   {} blocks had unrecognised classes (kept as diagnostics)",
                output.stats.unknown_blocks
            );
        }
    }

    Ok(())
}
