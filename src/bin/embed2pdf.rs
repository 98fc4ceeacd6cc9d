//! CLI binary for embed2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FetchConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use embed2pdf::{
    fetch_document, write_output, FetchConfig, FetchProgressCallback, Phase, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. One bar, re-sized at the start of each phase;
/// pages finish out of order, so error lines carry their sequence number.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_phase_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching descriptor…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, phase: Phase, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(match phase {
            Phase::Direct => "Direct  ",
            Phase::Indirect => "Indirect",
        });
    }
}

impl FetchProgressCallback for CliProgressCallback {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        self.activate_bar(phase, total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{phase} phase: {total} pages…"))
        ));
    }

    fn on_page_complete(&self, _phase: Phase, seq: u32) {
        self.bar.set_message(format!("page {seq}"));
        self.bar.inc(1);
    }

    fn on_page_error(&self, _phase: Phase, seq: u32, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar
            .println(format!("  {} Page {:>3}  {}", red("✗"), seq, red(&msg)));
        self.bar.inc(1);
    }

    fn on_fetch_complete(&self, pages: usize, failed: usize) {
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages recovered",
                green("✔"),
                bold(&pages.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recovered  ({} failed)",
                cyan("⚠"),
                bold(&pages.to_string()),
                pages + failed,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rebuild a document into ./<id>.pdf
  embed2pdf https://www.scribd.com/document/123456789/Some-Title

  # Write into another directory, fewer parallel downloads
  embed2pdf -o out/ --concurrency 4 https://www.scribd.com/document/123456789/Some-Title

  # Keep downloaded pages on disk while running (removed afterwards)
  embed2pdf --scratch-dir /tmp/embed2pdf https://www.scribd.com/document/123456789/x

  # Machine-readable summary
  embed2pdf --json https://www.scribd.com/document/123456789/x > summary.json

ENVIRONMENT VARIABLES:
  EMBED2PDF_OUTPUT          Output directory
  EMBED2PDF_CONCURRENCY     Parallel downloads per phase
  EMBED2PDF_TIMEOUT         Per-request timeout in seconds
  EMBED2PDF_DESCRIPTOR_URL  Descriptor URL template, must contain {id}
  EMBED2PDF_SCRATCH_DIR     Spill downloaded pages to disk under this directory
  RUST_LOG                  Override the log filter
"#;

/// Rebuild a paginated PDF from a document embed endpoint.
#[derive(Parser, Debug)]
#[command(
    name = "embed2pdf",
    version,
    about = "Rebuild a paginated PDF from a document embed endpoint",
    long_about = "Fetch the embed descriptor of a hosted document, download every page image \
(directly linked or behind a per-page descriptor) and assemble them into <id>.pdf, one image \
per page. Pages that cannot be fetched are skipped and counted.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document reference URL; its second-to-last path segment is the identifier.
    reference: String,

    /// Directory to write `<id>.pdf` into.
    #[arg(short, long, env = "EMBED2PDF_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Parallel downloads per phase.
    #[arg(short, long, env = "EMBED2PDF_CONCURRENCY", default_value_t = 8,
          value_parser = clap::value_parser!(u16).range(1..=256))]
    concurrency: u16,

    /// Per-request timeout in seconds.
    #[arg(long, env = "EMBED2PDF_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Descriptor URL template; `{id}` is replaced by the identifier.
    #[arg(long, env = "EMBED2PDF_DESCRIPTOR_URL")]
    descriptor_url: Option<String>,

    /// Keep downloaded pages in a temporary directory under this path.
    #[arg(long, env = "EMBED2PDF_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Print a JSON summary (path, failures, stats) on stdout.
    #[arg(long, env = "EMBED2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EMBED2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EMBED2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EMBED2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn FetchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = fetch_document(&cli.reference, &config)
        .await
        .context("Fetch failed")?;
    let path = write_output(&output, &cli.output)
        .await
        .context("Failed to write document")?;

    if cli.json {
        let summary = serde_json::json!({
            "identifier": output.identifier,
            "path": path,
            "failed_pages": output.failed_pages,
            "failures": output.failures,
            "stats": output.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if output.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.pages_assembled,
            stats.discovered(),
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "{} direct + {} indirect discovered, {} failed",
                stats.direct_discovered, stats.indirect_discovered, output.failed_pages
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `FetchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FetchConfig> {
    let mut builder = FetchConfig::builder()
        .concurrency(usize::from(cli.concurrency))
        .request_timeout_secs(cli.timeout);

    if let Some(ref template) = cli.descriptor_url {
        builder = builder.descriptor_url_template(template.clone());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
