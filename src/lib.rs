//! # embed2pdf
//!
//! Rebuild a paginated PDF from the page images behind a document embed
//! endpoint.
//!
//! Embedded document viewers rarely serve the original file. They serve a
//! descriptor payload listing page images, some linked directly and some
//! behind a per-page JSONP descriptor that points at the full-resolution
//! image. This crate discovers both kinds, downloads them with bounded
//! parallelism, and stitches whatever it recovered into one PDF, one image
//! per page, in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reference URL
//!  │
//!  ├─ 1. Identify  second-to-last path segment
//!  ├─ 2. Describe  GET the descriptor payload (fatal on failure)
//!  ├─ 3. Direct    download every linked .jpg/.png (bounded, non-fatal)
//!  ├─ 4. Indirect  contentUrl → JSONP → orig="…" → image (bounded, non-fatal)
//!  ├─ 5. Assemble  order by embedded number, decode, one page per image
//!  └─ 6. Output    PDF bytes + failed page count + per-phase stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use embed2pdf::{fetch_document, FetchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig::default();
//!     let output = fetch_document("https://www.scribd.com/document/12345/some-title", &config).await?;
//!     std::fs::write(output.file_name(), &output.pdf)?;
//!     eprintln!("{} pages, {} failed", output.stats.pages_assembled, output.failed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `embed2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! embed2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FetchConfig, FetchConfigBuilder, DEFAULT_DESCRIPTOR_URL};
pub use document::{fetch_document, fetch_document_with, fetch_sync, fetch_to_file, run, write_output};
pub use error::{Embed2PdfError, PageError};
pub use output::{FetchOutput, FetchStats};
pub use pipeline::fetch::{FetchError, Fetcher, HttpFetcher};
pub use pipeline::identifier::ContentIdentifier;
pub use progress::{FetchProgressCallback, NoopProgressCallback, Phase, ProgressCallback};
