//! Error types for the embed2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Embed2PdfError`] is **fatal**: the document cannot be produced at all
//!   (unusable reference, descriptor endpoint unreachable, no page survived).
//!   Returned as `Err(Embed2PdfError)` from the top-level `fetch*` functions.
//!
//! * [`PageError`] is **non-fatal**: a single page candidate could not be
//!   materialised (image 404, timeout, descriptor without a usable image),
//!   but its siblings are fine. Collected into
//!   [`crate::output::FetchOutput::failures`] and summarised as
//!   `failed_pages`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the embed2pdf library.
///
/// Per-page failures use [`PageError`] and never propagate here.
#[derive(Debug, Error)]
pub enum Embed2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The reference does not contain a usable identifier segment.
    #[error("Invalid reference '{reference}': expected a link like https://host/embeds/<id>/content")]
    InvalidReference { reference: String },

    // ── Descriptor errors ─────────────────────────────────────────────────
    /// The descriptor endpoint was unreachable or answered with a non-success status.
    #[error("Failed to fetch descriptor '{url}': {reason}\nCheck the link and your internet connection.")]
    DescriptorFetchFailed { url: String, reason: String },

    /// The descriptor request exceeded the configured timeout.
    #[error("Descriptor request timed out after {secs}s for '{url}'\nIncrease --timeout.")]
    DescriptorTimeout { url: String, secs: u64 },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Not a single page image survived download and decoding.
    #[error("No images found for '{identifier}': {discovered} discovered, none usable")]
    NoPagesRecovered {
        identifier: String,
        discovered: usize,
    },

    /// Writing the PDF stream failed.
    #[error("Failed to encode PDF: {0}")]
    EncodeFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the scratch area.
    #[error("Scratch area error at '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page candidate.
///
/// `seq` is the sequence number the page would have occupied.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Transport-level failure (DNS, connection reset, TLS, body read).
    #[error("Page {seq}: fetching '{url}' failed: {detail}")]
    FetchFailed {
        seq: u32,
        url: String,
        detail: String,
    },

    /// The request exceeded the per-request timeout.
    #[error("Page {seq}: '{url}' timed out after {secs}s")]
    Timeout { seq: u32, url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("Page {seq}: '{url}' returned HTTP {status}")]
    HttpStatus { seq: u32, url: String, status: u16 },

    /// The server answered successfully but sent nothing.
    #[error("Page {seq}: '{url}' returned an empty body")]
    EmptyBody { seq: u32, url: String },

    /// A page descriptor did not contain the JSONP wrapper.
    #[error("Page {seq}: no embedded fragment in descriptor '{url}'")]
    WrapperNotFound { seq: u32, url: String },

    /// The unescaped fragment carried no `orig="..."` image attribute.
    #[error("Page {seq}: no full-resolution image in descriptor '{url}'")]
    OriginalNotFound { seq: u32, url: String },

    /// The downloaded bytes are not a decodable image.
    #[error("Page {seq}: slot '{name}' is not a decodable image: {detail}")]
    DecodeFailed {
        seq: u32,
        name: String,
        detail: String,
    },
}

impl PageError {
    /// Sequence number of the page this error belongs to.
    pub fn seq(&self) -> u32 {
        match self {
            PageError::FetchFailed { seq, .. }
            | PageError::Timeout { seq, .. }
            | PageError::HttpStatus { seq, .. }
            | PageError::EmptyBody { seq, .. }
            | PageError::WrapperNotFound { seq, .. }
            | PageError::OriginalNotFound { seq, .. }
            | PageError::DecodeFailed { seq, .. } => *seq,
        }
    }
}
