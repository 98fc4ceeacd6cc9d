//! Progress-callback trait for per-phase and per-page events.
//!
//! Inject an [`Arc<dyn FetchProgressCallback>`] via
//! [`crate::config::FetchConfigBuilder::progress_callback`] to receive
//! events as the pipeline discovers and downloads pages.
//!
//! Pages within a phase download concurrently, so `on_page_complete` and
//! `on_page_error` may be called from several tasks at once and arrive out of
//! sequence order.
//!
//! # Example
//!
//! ```rust
//! use embed2pdf::{FetchConfig, FetchProgressCallback, Phase};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl FetchProgressCallback for Counter {
//!     fn on_page_complete(&self, _phase: Phase, _seq: u32) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = FetchConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One discovery strategy's discover-then-download cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Images linked directly from the descriptor payload.
    Direct,
    /// Images reached through per-page secondary descriptors.
    Indirect,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Direct => f.write_str("direct"),
            Phase::Indirect => f.write_str("indirect"),
        }
    }
}

/// Called by the pipeline as it works through each phase.
///
/// All methods default to no-ops so implementors override only what they
/// need. Implementations must be `Send + Sync`.
pub trait FetchProgressCallback: Send + Sync {
    /// Called once per phase before its downloads start.
    fn on_phase_start(&self, phase: Phase, total: usize) {
        let _ = (phase, total);
    }

    /// Called when a page slot was materialised.
    fn on_page_complete(&self, phase: Phase, seq: u32) {
        let _ = (phase, seq);
    }

    /// Called when a page candidate failed.
    fn on_page_error(&self, phase: Phase, seq: u32, error: &str) {
        let _ = (phase, seq, error);
    }

    /// Called once after the document was assembled.
    fn on_fetch_complete(&self, pages: usize, failed: usize) {
        let _ = (pages, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FetchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FetchConfig`].
pub type ProgressCallback = Arc<dyn FetchProgressCallback>;
