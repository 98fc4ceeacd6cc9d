//! Result types returned by the orchestrator.

use crate::error::PageError;
use crate::pipeline::identifier::ContentIdentifier;
use serde::{Deserialize, Serialize};

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct FetchOutput {
    /// Identifier the document was fetched under; names the artifact.
    pub identifier: ContentIdentifier,
    /// The assembled PDF.
    pub pdf: Vec<u8>,
    /// Pages discovered but not present in `pdf`.
    pub failed_pages: usize,
    /// One entry per failed page, ordered by sequence number.
    pub failures: Vec<PageError>,
    pub stats: FetchStats,
}

impl FetchOutput {
    /// File name the document should be saved under.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.identifier)
    }

    /// Split into the `(document, failure_count, identifier)` triple.
    pub fn into_parts(self) -> (Vec<u8>, usize, ContentIdentifier) {
        (self.pdf, self.failed_pages, self.identifier)
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Unique image URLs found directly in the descriptor.
    pub direct_discovered: usize,
    /// Secondary per-page descriptors found in the descriptor.
    pub indirect_discovered: usize,
    /// Slots successfully downloaded across both phases.
    pub slots_materialised: usize,
    /// Pages in the final document.
    pub pages_assembled: usize,
    /// `direct_discovered + indirect_discovered - pages_assembled`.
    pub failed_pages: usize,
    pub descriptor_duration_ms: u64,
    pub direct_duration_ms: u64,
    pub indirect_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl FetchStats {
    /// Total page candidates across both phases.
    pub fn discovered(&self) -> usize {
        self.direct_discovered + self.indirect_discovered
    }
}
