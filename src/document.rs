//! Orchestration: reference in, paginated PDF out.
//!
//! [`fetch_document`] runs the stages in a fixed order:
//!
//! 1. derive the content identifier and open a scratch area
//! 2. fetch the descriptor payload (the only fatal network step)
//! 3. direct phase: scan and download directly linked images
//! 4. indirect phase: resolve secondary descriptors, numbered after the
//!    *final* direct count, so the phases never share a sequence number
//! 5. hand every slot to the assembler
//!
//! The scratch area is owned by this function. It is consumed by the
//! assembler on the success path and dropped on every other path, so it is
//! gone before control returns either way.

use crate::config::FetchConfig;
use crate::error::{Embed2PdfError, PageError};
use crate::output::{FetchOutput, FetchStats};
use crate::pipeline::download::{download_direct, PhaseOutcome};
use crate::pipeline::fetch::{Fetcher, HttpFetcher};
use crate::pipeline::identifier::ContentIdentifier;
use crate::pipeline::resolve::download_indirect;
use crate::pipeline::scratch::ScratchArea;
use crate::pipeline::{assemble, scan};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rebuild the document behind `reference` using the network.
///
/// # Returns
/// `Ok(FetchOutput)` when at least one page was recovered, even if others
/// failed (check `output.failed_pages`).
///
/// # Errors
/// Only fatal conditions:
/// - the reference has no identifier segment
/// - the descriptor endpoint is unreachable, times out, or answers non-2xx
/// - no page survived download and decoding
pub async fn fetch_document(
    reference: impl AsRef<str>,
    config: &FetchConfig,
) -> Result<FetchOutput, Embed2PdfError> {
    let fetcher = HttpFetcher::new(config)?;
    fetch_document_with(&fetcher, reference, config).await
}

/// [`fetch_document`] with a caller-supplied [`Fetcher`].
pub async fn fetch_document_with(
    fetcher: &dyn Fetcher,
    reference: impl AsRef<str>,
    config: &FetchConfig,
) -> Result<FetchOutput, Embed2PdfError> {
    let total_start = Instant::now();
    let reference = reference.as_ref();
    info!("Starting fetch: {}", reference);

    // ── Step 1: Identifier + scratch area ────────────────────────────────
    let identifier = ContentIdentifier::from_reference(reference)?;
    let mut scratch = ScratchArea::create(identifier.as_str(), config.scratch_dir.as_deref())?;

    // ── Step 2: Descriptor payload ───────────────────────────────────────
    let descriptor_start = Instant::now();
    let descriptor_url = config.descriptor_url(identifier.as_str());
    let payload = fetcher
        .fetch_text(&descriptor_url)
        .await
        .map_err(|e| e.into_fatal(&descriptor_url))?;
    let descriptor_duration_ms = descriptor_start.elapsed().as_millis() as u64;
    debug!("Descriptor {}: {} bytes", descriptor_url, payload.len());

    // ── Step 3: Direct phase ─────────────────────────────────────────────
    let direct_start = Instant::now();
    let direct_tasks = scan::direct_tasks(&payload);
    let direct_discovered = direct_tasks.len();
    let direct = download_direct(fetcher, direct_tasks, config).await;
    let direct_duration_ms = direct_start.elapsed().as_millis() as u64;

    // ── Step 4: Indirect phase ───────────────────────────────────────────
    // Offsets are computed only now, after the direct phase has joined.
    let indirect_start = Instant::now();
    let indirect_tasks = scan::indirect_tasks(&payload, direct_discovered);
    let indirect_discovered = indirect_tasks.len();
    let indirect = download_indirect(fetcher, indirect_tasks, config).await;
    let indirect_duration_ms = indirect_start.elapsed().as_millis() as u64;

    info!(
        "Discovered {} direct + {} indirect pages",
        direct_discovered, indirect_discovered
    );

    // ── Step 5: Fan-in ───────────────────────────────────────────────────
    let mut failures: Vec<PageError> = Vec::new();
    for outcome in [direct, indirect] {
        let PhaseOutcome {
            slots,
            failures: phase_failures,
        } = outcome;
        failures.extend(phase_failures);
        for slot in slots {
            scratch.insert(slot).await?;
        }
    }
    let slots_materialised = scratch.len();

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let discovered = direct_discovered + indirect_discovered;
    let assemble_start = Instant::now();
    let slots = scratch.into_slots().await?;
    let assembled = assemble::assemble(
        slots,
        identifier.as_str(),
        discovered,
        config.jpeg_quality,
    )
    .await?;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    failures.extend(assembled.dropped);
    failures.sort_by_key(PageError::seq);

    let failed_pages = discovered.saturating_sub(assembled.pages);
    if failed_pages != failures.len() {
        warn!(
            "Failure tally mismatch: {} missing pages, {} recorded errors",
            failed_pages,
            failures.len()
        );
    }

    let stats = FetchStats {
        direct_discovered,
        indirect_discovered,
        slots_materialised,
        pages_assembled: assembled.pages,
        failed_pages,
        descriptor_duration_ms,
        direct_duration_ms,
        indirect_duration_ms,
        assemble_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Fetch complete: {}/{} pages, {}ms total",
        stats.pages_assembled, discovered, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_complete(stats.pages_assembled, failed_pages);
    }

    Ok(FetchOutput {
        identifier,
        pdf: assembled.pdf,
        failed_pages,
        failures,
        stats,
    })
}

/// Collaborator entry point: `(document_bytes, failure_count, identifier)`
/// with the default configuration.
pub async fn run(
    reference: impl AsRef<str>,
) -> Result<(Vec<u8>, usize, ContentIdentifier), Embed2PdfError> {
    let output = fetch_document(reference, &FetchConfig::default()).await?;
    Ok(output.into_parts())
}

/// Fetch a document and write it to `<output_dir>/<identifier>.pdf`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn fetch_to_file(
    reference: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &FetchConfig,
) -> Result<(PathBuf, FetchStats), Embed2PdfError> {
    let output = fetch_document(reference, config).await?;
    let path = write_output(&output, output_dir.as_ref()).await?;
    Ok((path, output.stats))
}

/// Write an already fetched document to `<output_dir>/<identifier>.pdf`.
pub async fn write_output(
    output: &FetchOutput,
    output_dir: &Path,
) -> Result<PathBuf, Embed2PdfError> {
    let path = output_dir.join(output.file_name());
    let write_err = |source| Embed2PdfError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(write_err)?;

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Synchronous wrapper around [`fetch_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn fetch_sync(
    reference: impl AsRef<str>,
    config: &FetchConfig,
) -> Result<FetchOutput, Embed2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Embed2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(fetch_document(reference, config))
}
