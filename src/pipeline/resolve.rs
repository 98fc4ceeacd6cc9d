//! Indirect asset resolution: page descriptor → full-resolution image.
//!
//! Each secondary descriptor is a JSONP-style script wrapping one escaped
//! HTML fragment. A task fetches the descriptor, pulls the `orig` image URL
//! out of the fragment (see [`crate::pipeline::scan::original_image_url`]),
//! then downloads that image into a slot. Any miss along the way is one
//! failed page; siblings carry on.

use crate::config::FetchConfig;
use crate::error::PageError;
use crate::pipeline::download::{download_image, report, run_bounded, PhaseOutcome};
use crate::pipeline::fetch::Fetcher;
use crate::pipeline::scan::{original_image_url, FragmentMiss, Task};
use crate::pipeline::scratch::ImageSlot;
use crate::progress::Phase;
use tracing::{debug, info};

/// Resolve one page descriptor and download its image.
pub async fn resolve_page(
    fetcher: &dyn Fetcher,
    seq: u32,
    descriptor_url: &str,
) -> Result<ImageSlot, PageError> {
    let body = fetcher
        .fetch_text(descriptor_url)
        .await
        .map_err(|e| e.into_page_error(seq, descriptor_url))?;

    let image_url = original_image_url(&body).map_err(|miss| {
        let url = descriptor_url.to_string();
        match miss {
            FragmentMiss::Wrapper => PageError::WrapperNotFound { seq, url },
            FragmentMiss::Original => PageError::OriginalNotFound { seq, url },
        }
    })?;
    debug!("Page {}: descriptor → {}", seq, image_url);

    download_image(fetcher, seq, &image_url).await
}

/// The indirect phase: resolve every secondary descriptor.
///
/// `tasks` must already be numbered after the final direct count.
pub async fn download_indirect(
    fetcher: &dyn Fetcher,
    tasks: Vec<Task>,
    config: &FetchConfig,
) -> PhaseOutcome {
    if tasks.is_empty() {
        return PhaseOutcome::default();
    }

    let workers = config.workers_for(tasks.len());
    info!(
        "Resolving {} page descriptors ({} workers)",
        tasks.len(),
        workers
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_start(Phase::Indirect, tasks.len());
    }

    let results = run_bounded(tasks, workers, |seq, url| async move {
        let result = resolve_page(fetcher, seq, &url).await;
        report(config, Phase::Indirect, seq, &result);
        result
    })
    .await;

    PhaseOutcome::from_results(results)
}
