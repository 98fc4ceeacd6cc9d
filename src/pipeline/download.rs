//! Download executor: bounded-parallelism fan-out shared by both phases.
//!
//! Every task is independent and yields its own
//! `Result<ImageSlot, PageError>`; nothing is shared between workers. The
//! phase joins all tasks before returning, and the caller stores the slots
//! afterwards. Completion order is discarded: the only ordering that survives
//! is the sequence number each slot carries.

use crate::config::FetchConfig;
use crate::error::PageError;
use crate::pipeline::fetch::Fetcher;
use crate::pipeline::scan::Task;
use crate::pipeline::scratch::ImageSlot;
use crate::progress::Phase;
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, info, warn};

/// Joined results of one phase.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    pub slots: Vec<ImageSlot>,
    /// Ordered by sequence number.
    pub failures: Vec<PageError>,
}

impl PhaseOutcome {
    /// Split per-task results into slots and failures.
    pub fn from_results(results: Vec<Result<ImageSlot, PageError>>) -> Self {
        let (mut slots, mut failures) = (Vec::new(), Vec::new());
        for r in results {
            match r {
                Ok(slot) => slots.push(slot),
                Err(e) => failures.push(e),
            }
        }
        slots.sort_by_key(|s| s.seq);
        failures.sort_by_key(PageError::seq);
        Self { slots, failures }
    }

    pub fn attempted(&self) -> usize {
        self.slots.len() + self.failures.len()
    }
}

/// Run `job` over every task with at most `workers` in flight, then join.
pub async fn run_bounded<J, Fut>(
    tasks: Vec<Task>,
    workers: usize,
    job: J,
) -> Vec<Result<ImageSlot, PageError>>
where
    J: Fn(u32, String) -> Fut,
    Fut: Future<Output = Result<ImageSlot, PageError>>,
{
    stream::iter(tasks.into_iter().map(|(seq, url)| job(seq, url)))
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

/// Fetch one image into a slot.
pub async fn download_image(
    fetcher: &dyn Fetcher,
    seq: u32,
    url: &str,
) -> Result<ImageSlot, PageError> {
    let bytes = fetcher
        .fetch(url)
        .await
        .map_err(|e| e.into_page_error(seq, url))?;

    if bytes.is_empty() {
        return Err(PageError::EmptyBody {
            seq,
            url: url.to_string(),
        });
    }

    let slot = ImageSlot::new(seq, url, bytes);
    debug!("Page {}: {} ({} bytes)", seq, slot.name, slot.bytes.len());
    Ok(slot)
}

/// Report a finished task to the log and the progress callback.
pub(crate) fn report(
    config: &FetchConfig,
    phase: Phase,
    seq: u32,
    result: &Result<ImageSlot, PageError>,
) {
    match result {
        Ok(_) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_complete(phase, seq);
            }
        }
        Err(e) => {
            warn!("{} phase: {}", phase, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_error(phase, seq, &e.to_string());
            }
        }
    }
}

/// The direct phase: download every directly linked image.
pub async fn download_direct(
    fetcher: &dyn Fetcher,
    tasks: Vec<Task>,
    config: &FetchConfig,
) -> PhaseOutcome {
    if tasks.is_empty() {
        return PhaseOutcome::default();
    }

    let workers = config.workers_for(tasks.len());
    info!("Downloading {} direct images ({} workers)", tasks.len(), workers);
    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_start(Phase::Direct, tasks.len());
    }

    let results = run_bounded(tasks, workers, |seq, url| async move {
        let result = download_image(fetcher, seq, &url).await;
        report(config, Phase::Direct, seq, &result);
        result
    })
    .await;

    PhaseOutcome::from_results(results)
}
