//! Integration tests for the full fetch pipeline.
//!
//! Every test runs against an in-memory [`Fetcher`] serving canned descriptor
//! payloads and generated images, so nothing touches the network.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use embed2pdf::{
    fetch_document_with, write_output, Embed2PdfError, FetchConfig, FetchError,
    FetchProgressCallback, Fetcher, PageError, Phase,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const REFERENCE: &str = "https://www.scribd.com/document/4242/annual-report";
const DESCRIPTOR: &str = "https://www.scribd.com/embeds/4242/content";

/// Serves a fixed URL → response table. Unknown URLs fail like a refused
/// connection; `Err` entries answer with the given HTTP status.
#[derive(Default)]
struct CannedFetcher {
    bodies: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl CannedFetcher {
    fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.into()));
        self
    }

    fn with_status(mut self, url: &str, status: u16) -> Self {
        self.bodies.insert(url.to_string(), Err(status));
        self
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Transport(format!("connection refused: {url}"))),
        }
    }
}

/// A solid-colour PNG whose width encodes its intended page number.
fn page_png(page: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
        10 + page,
        20,
        Rgb([page as u8 * 40, 0, 0]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// A JSONP page descriptor pointing at `image_url`, escaped the way the
/// embed endpoint escapes it.
fn page_descriptor(image_url: &str) -> String {
    let escaped = image_url.replace('/', "\\/");
    format!(
        r#"window.page_callback(["<div class=\"page\"><img class=\"absimg\" orig=\"{escaped}\" style=\"left:0\"\/><\/div>"]);"#
    )
}

/// Three directly linked images (one unreachable) and two descriptors.
fn mixed_payload() -> String {
    r#"<html><script>
        var pages = [
          {thumb: "https://img.example.com/p/1.jpg"},
          {thumb: "https://img.example.com/p/2.png"},
          {thumb: "https://img.example.com/p/1.jpg"},
          {thumb: "https://img.example.com/p/3.jpg"},
        ];
        docManager.addPage({id: 4, contentUrl: "https://html.example.com/pages/4-a.jsonp"});
        docManager.addPage({id: 5, contentUrl: "https://html.example.com/pages/5-b.jsonp"});
    </script></html>"#
        .to_string()
}

fn mixed_fetcher() -> CannedFetcher {
    CannedFetcher::default()
        .with(DESCRIPTOR, mixed_payload())
        .with("https://img.example.com/p/1.jpg", page_png(1))
        .with_status("https://img.example.com/p/2.png", 403)
        .with("https://img.example.com/p/3.jpg", page_png(3))
        .with(
            "https://html.example.com/pages/4-a.jsonp",
            page_descriptor("https://img.example.com/orig/4.png"),
        )
        .with("https://img.example.com/orig/4.png", page_png(4))
        .with(
            "https://html.example.com/pages/5-b.jsonp",
            page_descriptor("https://img.example.com/orig/5.png"),
        )
        .with("https://img.example.com/orig/5.png", page_png(5))
}

/// MediaBox widths of every page, in page order.
fn page_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mixed_document_is_rebuilt_in_page_order() {
    let fetcher = mixed_fetcher();
    let output = fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap();

    assert_eq!(output.identifier.as_str(), "4242");
    assert_eq!(output.file_name(), "4242.pdf");
    assert_eq!(output.stats.direct_discovered, 3);
    assert_eq!(output.stats.indirect_discovered, 2);
    assert_eq!(output.stats.pages_assembled, 4);
    assert_eq!(output.failed_pages, 1);

    // Page 2 failed; the others keep their relative order.
    assert_eq!(page_widths(&output.pdf), vec![11, 13, 14, 15]);

    assert_eq!(output.failures.len(), 1);
    assert!(matches!(
        output.failures[0],
        PageError::HttpStatus { seq: 2, status: 403, .. }
    ));
}

#[tokio::test]
async fn test_duplicate_direct_links_are_fetched_once() {
    let fetcher = mixed_fetcher();
    fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap();

    let requests = fetcher.requests.lock().unwrap();
    let hits = requests
        .iter()
        .filter(|u| u.as_str() == "https://img.example.com/p/1.jpg")
        .count();
    assert_eq!(hits, 1);
}

#[tokio::test]
async fn test_failed_count_matches_discovered_minus_pages() {
    // Descriptor 4 has no wrapper, image 5 is not an image.
    let fetcher = mixed_fetcher()
        .with("https://html.example.com/pages/4-a.jsonp", "<html>moved</html>")
        .with("https://img.example.com/orig/5.png", "<html>denied</html>");

    let output = fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap();

    let stats = &output.stats;
    assert_eq!(stats.pages_assembled, 2);
    assert_eq!(output.failed_pages, stats.discovered() - stats.pages_assembled);
    assert_eq!(output.failed_pages, 3);
    assert_eq!(output.failures.len(), 3);

    let seqs: Vec<u32> = output.failures.iter().map(PageError::seq).collect();
    assert_eq!(seqs, vec![2, 4, 5]);
    assert!(matches!(output.failures[1], PageError::WrapperNotFound { .. }));
    assert!(matches!(output.failures[2], PageError::DecodeFailed { .. }));
}

#[tokio::test]
async fn test_indirect_only_document_numbers_from_one() {
    let payload = r#"contentUrl: "https://html.example.com/pages/a.jsonp"
                     contentUrl: "https://html.example.com/pages/b.jsonp""#;
    let fetcher = CannedFetcher::default()
        .with(DESCRIPTOR, payload)
        .with(
            "https://html.example.com/pages/a.jsonp",
            page_descriptor("https://img.example.com/orig/a.png"),
        )
        .with("https://img.example.com/orig/a.png", page_png(1))
        .with(
            "https://html.example.com/pages/b.jsonp",
            page_descriptor("https://img.example.com/orig/b.png"),
        )
        .with("https://img.example.com/orig/b.png", page_png(2));

    let output = fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap();
    assert_eq!(output.failed_pages, 0);
    assert_eq!(page_widths(&output.pdf), vec![11, 12]);
}

#[tokio::test]
async fn test_repeat_runs_produce_the_same_pages() {
    let config = FetchConfig::builder().concurrency(2).build().unwrap();
    let first = fetch_document_with(&mixed_fetcher(), REFERENCE, &config)
        .await
        .unwrap();
    let second = fetch_document_with(&mixed_fetcher(), REFERENCE, &config)
        .await
        .unwrap();

    assert_eq!(first.stats.pages_assembled, second.stats.pages_assembled);
    assert_eq!(page_widths(&first.pdf), page_widths(&second.pdf));
    assert_eq!(first.failures, second.failures);
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_payload_without_assets_is_no_pages() {
    let fetcher = CannedFetcher::default().with(DESCRIPTOR, "<html>nothing here</html>");
    let err = fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Embed2PdfError::NoPagesRecovered { discovered: 0, .. }
    ));
    assert!(err.to_string().starts_with("No images found"));
}

#[tokio::test]
async fn test_descriptor_status_is_fatal() {
    let fetcher = CannedFetcher::default().with_status(DESCRIPTOR, 404);
    let err = fetch_document_with(&fetcher, REFERENCE, &FetchConfig::default())
        .await
        .unwrap_err();

    match err {
        Embed2PdfError::DescriptorFetchFailed { url, reason } => {
            assert_eq!(url, DESCRIPTOR);
            assert!(reason.contains("404"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_reference_without_identifier_is_rejected() {
    let fetcher = CannedFetcher::default();
    let err = fetch_document_with(&fetcher, "4242", &FetchConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Embed2PdfError::InvalidReference { .. }));
    assert!(fetcher.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_descriptor_template_is_used() {
    let config = FetchConfig::builder()
        .descriptor_url_template("https://mirror.example.com/e/{id}.html")
        .build()
        .unwrap();
    let fetcher = CannedFetcher::default()
        .with("https://mirror.example.com/e/4242.html", mixed_payload())
        .with("https://img.example.com/p/1.jpg", page_png(1));

    let output = fetch_document_with(&fetcher, REFERENCE, &config)
        .await
        .unwrap();
    assert_eq!(output.stats.pages_assembled, 1);
    assert_eq!(output.failed_pages, 4);
}

// ── Scratch cleanup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disk_scratch_is_removed_after_success() {
    let root = tempfile::tempdir().unwrap();
    let config = FetchConfig::builder()
        .scratch_dir(root.path())
        .build()
        .unwrap();

    let output = fetch_document_with(&mixed_fetcher(), REFERENCE, &config)
        .await
        .unwrap();
    assert_eq!(output.stats.slots_materialised, 4);
    assert_eq!(output.stats.pages_assembled, 4);
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_disk_scratch_is_removed_after_fatal_errors() {
    let root = tempfile::tempdir().unwrap();
    let config = FetchConfig::builder()
        .scratch_dir(root.path())
        .build()
        .unwrap();

    let unreachable = CannedFetcher::default().with_status(DESCRIPTOR, 500);
    assert!(fetch_document_with(&unreachable, REFERENCE, &config)
        .await
        .is_err());
    assert!(is_empty_dir(root.path()));

    let empty = CannedFetcher::default().with(DESCRIPTOR, "no assets");
    assert!(fetch_document_with(&empty, REFERENCE, &config)
        .await
        .is_err());
    assert!(is_empty_dir(root.path()));

    let all_broken = CannedFetcher::default()
        .with(DESCRIPTOR, mixed_payload())
        .with("https://img.example.com/p/1.jpg", "not an image");
    assert!(fetch_document_with(&all_broken, REFERENCE, &config)
        .await
        .is_err());
    assert!(is_empty_dir(root.path()));
}

// ── Output + progress ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_write_output_names_file_after_identifier() {
    let out_dir = tempfile::tempdir().unwrap();
    let output = fetch_document_with(&mixed_fetcher(), REFERENCE, &FetchConfig::default())
        .await
        .unwrap();

    let path = write_output(&output, &out_dir.path().join("nested"))
        .await
        .unwrap();

    assert_eq!(path.file_name().unwrap(), "4242.pdf");
    assert_eq!(std::fs::read(&path).unwrap(), output.pdf);
    assert!(!path.with_extension("pdf.tmp").exists());
}

#[derive(Default)]
struct CountingProgress {
    phases: Mutex<Vec<(Phase, usize)>>,
    completed: AtomicUsize,
    errors: AtomicUsize,
    finished: Mutex<Option<(usize, usize)>>,
}

impl FetchProgressCallback for CountingProgress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        self.phases.lock().unwrap().push((phase, total));
    }
    fn on_page_complete(&self, _phase: Phase, _seq: u32) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_error(&self, _phase: Phase, _seq: u32, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_fetch_complete(&self, pages: usize, failed: usize) {
        *self.finished.lock().unwrap() = Some((pages, failed));
    }
}

#[tokio::test]
async fn test_progress_events_follow_both_phases() {
    let progress = Arc::new(CountingProgress::default());
    let config = FetchConfig::builder()
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    fetch_document_with(&mixed_fetcher(), REFERENCE, &config)
        .await
        .unwrap();

    assert_eq!(
        *progress.phases.lock().unwrap(),
        vec![(Phase::Direct, 3), (Phase::Indirect, 2)]
    );
    assert_eq!(progress.completed.load(Ordering::SeqCst), 4);
    assert_eq!(progress.errors.load(Ordering::SeqCst), 1);
    assert_eq!(*progress.finished.lock().unwrap(), Some((4, 1)));
}
