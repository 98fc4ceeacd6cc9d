//! Configuration types for document reconstruction.
//!
//! All pipeline behaviour is controlled through [`FetchConfig`], built via
//! its [`FetchConfigBuilder`]. Keeping every knob in one struct makes it easy
//! to share a config across tasks and to diff two runs.

use crate::error::Embed2PdfError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default descriptor endpoint. `{id}` is replaced by the content identifier.
pub const DEFAULT_DESCRIPTOR_URL: &str = "https://www.scribd.com/embeds/{id}/content";

/// Placeholder substituted in [`FetchConfig::descriptor_url_template`].
pub const ID_PLACEHOLDER: &str = "{id}";

/// Configuration for one reconstruction run.
///
/// # Example
/// ```rust
/// use embed2pdf::FetchConfig;
///
/// let config = FetchConfig::builder()
///     .concurrency(4)
///     .request_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct FetchConfig {
    /// Upper bound on in-flight requests per phase. Default: 8.
    ///
    /// Each phase runs `min(concurrency, tasks)` workers.
    pub concurrency: usize,

    /// Per-request timeout in seconds, applied to every descriptor and image
    /// request. Default: 30.
    pub request_timeout_secs: u64,

    /// Descriptor endpoint with an `{id}` placeholder.
    pub descriptor_url_template: String,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Spill slots to a directory under this root instead of keeping them in
    /// memory. The per-run directory is removed before the run returns.
    pub scratch_dir: Option<PathBuf>,

    /// JPEG quality (1–100) used when embedding pages. Default: 90.
    pub jpeg_quality: u8,

    /// Receives per-phase and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            request_timeout_secs: 30,
            descriptor_url_template: DEFAULT_DESCRIPTOR_URL.to_string(),
            user_agent: concat!("embed2pdf/", env!("CARGO_PKG_VERSION")).to_string(),
            scratch_dir: None,
            jpeg_quality: 90,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("descriptor_url_template", &self.descriptor_url_template)
            .field("user_agent", &self.user_agent)
            .field("scratch_dir", &self.scratch_dir)
            .field("jpeg_quality", &self.jpeg_quality)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn FetchProgressCallback>"),
            )
            .finish()
    }
}

impl FetchConfig {
    /// Create a new builder for `FetchConfig`.
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Descriptor URL for the given identifier.
    pub fn descriptor_url(&self, identifier: &str) -> String {
        self.descriptor_url_template
            .replace(ID_PLACEHOLDER, identifier)
    }

    /// Worker count for a phase with `tasks` tasks. Never zero.
    pub fn workers_for(&self, tasks: usize) -> usize {
        self.concurrency.min(tasks).max(1)
    }
}

/// Builder for [`FetchConfig`].
#[derive(Debug)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn descriptor_url_template(mut self, template: impl Into<String>) -> Self {
        self.config.descriptor_url_template = template.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FetchConfig, Embed2PdfError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Embed2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(Embed2PdfError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if !c.descriptor_url_template.contains(ID_PLACEHOLDER) {
            return Err(Embed2PdfError::InvalidConfig(format!(
                "Descriptor URL template must contain {ID_PLACEHOLDER}, got '{}'",
                c.descriptor_url_template
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = FetchConfig::default();
        assert_eq!(c.concurrency, 8);
        assert_eq!(c.request_timeout_secs, 30);
        assert_eq!(
            c.descriptor_url("4242"),
            "https://www.scribd.com/embeds/4242/content"
        );
    }

    #[test]
    fn workers_are_capped_by_task_count() {
        let c = FetchConfig::default();
        assert_eq!(c.workers_for(3), 3);
        assert_eq!(c.workers_for(50), 8);
        assert_eq!(c.workers_for(0), 1);
    }

    #[test]
    fn build_rejects_zero_concurrency() {
        let err = FetchConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, Embed2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_template_without_placeholder() {
        let err = FetchConfig::builder()
            .descriptor_url_template("https://example.com/content")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("{id}"));
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        let c = FetchConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(c.jpeg_quality, 1);
    }
}
