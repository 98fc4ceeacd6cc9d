//! Scratch area: where downloaded page slots wait for assembly.
//!
//! Slots are inserted only at a phase's fan-in, after every worker of that
//! phase has joined, so there is a single writer and no locking. By default
//! slots live in memory. With [`crate::config::FetchConfig::scratch_dir`] set
//! they are spilled to a `downloaded_images_<id>*` directory instead; that
//! directory is a [`TempDir`], so it disappears when the area is consumed by
//! [`ScratchArea::into_slots`] or dropped on an error path.

use crate::error::Embed2PdfError;
use crate::pipeline::assemble::embedded_number;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// One downloaded page candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    /// Position hint; pages are ordered by the number embedded in `name`.
    pub seq: u32,
    /// `image_<seq>.<ext>`, where `ext` reflects the sniffed content.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageSlot {
    /// Name a freshly downloaded slot after its sequence number and content.
    pub fn new(seq: u32, url: &str, bytes: Vec<u8>) -> Self {
        let ext = slot_extension(&bytes, url);
        Self {
            seq,
            name: format!("image_{seq}.{ext}"),
            bytes,
        }
    }
}

/// Extension for a slot: sniffed image format first, then the URL's own
/// extension, then `bin` (which the assembler will not accept).
fn slot_extension(bytes: &[u8], url: &str) -> String {
    if let Some(ext) = image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first())
    {
        return (*ext).to_string();
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('/')
        .map_or(path, |(_, last)| last)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string())
}

enum SlotStore {
    Memory(BTreeMap<String, ImageSlot>),
    Disk(TempDir),
}

/// Transient slot store for one run.
pub struct ScratchArea {
    store: SlotStore,
    len: usize,
}

impl ScratchArea {
    /// In-memory scratch area.
    pub fn in_memory() -> Self {
        Self {
            store: SlotStore::Memory(BTreeMap::new()),
            len: 0,
        }
    }

    /// Disk-backed scratch area in a fresh directory under `root`.
    pub fn on_disk(identifier: &str, root: &Path) -> Result<Self, Embed2PdfError> {
        std::fs::create_dir_all(root).map_err(|e| Embed2PdfError::Scratch {
            path: root.to_path_buf(),
            source: e,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("downloaded_images_{identifier}_"))
            .tempdir_in(root)
            .map_err(|e| Embed2PdfError::Scratch {
                path: root.to_path_buf(),
                source: e,
            })?;
        debug!("Scratch area for {} at {}", identifier, dir.path().display());

        Ok(Self {
            store: SlotStore::Disk(dir),
            len: 0,
        })
    }

    /// Pick the backing store from an optional root directory.
    pub fn create(identifier: &str, root: Option<&Path>) -> Result<Self, Embed2PdfError> {
        match root {
            Some(root) => Self::on_disk(identifier, root),
            None => Ok(Self::in_memory()),
        }
    }

    /// Directory backing this area, if disk-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.store {
            SlotStore::Memory(_) => None,
            SlotStore::Disk(dir) => Some(dir.path()),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a slot. Each slot name is written at most once per run.
    pub async fn insert(&mut self, slot: ImageSlot) -> Result<(), Embed2PdfError> {
        match &mut self.store {
            SlotStore::Memory(map) => {
                map.insert(slot.name.clone(), slot);
            }
            SlotStore::Disk(dir) => {
                let path = dir.path().join(&slot.name);
                tokio::fs::write(&path, &slot.bytes)
                    .await
                    .map_err(|e| Embed2PdfError::Scratch { path, source: e })?;
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Consume the area, returning every stored slot in name order.
    ///
    /// A disk-backed area's directory is removed before this returns.
    pub async fn into_slots(self) -> Result<Vec<ImageSlot>, Embed2PdfError> {
        match self.store {
            SlotStore::Memory(map) => Ok(map.into_values().collect()),
            SlotStore::Disk(dir) => {
                let slots = read_slots(dir.path()).await;
                let root = dir.path().to_path_buf();
                dir.close()
                    .map_err(|e| Embed2PdfError::Scratch { path: root, source: e })?;
                slots
            }
        }
    }
}

fn scratch_err(path: PathBuf) -> impl FnOnce(std::io::Error) -> Embed2PdfError {
    move |source| Embed2PdfError::Scratch { path, source }
}

async fn read_slots(dir: &Path) -> Result<Vec<ImageSlot>, Embed2PdfError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(scratch_err(dir.to_path_buf()))?;

    let mut slots = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(scratch_err(dir.to_path_buf()))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = tokio::fs::read(&path).await.map_err(scratch_err(path))?;
        let seq = embedded_number(&name)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        slots.push(ImageSlot { seq, name, bytes });
    }
    slots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(slots)
}
