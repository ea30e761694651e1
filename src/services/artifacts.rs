//! Rendered artifact stores
//!
//! A handle stays valid until released. The session releases the previous
//! PDF before adopting a new one, so at most one artifact per session is
//! live at a time.

use super::ArtifactStore;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Reference to a published PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub id: Uuid,
    /// Size in bytes
    pub size: usize,
    /// On-disk location, for stores that write files
    pub path: Option<PathBuf>,
}

/// Keeps artifacts in memory, keyed by handle id
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    live: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts not yet released
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Bytes behind a handle, if still live
    pub fn bytes(&self, handle: &ArtifactHandle) -> Option<Vec<u8>> {
        self.live.lock().get(&handle.id).cloned()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn publish(&self, pdf: Vec<u8>) -> Result<ArtifactHandle> {
        let handle = ArtifactHandle {
            id: Uuid::new_v4(),
            size: pdf.len(),
            path: None,
        };
        self.live.lock().insert(handle.id, pdf);
        Ok(handle)
    }

    fn release(&self, handle: &ArtifactHandle) -> Result<()> {
        self.live.lock().remove(&handle.id);
        Ok(())
    }
}

/// Writes each artifact to `<dir>/<id>.pdf` and deletes it on release
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    /// Use `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for DirArtifactStore {
    fn publish(&self, pdf: Vec<u8>) -> Result<ArtifactHandle> {
        let id = Uuid::new_v4();
        let path = self.dir.join(format!("{}.pdf", id));
        std::fs::write(&path, &pdf)?;
        debug!("Wrote artifact {} ({} bytes)", path.display(), pdf.len());

        Ok(ArtifactHandle {
            id,
            size: pdf.len(),
            path: Some(path),
        })
    }

    fn release(&self, handle: &ArtifactHandle) -> Result<()> {
        let Some(path) = &handle.path else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
