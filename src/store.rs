//! Single-slot durable photo store.
//!
//! Filesystem layout under the store root:
//!
//! ```text
//! <root>/
//! ├── current-id        # side-channel pointer: id of the active record
//! ├── records.json      # versioned manifest of stored records
//! └── blobs/
//!     └── <id>          # raw encoded image bytes
//! ```
//!
//! The pointer file is deliberately separate from the manifest: `get` on an
//! empty store reads one small file and returns without touching anything
//! else. The manifest carries per-record metadata (`created_at`, SHA-256,
//! length) so a read can detect on-disk corruption instead of handing a
//! damaged blob to the decoder.
//!
//! # Single-slot invariant
//!
//! At most one record is current. `put` drops the superseded record from the
//! manifest and sweeps every blob other than the one it just wrote, so the
//! store never accumulates history. A crash between the blob write and the
//! pointer write strands at most one blob, and the next `put` reclaims it.
//!
//! # Concurrency
//!
//! One logical writer is assumed. There is no cross-process locking; if two
//! writers race, the last pointer write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const POINTER_FILENAME: &str = "current-id";
const MANIFEST_FILENAME: &str = "records.json";
const BLOBS_DIRNAME: &str = "blobs";

/// Version of the records manifest format. Bump to invalidate old stores
/// when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("blob for record {id} does not match its recorded checksum")]
    Corrupt { id: String },
}

/// Metadata for one stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub sha256: String,
    pub byte_len: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreManifest {
    version: u32,
    records: HashMap<String, PhotoRecord>,
}

impl StoreManifest {
    fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            records: HashMap::new(),
        }
    }
}

/// SHA-256 of a byte slice as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Single-slot blob store rooted at a directory.
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open (creating if needed) a store at the given root directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(BLOBS_DIRNAME))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a photo under `id` and make it the current record.
    ///
    /// The superseded record (if any) is removed from the manifest, and every
    /// blob other than the new one is swept, keeping the store strictly
    /// single-slot even when an earlier `put` was interrupted mid-write.
    pub fn put(&self, id: &str, bytes: &[u8]) -> Result<PhotoRecord, StoreError> {
        let previous = self.current_id()?;

        std::fs::write(self.blob_path(id), bytes)?;

        let record = PhotoRecord {
            id: id.to_string(),
            created_at: Utc::now(),
            sha256: hash_bytes(bytes),
            byte_len: bytes.len() as u64,
        };

        let mut manifest = self.load_manifest();
        if let Some(prev) = previous
            && prev != id
        {
            manifest.records.remove(&prev);
        }
        manifest.records.insert(id.to_string(), record.clone());
        self.save_manifest(&manifest)?;

        std::fs::write(self.pointer_path(), id)?;
        self.sweep_stray_blobs(id)?;
        Ok(record)
    }

    /// Remove every blob except the one named `keep`. Covers both the blob
    /// superseded by this `put` and any blob stranded by an interrupted
    /// earlier one.
    fn sweep_stray_blobs(&self, keep: &str) -> Result<(), StoreError> {
        for entry in std::fs::read_dir(self.root.join(BLOBS_DIRNAME))? {
            let entry = entry?;
            if entry.file_name().to_string_lossy() != keep {
                remove_file_if_present(&entry.path())?;
            }
        }
        Ok(())
    }

    /// Read back the current photo's bytes.
    ///
    /// `Ok(None)` when no pointer exists, when the pointer names a record
    /// the manifest doesn't know, or when the blob file is gone, all of
    /// which callers treat as "no stored image". A blob that fails its
    /// checksum is reported as [`StoreError::Corrupt`] instead of being
    /// returned.
    pub fn get(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(id) = self.current_id()? else {
            return Ok(None);
        };
        let manifest = self.load_manifest();
        let Some(record) = manifest.records.get(&id) else {
            return Ok(None);
        };
        let bytes = match std::fs::read(self.blob_path(&id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if hash_bytes(&bytes) != record.sha256 {
            return Err(StoreError::Corrupt { id });
        }
        Ok(Some(bytes))
    }

    /// Metadata for the current record, if one exists.
    pub fn current_record(&self) -> Result<Option<PhotoRecord>, StoreError> {
        let Some(id) = self.current_id()? else {
            return Ok(None);
        };
        Ok(self.load_manifest().records.get(&id).cloned())
    }

    /// Delete the current photo and clear the pointer.
    ///
    /// No-op when nothing is stored; calling it twice in a row succeeds.
    pub fn delete(&self) -> Result<(), StoreError> {
        let Some(id) = self.current_id()? else {
            return Ok(());
        };
        remove_file_if_present(&self.blob_path(&id))?;

        let mut manifest = self.load_manifest();
        if manifest.records.remove(&id).is_some() {
            self.save_manifest(&manifest)?;
        }
        remove_file_if_present(&self.pointer_path())?;
        Ok(())
    }

    /// Read the side-channel pointer. Missing or empty file means no
    /// current record.
    fn current_id(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.pointer_path()) {
            Ok(content) => {
                let id = content.trim();
                if id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(id.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the manifest, tolerating a missing, corrupt, or version-mismatched
    /// file by starting empty. Record metadata is advisory; the pointer and
    /// blob files are the ground truth for existence.
    fn load_manifest(&self) -> StoreManifest {
        let content = match std::fs::read_to_string(self.manifest_path()) {
            Ok(c) => c,
            Err(_) => return StoreManifest::empty(),
        };
        let manifest: StoreManifest = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return StoreManifest::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return StoreManifest::empty();
        }
        manifest
    }

    fn save_manifest(&self, manifest: &StoreManifest) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.manifest_path(), json)?;
        Ok(())
    }

    fn pointer_path(&self) -> PathBuf {
        self.root.join(POINTER_FILENAME)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(BLOBS_DIRNAME).join(id)
    }
}

fn remove_file_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
