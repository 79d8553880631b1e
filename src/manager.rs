//! The photo workflow state machine.
//!
//! [`PhotoManager`] composes the upload controller, crop controller, blob
//! store, and display-URL registry into the single user-facing flow:
//!
//! ```text
//! Idle ──handle_file_change──▶ Cropping ──save_cropped──▶ Saving ──▶ Idle
//!                                  │
//!                                  └──cancel_crop──▶ Idle
//! ```
//!
//! The manager owns every piece of mutable workflow state (selection, crop
//! tool, display URL) with construction and teardown tied to the workflow's
//! lifetime. Exactly one operation is in flight at a time: a file change is
//! rejected outright while a crop or save is pending, instead of silently
//! racing the earlier one.
//!
//! Storage failures never crash the flow. They are logged at `warn` and the
//! manager degrades to the no-image state (on load) or keeps the in-memory
//! display so the user can retry (on save).

use crate::config::PhotoConfig;
use crate::crop::{CropController, CropOptions, CropTool};
use crate::display::{DisplayUrl, UrlRegistry};
use crate::resize;
use crate::store::PhotoStore;
use crate::upload::{SelectedPhoto, UploadController};
use crate::validate::ValidationError;
use tracing::warn;
use uuid::Uuid;

/// Workflow phase. All transitions go through [`PhotoManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Cropping,
    Saving,
}

/// Orchestrator for the select → crop → persist → display flow.
pub struct PhotoManager {
    config: PhotoConfig,
    phase: Phase,
    upload: UploadController,
    crop: CropController,
    store: PhotoStore,
    urls: UrlRegistry,
    display: Option<DisplayUrl>,
}

impl PhotoManager {
    pub fn new(store: PhotoStore, config: PhotoConfig) -> Self {
        let upload = UploadController::new(config.limits.max_bytes);
        Self {
            config,
            phase: Phase::Idle,
            upload,
            crop: CropController::new(),
            store,
            urls: UrlRegistry::new(),
            display: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The display URL for the current photo, if any.
    pub fn display_url(&self) -> Option<&str> {
        self.display.as_ref().map(DisplayUrl::as_str)
    }

    /// Resolve a display URL to its bytes, for `<img>`-equivalent consumers.
    pub fn resolve_display(&self, url: &str) -> Option<Vec<u8>> {
        self.urls.resolve(url)
    }

    pub fn selection(&self) -> Option<&SelectedPhoto> {
        self.upload.selection()
    }

    /// The transient upload error, while still within its display window.
    pub fn upload_error(&self) -> Option<&ValidationError> {
        self.upload.current_error()
    }

    /// Read back the persisted photo on startup and mint a display URL from
    /// its display-normalized rendition. Storage trouble degrades to the
    /// no-image state.
    pub fn load_stored(&mut self) {
        let bytes = match self.store.get() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "stored photo unavailable, starting without one");
                return;
            }
        };
        if let Some(display_bytes) = resize::resize(&bytes, &self.config.display.spec()) {
            self.display = Some(self.urls.create(display_bytes));
        }
    }

    /// A file was picked. Validates and, on success, opens the cropping
    /// phase. Rejected while a previous crop/save is still in flight.
    pub fn handle_file_change(&mut self, name: &str, bytes: &[u8]) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        if self.upload.select_file(name, bytes) {
            self.phase = Phase::Cropping;
            true
        } else {
            false
        }
    }

    /// Bind the crop widget once it reports ready. Only meaningful while
    /// cropping.
    pub fn bind_crop_tool(&mut self, tool: Box<dyn CropTool>) {
        self.crop.bind(tool);
    }

    /// Forward a wheel event to the crop controller.
    pub fn wheel_zoom(&mut self, delta_y: f64) -> bool {
        self.crop.wheel_zoom(delta_y)
    }

    /// Commit the crop: extract + normalize, refresh the display URL, and
    /// persist under a fresh id.
    ///
    /// Returns `false` (staying in `Cropping`) when no blob could be
    /// produced; nothing is persisted in that case. A storage write failure
    /// is logged and swallowed; the new display URL stays up and the slot
    /// can be retried.
    pub fn save_cropped(&mut self) -> bool {
        if self.phase != Phase::Cropping {
            return false;
        }
        self.phase = Phase::Saving;

        let crop = &self.config.crop;
        let Some(blob) = self.crop.cropped_blob(&CropOptions {
            width: crop.width,
            height: crop.height,
            quality: crop.quality,
        }) else {
            self.phase = Phase::Cropping;
            return false;
        };

        // Old URL (if any) is revoked when the handle is replaced
        if let Some(display_bytes) = resize::resize(&blob, &self.config.display.spec()) {
            self.display = Some(self.urls.create(display_bytes));
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.store.put(&id, &blob) {
            warn!(error = %e, "photo store write failed; photo kept in memory only");
        }

        self.upload.clear_selection();
        self.phase = Phase::Idle;
        true
    }

    /// Abandon the crop without persisting anything.
    pub fn cancel_crop(&mut self) {
        if self.phase != Phase::Cropping {
            return;
        }
        self.upload.clear_selection();
        self.crop.release();
        self.phase = Phase::Idle;
    }

    /// Remove the current photo: selection, display URL, stored record, and
    /// crop tool. Safe to call when nothing is stored.
    pub fn remove_image(&mut self) {
        self.upload.clear_selection();
        self.display = None;
        if let Err(e) = self.store.delete() {
            warn!(error = %e, "photo store delete failed");
        }
        self.crop.release();
        self.phase = Phase::Idle;
    }

    /// The store backing this manager.
    pub fn store(&self) -> &PhotoStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::CenterCrop;
    use crate::crop::tests::MockCropTool;
    use crate::store::PhotoStore;
    use crate::test_helpers::encode_test_jpeg;
    use tempfile::TempDir;

    fn manager(tmp: &TempDir) -> PhotoManager {
        let store = PhotoStore::open(tmp.path().join("slot")).unwrap();
        PhotoManager::new(store, PhotoConfig::default())
    }

    fn select_and_bind(mgr: &mut PhotoManager, source: &[u8]) {
        assert!(mgr.handle_file_change("photo.jpg", source));
        let tool = CenterCrop::from_bytes(source, (280, 400)).unwrap();
        mgr.bind_crop_tool(Box::new(tool));
    }

    // =========================================================================
    // Phase transitions
    // =========================================================================

    #[test]
    fn success_path_walks_idle_cropping_idle() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        assert_eq!(mgr.phase(), Phase::Idle);

        let source = encode_test_jpeg(640, 640);
        select_and_bind(&mut mgr, &source);
        assert_eq!(mgr.phase(), Phase::Cropping);

        assert!(mgr.save_cropped());
        assert_eq!(mgr.phase(), Phase::Idle);
        assert!(mgr.selection().is_none());
        assert!(mgr.display_url().is_some());
    }

    #[test]
    fn cancel_returns_to_idle_without_persisting() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);
        select_and_bind(&mut mgr, &source);

        mgr.cancel_crop();
        assert_eq!(mgr.phase(), Phase::Idle);
        assert!(mgr.selection().is_none());
        assert_eq!(mgr.store().get().unwrap(), None);
    }

    #[test]
    fn cancel_outside_cropping_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        mgr.cancel_crop();
        assert_eq!(mgr.phase(), Phase::Idle);
    }

    #[test]
    fn file_change_is_rejected_while_cropping() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);
        select_and_bind(&mut mgr, &source);

        // Second rapid selection while the first crop is open
        assert!(!mgr.handle_file_change("other.jpg", &source));
        assert_eq!(mgr.selection().unwrap().name, "photo.jpg");
    }

    #[test]
    fn invalid_file_stays_idle_with_transient_error() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);

        assert!(!mgr.handle_file_change("notes.txt", b"not an image"));
        assert_eq!(mgr.phase(), Phase::Idle);
        assert!(mgr.upload_error().is_some());
    }

    #[test]
    fn save_outside_cropping_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        assert!(!mgr.save_cropped());
    }

    // =========================================================================
    // Save semantics
    // =========================================================================

    #[test]
    fn save_persists_crop_dimensioned_blob() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(1000, 800);
        select_and_bind(&mut mgr, &source);

        assert!(mgr.save_cropped());
        let stored = mgr.store().get().unwrap().expect("blob persisted");
        assert_eq!(resize::dimensions(&stored), Some((280, 400)));
    }

    #[test]
    fn display_url_resolves_to_display_rendition() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(1000, 800);
        select_and_bind(&mut mgr, &source);
        mgr.save_cropped();

        let url = mgr.display_url().unwrap().to_string();
        let bytes = mgr.resolve_display(&url).unwrap();
        assert_eq!(resize::dimensions(&bytes), Some((800, 600)));
    }

    #[test]
    fn failed_extraction_keeps_cropping_and_persists_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);
        assert!(mgr.handle_file_change("photo.jpg", &source));

        let mut broken = MockCropTool::serving(vec![]);
        broken.region = None;
        mgr.bind_crop_tool(Box::new(broken));

        assert!(!mgr.save_cropped());
        assert_eq!(mgr.phase(), Phase::Cropping);
        assert_eq!(mgr.store().get().unwrap(), None);
        assert!(mgr.display_url().is_none());
    }

    #[test]
    fn save_without_a_bound_tool_keeps_cropping() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);
        assert!(mgr.handle_file_change("photo.jpg", &source));

        assert!(!mgr.save_cropped());
        assert_eq!(mgr.phase(), Phase::Cropping);
    }

    #[test]
    fn saving_again_supersedes_the_display_url() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);

        select_and_bind(&mut mgr, &source);
        mgr.save_cropped();
        let first_url = mgr.display_url().unwrap().to_string();

        select_and_bind(&mut mgr, &source);
        mgr.save_cropped();

        // Old URL revoked, new one live
        assert!(mgr.resolve_display(&first_url).is_none());
        assert!(mgr.resolve_display(mgr.display_url().unwrap()).is_some());
    }

    // =========================================================================
    // Removal and reload
    // =========================================================================

    #[test]
    fn remove_clears_store_display_and_tool() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        let source = encode_test_jpeg(640, 640);
        select_and_bind(&mut mgr, &source);
        mgr.save_cropped();

        mgr.remove_image();
        assert!(mgr.display_url().is_none());
        assert_eq!(mgr.store().get().unwrap(), None);
        assert_eq!(mgr.phase(), Phase::Idle);
    }

    #[test]
    fn remove_with_nothing_stored_is_safe() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        mgr.remove_image();
        mgr.remove_image();
        assert_eq!(mgr.phase(), Phase::Idle);
    }

    #[test]
    fn load_stored_rebuilds_the_display_url() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("slot");
        {
            let store = PhotoStore::open(&root).unwrap();
            let mut mgr = PhotoManager::new(store, PhotoConfig::default());
            let source = encode_test_jpeg(640, 640);
            select_and_bind(&mut mgr, &source);
            mgr.save_cropped();
        }

        // Fresh manager over the same store, as after an app restart
        let store = PhotoStore::open(&root).unwrap();
        let mut mgr = PhotoManager::new(store, PhotoConfig::default());
        assert!(mgr.display_url().is_none());

        mgr.load_stored();
        let url = mgr.display_url().expect("display rebuilt from store");
        let bytes = mgr.resolve_display(url).unwrap();
        assert_eq!(resize::dimensions(&bytes), Some((800, 600)));
    }

    #[test]
    fn load_stored_on_empty_store_stays_without_image() {
        let tmp = TempDir::new().unwrap();
        let mut mgr = manager(&tmp);
        mgr.load_stored();
        assert!(mgr.display_url().is_none());
    }

    // =========================================================================
    // Storage-failure degradation
    // =========================================================================

    #[test]
    fn load_stored_with_corrupt_blob_degrades_to_no_image() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("slot");
        {
            let store = PhotoStore::open(&root).unwrap();
            let mut mgr = PhotoManager::new(store, PhotoConfig::default());
            let source = encode_test_jpeg(640, 640);
            select_and_bind(&mut mgr, &source);
            mgr.save_cropped();
        }

        // Tamper the blob on disk so the checksum check fails on read
        let store = PhotoStore::open(&root).unwrap();
        let id = store.current_record().unwrap().unwrap().id;
        std::fs::write(root.join("blobs").join(&id), b"tampered").unwrap();

        let mut mgr = PhotoManager::new(store, PhotoConfig::default());
        mgr.load_stored();
        assert!(mgr.display_url().is_none());
        assert_eq!(mgr.phase(), Phase::Idle);
    }

    #[test]
    fn save_completes_when_the_store_write_fails() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("slot");
        let store = PhotoStore::open(&root).unwrap();

        // Turn the blobs directory into a plain file so every blob write fails
        std::fs::remove_dir_all(root.join("blobs")).unwrap();
        std::fs::write(root.join("blobs"), b"").unwrap();

        let mut mgr = PhotoManager::new(store, PhotoConfig::default());
        let source = encode_test_jpeg(640, 640);
        select_and_bind(&mut mgr, &source);

        // The save still completes; the display stays live in memory
        assert!(mgr.save_cropped());
        assert_eq!(mgr.phase(), Phase::Idle);
        let url = mgr.display_url().expect("display stays live").to_string();
        assert!(mgr.resolve_display(&url).is_some());

        // Nothing made it to disk
        assert_eq!(mgr.store().get().unwrap(), None);
    }
}
