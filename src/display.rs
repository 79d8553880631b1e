//! Display URLs: ephemeral handles wrapping blobs for image consumers.
//!
//! The rendering layer consumes a single string and resolves it to bytes
//! when it needs pixels, the same way an `<img>` element consumes an object
//! URL. Every URL minted by [`UrlRegistry::create`] is backed by an entry in
//! the registry; dropping the returned [`DisplayUrl`] revokes the entry
//! exactly once, so replacing a handle (new photo saved) or letting it go
//! out of scope (view torn down) reclaims the bytes automatically. There is
//! no manual revoke call to forget.
//!
//! The registry is single-threaded shared state: the pipeline runs on one
//! event loop and handles never cross threads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use uuid::Uuid;

type Slots = RefCell<HashMap<String, Vec<u8>>>;

/// Registry of live display URLs.
#[derive(Default)]
pub struct UrlRegistry {
    slots: Rc<Slots>,
}

impl UrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a URL for the given bytes. The entry lives until the returned
    /// handle is dropped.
    pub fn create(&self, bytes: Vec<u8>) -> DisplayUrl {
        let url = format!("mem://{}", Uuid::new_v4());
        self.slots.borrow_mut().insert(url.clone(), bytes);
        DisplayUrl {
            url,
            slots: Rc::downgrade(&self.slots),
        }
    }

    /// Resolve a URL to a copy of its bytes. `None` once revoked.
    pub fn resolve(&self, url: &str) -> Option<Vec<u8>> {
        self.slots.borrow().get(url).cloned()
    }

    /// Number of live (unrevoked) URLs.
    pub fn live_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

/// Owning handle for one display URL. Revokes its registry entry on drop.
pub struct DisplayUrl {
    url: String,
    slots: Weak<Slots>,
}

impl DisplayUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for DisplayUrl {
    fn drop(&mut self) {
        // Registry may already be gone during teardown; nothing to revoke then.
        if let Some(slots) = self.slots.upgrade() {
            slots.borrow_mut().remove(&self.url);
        }
    }
}

impl std::fmt::Debug for DisplayUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DisplayUrl").field(&self.url).finish()
    }
}
