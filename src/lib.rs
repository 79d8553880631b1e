//! # Photoslot
//!
//! A single-slot profile photo pipeline: validate a picked file, crop it
//! through a pluggable crop tool, normalize dimensions and quality, persist
//! exactly one photo per store root, and hand consumers an ephemeral display
//! URL.
//!
//! # Architecture: One Flow, Small Parts
//!
//! ```text
//! picked file ─▶ validate ─▶ preview ─▶ crop ─▶ resize ─▶ store
//!                                                  │
//!                                                  └─▶ display URL
//! ```
//!
//! Each step is an independent, separately testable piece; the
//! [`manager::PhotoManager`] state machine is the only place they compose.
//! This separation exists for three reasons:
//!
//! - **Substitutable crop UI**: the interactive widget is behind the
//!   [`crop::CropTool`] trait, so any cropper (or the built-in headless
//!   [`crop::CenterCrop`]) plugs in.
//! - **Testability**: validation and resizing are pure functions over byte
//!   slices; the store is exercised against a temp directory.
//! - **Failure isolation**: a storage hiccup degrades to "no photo" instead
//!   of taking the workflow down.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Byte-signature sniffing and the upload size ceiling |
//! | [`resize`] | Exact-dimension resize + JPEG/PNG re-encode |
//! | [`store`] | Single-slot durable blob store (pointer + manifest + blob files) |
//! | [`upload`] | Selection lifecycle, preview data URI, transient errors |
//! | [`crop`] | Crop-tool contract, zoom floor, crop → resize chaining |
//! | [`display`] | Object-URL registry with revoke-on-drop handles |
//! | [`manager`] | The Idle → Cropping → Saving workflow state machine |
//! | [`config`] | `photoslot.toml` loading, defaults, validation |
//!
//! # Design Decisions
//!
//! ## Sniffing Over Trust
//!
//! The format of an upload is decided from its leading bytes, never from the
//! filename or a declared MIME type. A picker hands over whatever the user's
//! filesystem claims; only the content is authoritative.
//!
//! ## Strict Single Slot
//!
//! The store keeps exactly one photo. `put` removes the superseded record
//! and blob in the same operation, so the slot never accumulates history:
//! there is nothing to sweep and nothing to leak.
//!
//! ## Display URLs as Ownership
//!
//! Every display URL is an RAII handle: dropping it revokes the registry
//! entry exactly once. Replacing the photo replaces the handle, and the old
//! URL dies with it. There is no manual revoke call to forget.
//!
//! ## Non-Fatal Resizing
//!
//! A blob the resizer cannot handle yields `None` with a `warn` log, and the
//! caller checks before persisting. The photo slot is a convenience, not a
//! system of record; degrading beats crashing.

pub mod config;
pub mod crop;
pub mod display;
pub mod manager;
pub mod resize;
pub mod store;
pub mod upload;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
