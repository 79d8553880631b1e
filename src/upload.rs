//! File-selection lifecycle: validate, preview, transient error display.
//!
//! Owns the transient [`SelectedPhoto`] between the moment a file is picked
//! and the moment cropping finishes (or is cancelled). The preview is a
//! base64 data URI built from the raw bytes, ready for an `<img>`-equivalent
//! consumer, and is never persisted.
//!
//! A failed validation raises a transient error that self-clears two seconds
//! after being raised. The pipeline is cooperative and single-threaded, so
//! the TTL is checked lazily on read rather than by a timer.

use crate::validate::{self, PhotoFormat, ValidationError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::time::{Duration, Instant};

/// How long a validation error stays visible after being raised.
pub const ERROR_TTL: Duration = Duration::from_secs(2);

/// In-memory representation of the currently selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPhoto {
    /// Data URI of the raw bytes, for immediate preview rendering.
    pub preview: String,
    pub name: String,
    pub byte_size: u64,
    /// Format as sniffed from content, not as claimed by the filename.
    pub format: PhotoFormat,
}

struct TransientError {
    kind: ValidationError,
    raised_at: Instant,
}

/// Controller for the raw-file-selection lifecycle.
pub struct UploadController {
    max_bytes: u64,
    selection: Option<SelectedPhoto>,
    error: Option<TransientError>,
}

impl UploadController {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            selection: None,
            error: None,
        }
    }

    /// Validate a picked file and capture it as the current selection.
    ///
    /// Returns `true` on success. On failure the selection is left untouched
    /// and a transient error is raised instead.
    pub fn select_file(&mut self, name: &str, bytes: &[u8]) -> bool {
        match validate::validate_with_limit(bytes, self.max_bytes) {
            Ok(format) => {
                self.selection = Some(SelectedPhoto {
                    preview: data_uri(format, bytes),
                    name: name.to_string(),
                    byte_size: bytes.len() as u64,
                    format,
                });
                self.error = None;
                true
            }
            Err(kind) => {
                self.error = Some(TransientError {
                    kind,
                    raised_at: Instant::now(),
                });
                false
            }
        }
    }

    pub fn selection(&self) -> Option<&SelectedPhoto> {
        self.selection.as_ref()
    }

    /// The current validation error, if one was raised within the last
    /// [`ERROR_TTL`]. Expired errors read as `None`.
    pub fn current_error(&self) -> Option<&ValidationError> {
        self.error
            .as_ref()
            .filter(|e| e.raised_at.elapsed() < ERROR_TTL)
            .map(|e| &e.kind)
    }

    /// Reset the selection and any pending error so the same file can be
    /// picked again.
    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.error = None;
    }

    /// Pretend the current error was raised `by` earlier. Test-only clock
    /// control for the TTL.
    #[cfg(test)]
    fn backdate_error(&mut self, by: Duration) {
        if let Some(e) = self.error.as_mut() {
            e.raised_at -= by;
        }
    }
}

fn data_uri(format: PhotoFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime(), BASE64.encode(bytes))
}
