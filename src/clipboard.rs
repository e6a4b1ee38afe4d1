//! Platform clipboard capability.
//!
//! The augmentor only ever needs one operation, `write(text)`, so the
//! capability is a small trait. [`SystemClipboard`] is the real thing, backed
//! by `arboard`; [`RecordingClipboard`] keeps requests in memory for dry runs
//! and tests.

use std::fmt;
use std::future::ready;
use std::sync::{Mutex, PoisonError};

/// Why a clipboard request did not go through.
///
/// Callers treat both variants the same way: the request failed. The variant
/// only makes the log line more useful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// No clipboard could be opened (headless session, missing display server).
    Unavailable(String),
    /// A clipboard exists but refused the write.
    Rejected(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "clipboard unavailable: {msg}"),
            Self::Rejected(msg) => write!(f, "clipboard write rejected: {msg}"),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Something that can receive text for the user to paste.
pub trait Clipboard: Send + Sync + 'static {
    /// Put `text` on the clipboard.
    fn write(&self, text: String) -> impl Future<Output = Result<(), ClipboardError>> + Send;
}

/// Copy `s` to the system clipboard.
///
/// This is a thin wrapper around the `arboard` crate. On some platforms or in
/// headless CI environments clipboard initialization fails; that is reported
/// as [`ClipboardError::Unavailable`].
pub fn copy_to_clipboard(s: &str) -> Result<(), ClipboardError> {
    let mut ctx = arboard::Clipboard::new()
        .map_err(|e| ClipboardError::Unavailable(format!("clipboard init: {e}")))?;
    ctx.set_text(s.to_owned())
        .map_err(|e| ClipboardError::Rejected(format!("clipboard set: {e}")))
}

/// The desktop clipboard.
///
/// `arboard` is synchronous, so each write runs on the blocking pool and only
/// the awaiting activation is suspended.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Clipboard for SystemClipboard {
    fn write(&self, text: String) -> impl Future<Output = Result<(), ClipboardError>> + Send {
        async move {
            tokio::task::spawn_blocking(move || copy_to_clipboard(&text))
                .await
                .map_err(|e| ClipboardError::Rejected(format!("clipboard task: {e}")))?
        }
    }
}

/// In-memory clipboard that remembers every request it receives.
#[derive(Debug, Default)]
pub struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
    fail_with: Option<ClipboardError>,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that records each request and then fails it with `err`.
    pub fn failing(err: ClipboardError) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail_with: Some(err),
        }
    }

    /// Every text received so far, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent text received.
    pub fn last(&self) -> Option<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Clipboard for RecordingClipboard {
    fn write(&self, text: String) -> impl Future<Output = Result<(), ClipboardError>> + Send {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text);
        ready(match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        })
    }
}
