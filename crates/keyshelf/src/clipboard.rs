//! Clipboard guard - copy a secret and scrub it after a delay
//!
//! The guard owns at most one pending clear. Copying again replaces it, so
//! the most recent copy decides when the clipboard is scrubbed. When the
//! timer fires the clipboard is only cleared if it still holds the value
//! that was copied; anything the user copied in the meantime is left alone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::{KeyError, Result};

/// How long a copied secret stays on the clipboard by default
pub const DEFAULT_CLEAR_DELAY: Duration =
    Duration::from_secs(keyshelf_core::config::DEFAULT_CLIPBOARD_CLEAR_SECS);

/// Platform clipboard access
pub trait ClipboardBackend: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;

    /// Current text contents, `None` when the clipboard holds no text
    fn read_text(&self) -> Result<Option<String>>;

    fn clear(&self) -> Result<()>;
}

/// The system clipboard via arboard
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| KeyError::ClipboardUnavailable(e.to_string()))?;
        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        lock(&self.inner)
            .set_text(text.to_string())
            .map_err(|e| KeyError::ClipboardUnavailable(e.to_string()))
    }

    fn read_text(&self) -> Result<Option<String>> {
        match lock(&self.inner).get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(KeyError::ClipboardUnavailable(e.to_string())),
        }
    }

    fn clear(&self) -> Result<()> {
        lock(&self.inner)
            .clear()
            .map_err(|e| KeyError::ClipboardUnavailable(e.to_string()))
    }
}

/// In-process clipboard for tests and headless sessions
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        lock(&self.contents).clone()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        *lock(&self.contents) = Some(text.to_string());
        Ok(())
    }

    fn read_text(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn clear(&self) -> Result<()> {
        *lock(&self.contents) = None;
        Ok(())
    }
}

/// Scheduled clear, if any
#[derive(Default)]
struct Pending {
    /// Bumped on every copy and cancel; a timer only acts on its own generation
    generation: u64,
    abort: Option<AbortHandle>,
    handle: Option<JoinHandle<()>>,
}

/// Copies secrets and scrubs them after a delay
///
/// Dropping the guard does not cancel a scheduled clear.
pub struct ClipboardGuard {
    backend: Arc<dyn ClipboardBackend>,
    pending: Arc<Mutex<Pending>>,
}

impl ClipboardGuard {
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self {
            backend,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Guard over the system clipboard
    pub fn system() -> Result<Self> {
        Ok(Self::new(Arc::new(SystemClipboard::new()?)))
    }

    /// Copy `value` now and clear it after `delay`
    ///
    /// A successful copy replaces any earlier pending clear. A failed copy
    /// is returned as `ClipboardUnavailable` and leaves the earlier clear
    /// scheduled, since the clipboard still holds that value.
    /// Must be called from within a tokio runtime.
    pub fn copy_with_expiry(&self, value: &str, delay: Duration) -> Result<()> {
        let mut pending = lock(&self.pending);

        self.backend.write_text(value)?;
        cancel_locked(&mut pending);

        let generation = pending.generation;
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.pending);
        let value = value.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Platform clipboard calls block
            let cleared = tokio::task::spawn_blocking(move || {
                expire(backend.as_ref(), &state, generation, &value)
            });
            if let Err(e) = cleared.await {
                warn!(error = %e, "Clipboard clear task failed");
            }
        });
        pending.abort = Some(handle.abort_handle());
        pending.handle = Some(handle);

        debug!(delay_ms = delay.as_millis() as u64, "Scheduled clipboard clear");
        Ok(())
    }

    /// Drop any scheduled clear without touching the clipboard
    pub fn cancel(&self) {
        let mut pending = lock(&self.pending);
        if pending.abort.is_some() {
            debug!("Cancelled pending clipboard clear");
        }
        cancel_locked(&mut pending);
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).abort.is_some()
    }

    /// Wait until the scheduled clear has run or been cancelled
    pub async fn wait(&self) {
        let handle = lock(&self.pending).handle.take();
        if let Some(handle) = handle {
            // A cancelled timer ends with a JoinError, which is expected here
            let _ = handle.await;
        }
    }
}

fn cancel_locked(pending: &mut Pending) {
    pending.generation += 1;
    if let Some(abort) = pending.abort.take() {
        abort.abort();
    }
    pending.handle = None;
}

/// Timer body; failures are logged, never raised
fn expire(backend: &dyn ClipboardBackend, state: &Mutex<Pending>, generation: u64, value: &str) {
    let mut pending = lock(state);
    if pending.generation != generation {
        return;
    }
    pending.abort = None;
    pending.handle = None;

    match backend.read_text() {
        Ok(Some(current)) if current == value => match backend.clear() {
            Ok(()) => info!("Clipboard cleared"),
            Err(e) => warn!(error = %e, "Failed to clear clipboard"),
        },
        Ok(_) => debug!("Clipboard changed since copy, leaving it alone"),
        Err(e) => warn!(error = %e, "Failed to read clipboard for expiry"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
