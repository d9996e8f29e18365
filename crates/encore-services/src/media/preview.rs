use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::stage::LocalFile;

/// Issues and frees local preview references for staged files.
pub trait PreviewRegistry: Send + Sync {
    /// Create a preview reference for a staged file and return its URL.
    fn create(&self, file: &LocalFile) -> String;

    /// Free a preview reference previously returned by `create`.
    fn release(&self, url: &str);
}

/// Owned preview reference. Released exactly once: explicitly through `release`, or
/// when the handle is dropped.
pub struct PreviewHandle {
    url: String,
    registry: Arc<dyn PreviewRegistry>,
    released: bool,
}

impl PreviewHandle {
    pub fn new(registry: Arc<dyn PreviewRegistry>, file: &LocalFile) -> Self {
        let url = registry.create(file);
        Self {
            url,
            registry,
            released: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(&self.url);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("url", &self.url)
            .field("released", &self.released)
            .finish()
    }
}

#[derive(Default)]
struct Ledger {
    live: HashMap<String, usize>,
    released: HashMap<String, usize>,
    excess: usize,
}

/// Preview registry that keeps previews in memory and counts releases.
///
/// Releasing an unknown or already-released URL is logged at `warn` and counted.
#[derive(Default)]
pub struct InMemoryPreviewRegistry {
    ledger: Mutex<Ledger>,
}

impl InMemoryPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Previews created and not yet released
    pub fn live_count(&self) -> usize {
        self.ledger().live.len()
    }

    /// Times `url` has been released
    pub fn release_count(&self, url: &str) -> usize {
        self.ledger().released.get(url).copied().unwrap_or(0)
    }

    /// Releases of URLs that were not live at the time
    pub fn excess_releases(&self) -> usize {
        self.ledger().excess
    }
}

impl PreviewRegistry for InMemoryPreviewRegistry {
    fn create(&self, file: &LocalFile) -> String {
        let url = format!("blob:encore/{}", Uuid::new_v4());
        self.ledger().live.insert(url.clone(), file.size());
        url
    }

    fn release(&self, url: &str) {
        let mut ledger = self.ledger();
        *ledger.released.entry(url.to_string()).or_insert(0) += 1;
        if ledger.live.remove(url).is_none() {
            ledger.excess += 1;
            tracing::warn!(url = %url, "Preview released twice or never created");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> LocalFile {
        LocalFile::new("a.jpg", "image/jpeg", vec![1, 2, 3])
    }

    #[test]
    fn dropping_a_handle_releases_it_once() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let handle = PreviewHandle::new(registry.clone(), &file());
        let url = handle.url().to_string();
        assert_eq!(registry.live_count(), 1);

        drop(handle);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.release_count(&url), 1);
        assert_eq!(registry.excess_releases(), 0);
    }

    #[test]
    fn explicit_release_is_not_repeated_on_drop() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let handle = PreviewHandle::new(registry.clone(), &file());
        let url = handle.url().to_string();

        handle.release();
        assert_eq!(registry.release_count(&url), 1);
        assert_eq!(registry.excess_releases(), 0);
    }

    #[test]
    fn double_release_is_counted() {
        let registry = InMemoryPreviewRegistry::new();
        let url = registry.create(&file());
        registry.release(&url);
        registry.release(&url);
        assert_eq!(registry.excess_releases(), 1);
    }
}
