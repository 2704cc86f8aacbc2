use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::catalog::{fetch_image, ImageRef, LoadError};

pub trait Preloader: Send + Sync + 'static {
    fn preload(&self, reference: &str) -> Result<(), LoadError>;

    /// Forget whatever is held for references not in `keep`. Called when a
    /// new order replaces the old one.
    fn retain(&self, _keep: &[ImageRef]) {}
}

/// Stop flag for a preload batch, checked before each reference.
#[derive(Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Warm `preloader` with every reference, in order, on the blocking pool.
///
/// Failures are logged and skipped; nothing is retried. Once `cancel` is
/// set the batch ends after the reference in flight.
pub fn spawn_preload(
    preloader: Arc<dyn Preloader>,
    references: Vec<ImageRef>,
    cancel: Cancel,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        for (done, reference) in references.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!("preload stopped after {} of {} images", done, references.len());
                return;
            }
            match preloader.preload(reference) {
                Ok(()) => trace!("preloaded {}", reference),
                Err(e) => debug!("preload of {} failed: {}", reference, e),
            }
        }
    })
}

/// Fetches each image and throws the bytes away. Used when nothing decodes
/// images, so preloading only reports unreachable references.
pub struct FetchOnly;

impl Preloader for FetchOnly {
    fn preload(&self, reference: &str) -> Result<(), LoadError> {
        fetch_image(reference).map(drop)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<Vec<u8>>>,
    pending: HashSet<String>,
    failed: HashSet<String>,
}

/// Raw image bytes keyed by reference, shared between the preloader and the
/// frontend that decodes them.
#[derive(Clone, Default)]
pub struct ImageCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, reference: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().entries.get(reference).cloned()
    }

    pub fn insert(&self, reference: &str, bytes: Vec<u8>) {
        let mut inner = self.lock();
        inner.pending.remove(reference);
        inner.entries.insert(reference.to_string(), Arc::new(bytes));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub fn has_failed(&self, reference: &str) -> bool {
        self.lock().failed.contains(reference)
    }

    /// Allow references whose on-demand fetch failed to be requested again.
    pub fn forget_failures(&self) {
        self.lock().failed.clear();
    }

    /// Fetch `reference` in the background unless it is cached, already on
    /// its way, or a previous request for it failed. Returns `None` when no
    /// fetch was started.
    pub fn request(&self, reference: &str) -> Option<JoinHandle<()>> {
        {
            let mut inner = self.lock();
            if inner.entries.contains_key(reference) || inner.failed.contains(reference) {
                return None;
            }
            if !inner.pending.insert(reference.to_string()) {
                return None;
            }
        }

        let cache = self.clone();
        let reference = reference.to_string();
        Some(tokio::task::spawn_blocking(move || match fetch_image(&reference) {
            Ok(bytes) => cache.insert(&reference, bytes),
            Err(e) => {
                debug!("could not fetch {}: {}", reference, e);
                let mut inner = cache.lock();
                inner.pending.remove(&reference);
                inner.failed.insert(reference);
            }
        }))
    }
}

impl Preloader for ImageCache {
    fn preload(&self, reference: &str) -> Result<(), LoadError> {
        if self.get(reference).is_some() {
            return Ok(());
        }
        let bytes = fetch_image(reference)?;
        self.insert(reference, bytes);
        Ok(())
    }

    fn retain(&self, keep: &[ImageRef]) {
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|reference, _| keep.contains(reference.as_str()));
        inner.failed.retain(|reference| keep.contains(reference.as_str()));
        debug!("evicted {} cached images", before - inner.entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Preloader for Recorder {
        fn preload(&self, reference: &str) -> Result<(), LoadError> {
            self.seen.lock().unwrap().push(reference.to_string());
            if reference.contains("broken") {
                return Err(LoadError::Worker("broken".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn visits_every_reference_despite_failures() {
        let recorder = Arc::new(Recorder::default());
        let references = vec!["a.png".to_string(), "broken.png".into(), "c.png".into()];

        spawn_preload(recorder.clone(), references.clone(), Cancel::default())
            .await
            .unwrap();
        assert_eq!(*recorder.seen.lock().unwrap(), references);
    }

    #[tokio::test]
    async fn cache_preloads_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, b"aaaa").unwrap();
        let a = a.display().to_string();
        let missing = dir.path().join("missing.png").display().to_string();

        let cache = ImageCache::new();
        spawn_preload(Arc::new(cache.clone()), vec![a.clone(), missing.clone()], Cancel::default())
            .await
            .unwrap();

        assert_eq!(cache.get(&a).as_deref().map(Vec::as_slice), Some(&b"aaaa"[..]));
        assert!(cache.get(&missing).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn request_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.png");
        std::fs::write(&path, b"bb").unwrap();
        let reference = path.display().to_string();

        let cache = ImageCache::new();
        let first = cache.request(&reference).expect("first request starts a fetch");
        assert!(cache.request(&reference).is_none());
        first.await.unwrap();

        assert!(cache.get(&reference).is_some());
        assert!(cache.request(&reference).is_none());
    }

    #[tokio::test]
    async fn failed_request_waits_for_forget() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("late.png").display().to_string();

        let cache = ImageCache::new();
        cache.request(&reference).unwrap().await.unwrap();
        assert_eq!(cache.len(), 0);
        assert!(cache.has_failed(&reference));

        std::fs::write(dir.path().join("late.png"), b"ok").unwrap();
        assert!(cache.request(&reference).is_none());

        cache.forget_failures();
        cache.request(&reference).unwrap().await.unwrap();
        assert!(cache.get(&reference).is_some());
    }

    struct CancelsItself {
        cancel: Cancel,
        seen: Mutex<Vec<String>>,
    }

    impl Preloader for CancelsItself {
        fn preload(&self, reference: &str) -> Result<(), LoadError> {
            self.seen.lock().unwrap().push(reference.to_string());
            self.cancel.cancel();
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancelled_batch_stops_before_the_next_reference() {
        let cancel = Cancel::default();
        let preloader = Arc::new(CancelsItself {
            cancel: cancel.clone(),
            seen: Mutex::default(),
        });
        let references: Vec<String> = (0..8).map(|i| format!("{}.png", i)).collect();

        spawn_preload(preloader.clone(), references, cancel.clone()).await.unwrap();
        assert!(cancel.is_cancelled());
        assert_eq!(*preloader.seen.lock().unwrap(), vec!["0.png"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_fetches_nothing() {
        let recorder = Arc::new(Recorder::default());
        let cancel = Cancel::default();
        cancel.cancel();

        spawn_preload(recorder.clone(), vec!["a.png".into()], cancel).await.unwrap();
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn retain_evicts_references_outside_the_order() {
        let cache = ImageCache::new();
        cache.insert("a.png", vec![1]);
        cache.insert("b.png", vec![2]);
        cache.insert("c.png", vec![3]);
        cache.lock().failed.insert("gone.png".into());

        cache.retain(&["b.png".to_string(), "d.png".to_string()]);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("b.png").is_some());
        assert!(cache.get("a.png").is_none());
        assert!(!cache.has_failed("gone.png"));
    }

    #[test]
    fn fetch_only_reports_without_keeping_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"aaaa").unwrap();

        assert!(FetchOnly.preload(&path.display().to_string()).is_ok());
        let missing = dir.path().join("missing.png").display().to_string();
        assert!(matches!(FetchOnly.preload(&missing), Err(LoadError::Io { .. })));
    }
}
