//! Process-wide memoization of parse results by book id.
//!
//! The in-flight future is stored before it is first polled, so concurrent
//! callers for the same id await one shared parse. Entries are never evicted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::ParseOutcome;
use crate::options::ParseOptions;

/// Memoizes one asynchronous computation per id.
pub struct BookCache<T: Clone> {
    entries: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T> BookCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the value for `id`, running `supplier` only if no computation
    /// for it has started yet.
    pub async fn get_or_create<F, Fut>(&self, id: &str, supplier: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(id.to_string())
                .or_insert_with(|| {
                    log::debug!("Cache miss for {id}");
                    supplier().boxed().shared()
                })
                .clone()
        };
        shared.await
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Shared<BoxFuture<'static, T>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BookCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

static DOCUMENTS: LazyLock<BookCache<Arc<ParseOutcome>>> = LazyLock::new(BookCache::new);

/// [`parse_document`](crate::parse_document), memoized by `book_id` for the
/// lifetime of the process.
///
/// Later calls with the same id return the first result, whatever bytes and
/// options they pass.
pub async fn parse_document_cached(
    book_id: &str,
    bytes: impl Into<Arc<[u8]>>,
    options: &ParseOptions,
) -> Arc<ParseOutcome> {
    let bytes: Arc<[u8]> = bytes.into();
    let options = options.clone();
    DOCUMENTS
        .get_or_create(book_id, move || async move {
            Arc::new(crate::parse_document(bytes, &options).await)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache: BookCache<usize> = BookCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                calls.fetch_add(1, Ordering::SeqCst) + 41
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_create("book", make(calls.clone())),
            cache.get_or_create("book", make(calls.clone())),
        );
        assert_eq!((a, b), (41, 41));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = cache.get_or_create("book", make(calls.clone())).await;
        assert_eq!(c, 41);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains("book"));
    }

    #[tokio::test]
    async fn test_ids_are_independent() {
        let cache: BookCache<String> = BookCache::new();
        let a = cache
            .get_or_create("a", || async { "first".to_string() })
            .await;
        let b = cache
            .get_or_create("b", || async { "second".to_string() })
            .await;
        assert_eq!((a.as_str(), b.as_str()), ("first", "second"));
        assert_eq!(cache.len(), 2);
    }
}
