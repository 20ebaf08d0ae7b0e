use parking_lot::RwLock;
use std::{collections::HashMap, future::Future, time::Duration};
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry<T> {
  value: T,
  created: Instant,
  ttl: Duration,
}

impl<T> Entry<T> {
  fn is_fresh(&self, now: Instant) -> bool {
    now.duration_since(self.created) < self.ttl
  }
}

/// Read-through cache with per-entry expiry. Uses the tokio clock so paused
/// test runtimes can advance it.
///
/// Concurrent misses on one key may each run the loader; the last write wins.
#[derive(Debug)]
pub struct TtlCache<T> {
  ttl: Duration,
  entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
  pub fn new(ttl: Duration) -> Self {
    TtlCache {
      ttl,
      entries: RwLock::new(HashMap::new()),
    }
  }

  #[inline]
  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Returns the value when present and unexpired.
  pub fn get(&self, key: &str) -> Option<T> {
    let now = Instant::now();
    self
      .entries
      .read()
      .get(key)
      .filter(|e| e.is_fresh(now))
      .map(|e| e.value.clone())
  }

  pub fn set(&self, key: impl Into<String>, value: T) {
    self.set_with_ttl(key, value, self.ttl)
  }

  pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
    self.entries.write().insert(
      key.into(),
      Entry {
        value,
        created: Instant::now(),
        ttl,
      },
    );
  }

  pub fn invalidate(&self, key: &str) {
    self.entries.write().remove(key);
  }

  pub async fn get_or_load<F, Fut, E>(&self, key: &str, loader: F) -> Result<T, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    self.get_or_load_with_ttl(key, self.ttl, loader).await
  }

  /// Runs `loader` on a miss and caches its value. Errors are returned and
  /// nothing is stored.
  pub async fn get_or_load_with_ttl<F, Fut, E>(
    &self,
    key: &str,
    ttl: Duration,
    loader: F,
  ) -> Result<T, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    if let Some(value) = self.get(key) {
      trace!(key, "cache hit");
      return Ok(value);
    }

    trace!(key, "cache miss");
    let value = loader().await?;
    self.set_with_ttl(key, value.clone(), ttl);
    Ok(value)
  }
}
