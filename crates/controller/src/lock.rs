use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};

/// Keys of in-flight mutating operations. Cloning shares the same set.
#[derive(Debug, Default, Clone)]
pub struct OperationLocks(Arc<Mutex<HashSet<String>>>);

impl OperationLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts `key`, returning false if it was already held.
  pub fn try_acquire(&self, key: &str) -> bool {
    self.0.lock().insert(key.to_owned())
  }

  pub fn release(&self, key: &str) {
    self.0.lock().remove(key);
  }

  /// Acquires `key` for the lifetime of the returned guard.
  pub fn lock(&self, key: &str) -> Option<OperationGuard> {
    if self.try_acquire(key) {
      Some(OperationGuard {
        locks: self.clone(),
        key: key.to_owned(),
      })
    } else {
      None
    }
  }

  #[cfg(test)]
  fn is_held(&self, key: &str) -> bool {
    self.0.lock().contains(key)
  }
}

#[must_use = "the key is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OperationGuard {
  locks: OperationLocks,
  key: String,
}

impl Drop for OperationGuard {
  fn drop(&mut self) {
    self.locks.release(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_acquire_fails() {
    let locks = OperationLocks::new();
    assert!(locks.try_acquire("vol"));
    assert!(!locks.try_acquire("vol"));
    assert!(locks.try_acquire("other"));

    locks.release("vol");
    assert!(locks.try_acquire("vol"));
  }

  #[test]
  fn guard_releases_on_drop() {
    let locks = OperationLocks::new();
    {
      let _guard = locks.lock("vol").unwrap();
      assert!(locks.is_held("vol"));
      assert!(locks.lock("vol").is_none());
    }

    assert!(!locks.is_held("vol"));
    assert!(locks.lock("vol").is_some());
  }

  #[test]
  fn guard_releases_on_early_return() {
    fn fails(locks: &OperationLocks) -> Result<(), ()> {
      let _guard = locks.lock("vol").ok_or(())?;
      Err(())
    }

    let locks = OperationLocks::new();
    assert!(fails(&locks).is_err());
    assert!(!locks.is_held("vol"));
  }

  #[test]
  fn clones_share_state() {
    let locks = OperationLocks::new();
    let other = locks.clone();
    let _guard = locks.lock("vol").unwrap();
    assert!(!other.try_acquire("vol"));
  }

  #[test]
  fn concurrent_acquire_has_one_winner() {
    let locks = OperationLocks::new();
    let winners: usize = (0..8)
      .map(|_| {
        let locks = locks.clone();
        std::thread::spawn(move || locks.try_acquire("vol") as usize)
      })
      .collect::<Vec<_>>()
      .into_iter()
      .map(|h| h.join().unwrap())
      .sum();

    assert_eq!(winners, 1);
  }
}
