//! Per-configuration serialization of remote update application.
//!
//! Parameter resolution is free of ordering constraints, but two in-process
//! runs must not race writes against the same remote configuration's
//! parameter set. The lock table is keyed by configuration id.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, OnceLock, PoisonError};

static REGISTRY: OnceLock<(Mutex<HashSet<String>>, Condvar)> = OnceLock::new();

fn registry() -> &'static (Mutex<HashSet<String>>, Condvar) {
    REGISTRY.get_or_init(|| (Mutex::new(HashSet::new()), Condvar::new()))
}

/// Guard serializing update application per remote configuration id.
/// Released on drop.
pub struct ConfigLock {
    key: String,
}

impl ConfigLock {
    /// Block until the configuration id is free, then hold it.
    pub fn acquire(configuration_id: &str) -> Self {
        let (lock, cvar) = registry();
        let mut held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(configuration_id) {
            held = cvar.wait(held).unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(configuration_id.to_owned());
        Self {
            key: configuration_id.to_owned(),
        }
    }

    /// Hold the configuration id if free, `None` otherwise.
    pub fn try_acquire(configuration_id: &str) -> Option<Self> {
        let (lock, _) = registry();
        let mut held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if held.contains(configuration_id) {
            return None;
        }
        held.insert(configuration_id.to_owned());
        Some(Self {
            key: configuration_id.to_owned(),
        })
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        let (lock, cvar) = registry();
        lock.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_excludes_second_holder() {
        let first = ConfigLock::acquire("conf_lock_test_1");
        assert!(ConfigLock::try_acquire("conf_lock_test_1").is_none());
        drop(first);
        assert!(ConfigLock::try_acquire("conf_lock_test_1").is_some());
    }

    #[test]
    fn different_ids_do_not_block_each_other() {
        let _a = ConfigLock::acquire("conf_lock_test_2a");
        assert!(ConfigLock::try_acquire("conf_lock_test_2b").is_some());
    }

    #[test]
    fn acquire_blocks_until_release() {
        let held = ConfigLock::acquire("conf_lock_test_3");
        let handle = std::thread::spawn(|| {
            let _g = ConfigLock::acquire("conf_lock_test_3");
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!handle.is_finished());
        drop(held);
        handle.join().unwrap();
    }
}
