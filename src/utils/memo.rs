// src/utils/memo.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use log::debug;

/// Results of an expensive step keyed by its input. Only successes are kept and
/// nothing is ever evicted.
pub struct Memo<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Memo {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns the cached value, or runs `compute` and caches its success.
    /// The lock is not held while `compute` runs.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            debug!("{}: cache hit", self.name);
            return Ok(value);
        }

        let value = compute()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_once_per_key() {
        let memo: Memo<&str, u32> = Memo::new("test");
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, String>(7)
        };

        assert_eq!(memo.get_or_try_insert_with("a", compute), Ok(7));
        assert_eq!(memo.get_or_try_insert_with("a", compute), Ok(7));
        assert_eq!(calls.get(), 1);

        assert_eq!(memo.get_or_try_insert_with("b", compute), Ok(7));
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let memo: Memo<u8, u8> = Memo::new("test");
        assert_eq!(
            memo.get_or_try_insert_with(1, || Err::<u8, _>("down")),
            Err("down")
        );
        assert!(memo.is_empty());
        assert_eq!(memo.get_or_try_insert_with(1, || Ok::<_, &str>(3)), Ok(3));
        assert_eq!(memo.get(&1), Some(3));
    }
}
