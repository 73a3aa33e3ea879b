//! Primary-key index shared by all documents of a run.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Set of known `pk`s with atomic insert-if-absent, safe to share across workers.
#[derive(Debug, Default)]
pub struct DedupIndex {
    keys: Mutex<HashSet<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<String>> {
        // Inserts are single calls, so a poisoned set is still consistent.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns true if `pk` was not known before this call.
    pub fn insert_if_absent(&self, pk: &str) -> bool {
        let mut keys = self.keys();
        if keys.contains(pk) {
            return false;
        }
        keys.insert(pk.to_string())
    }

    pub fn contains(&self, pk: &str) -> bool {
        self.keys().contains(pk)
    }

    pub fn seed<I>(&self, pks: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.keys().extend(pks);
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_insert_if_absent() {
        let index = DedupIndex::new();
        assert!(index.insert_if_absent("a"));
        assert!(!index.insert_if_absent("a"));
        assert!(index.contains("a"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_seed() {
        let index = DedupIndex::new();
        index.seed(vec!["x".to_string(), "y".to_string()]);
        assert!(!index.insert_if_absent("x"));
        assert!(index.insert_if_absent("z"));
    }

    #[test]
    fn test_concurrent_inserts_admit_each_key_once() {
        let index = Arc::new(DedupIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || (0..100).filter(|i| index.insert_if_absent(&i.to_string())).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(index.len(), 100);
    }
}
