use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;
use crate::index::InvertedIndex;
use crate::lock::{ReadGuard, SharedLock};
use crate::persist;
use crate::result::SearchResult;
use crate::{Location, SearchIndex, Term};

/// Thread-safe inverted index. Mutations take the write side of a
/// [`SharedLock`]; lookups, searches and serialization take the read side.
#[derive(Debug, Default)]
pub struct ConcurrentInvertedIndex {
    inner: SharedLock<InvertedIndex>,
}

impl ConcurrentInvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn add(&self, term: &str, location: &str, position: usize) {
        self.inner.write().add(term, location, position);
    }

    /// One lock acquisition for the whole run of terms.
    pub fn add_all<S: AsRef<str>>(&self, terms: &[S], location: &str, start: usize) -> usize {
        self.inner.write().add_all(terms, location, start)
    }

    /// Folds a privately built index in under a single write lock.
    pub fn merge(&self, other: InvertedIndex) {
        self.inner.write().merge(other);
    }

    /// Holds the read lock for as long as the guard lives.
    pub fn read(&self) -> ReadGuard<'_, InvertedIndex> {
        self.inner.read()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.inner.read().contains(term)
    }

    pub fn contains_location(&self, term: &str, location: &str) -> bool {
        self.inner.read().contains_location(term, location)
    }

    pub fn contains_position(&self, term: &str, location: &str, position: usize) -> bool {
        self.inner.read().contains_position(term, location, position)
    }

    pub fn words(&self) -> Vec<Term> {
        self.inner.read().words().map(str::to_string).collect()
    }

    pub fn locations(&self, term: &str) -> Vec<Location> {
        self.inner.read().locations(term).map(str::to_string).collect()
    }

    pub fn positions(&self, term: &str, location: &str) -> BTreeSet<usize> {
        self.inner.read().positions(term, location).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn counts(&self) -> BTreeMap<Location, usize> {
        self.inner.read().counts().clone()
    }

    pub fn count(&self, location: &str) -> usize {
        self.inner.read().count(location)
    }

    pub fn write_index(&self, path: &Path) -> Result<()> {
        persist::save_index(path, &self.inner.read())
    }

    pub fn write_counts(&self, path: &Path) -> Result<()> {
        persist::save_counts(path, &self.inner.read())
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl From<InvertedIndex> for ConcurrentInvertedIndex {
    fn from(index: InvertedIndex) -> Self {
        Self { inner: SharedLock::new(index) }
    }
}

impl SearchIndex for ConcurrentInvertedIndex {
    fn exact_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        self.inner.read().exact_search(terms)
    }

    fn partial_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        self.inner.read().partial_search(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_are_all_recorded() {
        let index = Arc::new(ConcurrentInvertedIndex::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    let location = format!("file{t}.txt");
                    for p in 1..=250 {
                        index.add("word", &location, p);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(index.locations("word").len(), 4);
        assert_eq!(index.positions("word", "file2.txt").len(), 250);
        assert_eq!(index.count("file3.txt"), 250);
    }

    #[test]
    fn merge_combines_private_indexes() {
        let index = ConcurrentInvertedIndex::new();
        index.add("cat", "a.txt", 1);

        let mut local = InvertedIndex::new();
        local.add_all(&["cat", "hat"], "a.txt", 2);
        local.add("cat", "b.txt", 1);
        index.merge(local);

        assert_eq!(index.positions("cat", "a.txt"), BTreeSet::from([1, 2]));
        assert_eq!(index.count("a.txt"), 3);
        assert_eq!(index.count("b.txt"), 1);
        assert!(index.contains("hat"));
    }

    #[test]
    fn search_goes_through_the_read_lock() {
        let index = ConcurrentInvertedIndex::new();
        index.add_all(&["the", "cat", "sat"], "a.txt", 1);
        let guard = index.read();
        // a second reader is admitted while the first guard is alive
        let results = index.exact_search(&BTreeSet::from(["cat".to_string()]));
        assert_eq!(results.len(), 1);
        assert_eq!(guard.len(), 3);
    }
}
