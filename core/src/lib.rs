//! In-memory inverted index with term-frequency ranked search, plus the
//! locking and task-queue primitives used to build and query it from many
//! threads.

pub mod builder;
pub mod concurrent;
pub mod error;
pub mod index;
pub mod lock;
pub mod persist;
pub mod query;
pub mod queue;
pub mod result;
pub mod tokenizer;
pub mod traverse;

use std::collections::BTreeSet;

pub use concurrent::ConcurrentInvertedIndex;
pub use error::IndexError;
pub use index::InvertedIndex;
pub use lock::SharedLock;
pub use query::{QueryFileHandler, QueryHandler, ThreadedQueryHandler};
pub use queue::{Spawner, TaskQueue};
pub use result::SearchResult;

/// A cleaned, stemmed word.
pub type Term = String;
/// A file path or URL terms were found under.
pub type Location = String;

/// Ranked lookups shared by the plain and the thread-safe index.
pub trait SearchIndex {
    fn exact_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult>;
    fn partial_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult>;

    fn search(&self, terms: &BTreeSet<Term>, exact: bool) -> Vec<SearchResult> {
        if exact { self.exact_search(terms) } else { self.partial_search(terms) }
    }
}

impl SearchIndex for InvertedIndex {
    fn exact_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        InvertedIndex::exact_search(self, terms)
    }

    fn partial_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        InvertedIndex::partial_search(self, terms)
    }
}
