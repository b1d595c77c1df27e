use parking_lot::Mutex;
use rust_stemmers::Stemmer;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::{IndexError, Result};
use crate::persist;
use crate::queue::Spawner;
use crate::result::SearchResult;
use crate::tokenizer::{english_stemmer, unique_stems};
use crate::{SearchIndex, Term};

/// A query line reduced to its sorted unique stems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub terms: BTreeSet<Term>,
    /// Stems joined by single spaces; the cache key.
    pub key: String,
}

/// `None` when the line has no stems left after cleaning.
pub fn normalize(line: &str, stemmer: &Stemmer) -> Option<Query> {
    let terms = unique_stems(line, stemmer);
    if terms.is_empty() {
        return None;
    }
    let key = terms.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    Some(Query { terms, key })
}

/// Runs query lines against an index and keeps the ranked results per
/// normalized query. A query seen twice is only searched once.
pub trait QueryHandler {
    fn submit_line(&mut self, line: &str, exact: bool);

    /// Submits every line of `path`.
    fn submit_file(&mut self, path: &Path, exact: bool) -> Result<()>;

    /// Normalized keys of every finished query, sorted.
    fn all_queries(&self) -> Vec<String>;

    /// Results for `line` after normalizing it the same way submissions are.
    fn results_for(&self, line: &str) -> Vec<SearchResult>;

    fn write_results(&self, path: &Path) -> Result<()>;
}

/// Calls `f` with every line of `path`. A line that is not valid UTF-8 is
/// logged and skipped; any other read failure stops with an error.
fn for_each_line(path: &Path, mut f: impl FnMut(&str)) -> Result<()> {
    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
    for (number, bytes) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = bytes.map_err(|e| IndexError::io(path, e))?;
        match std::str::from_utf8(&bytes) {
            Ok(line) => f(line),
            Err(err) => tracing::warn!(
                path = %path.display(),
                line = number + 1,
                error = %err,
                "skipping query line that is not utf-8"
            ),
        }
    }
    Ok(())
}

/// Searches inline on the calling thread.
pub struct QueryFileHandler<'a, I: SearchIndex + ?Sized> {
    index: &'a I,
    results: BTreeMap<String, Vec<SearchResult>>,
    stemmer: Stemmer,
}

impl<'a, I: SearchIndex + ?Sized> QueryFileHandler<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index, results: BTreeMap::new(), stemmer: english_stemmer() }
    }
}

impl<I: SearchIndex + ?Sized> QueryHandler for QueryFileHandler<'_, I> {
    fn submit_line(&mut self, line: &str, exact: bool) {
        let Some(query) = normalize(line, &self.stemmer) else { return };
        if self.results.contains_key(&query.key) {
            return;
        }
        let results = self.index.search(&query.terms, exact);
        self.results.insert(query.key, results);
    }

    fn submit_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        for_each_line(path, |line| self.submit_line(line, exact))
    }

    fn all_queries(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    fn results_for(&self, line: &str) -> Vec<SearchResult> {
        normalize(line, &self.stemmer)
            .and_then(|q| self.results.get(&q.key).cloned())
            .unwrap_or_default()
    }

    fn write_results(&self, path: &Path) -> Result<()> {
        persist::save_results(path, &self.results)
    }
}

#[derive(Debug, Default)]
struct QueryCache {
    results: BTreeMap<String, Vec<SearchResult>>,
    /// Keys some task is searching right now.
    searching: HashSet<String>,
}

enum Claim {
    Cached(Vec<SearchResult>),
    Claimed,
    Busy,
}

impl QueryCache {
    fn claim(&mut self, key: &str) -> Claim {
        if let Some(results) = self.results.get(key) {
            Claim::Cached(results.clone())
        } else if self.searching.insert(key.to_string()) {
            Claim::Claimed
        } else {
            Claim::Busy
        }
    }

    fn fill(&mut self, key: String, results: Vec<SearchResult>) {
        self.searching.remove(&key);
        self.results.insert(key, results);
    }
}

/// A claimed key. Dropping it unfilled, say because the search panicked,
/// releases the key so a later submission searches it again.
struct ClaimGuard<'a> {
    cache: &'a Mutex<QueryCache>,
    key: Option<String>,
}

impl<'a> ClaimGuard<'a> {
    fn new(cache: &'a Mutex<QueryCache>, key: String) -> Self {
        Self { cache, key: Some(key) }
    }

    fn fill(mut self, results: Vec<SearchResult>) {
        if let Some(key) = self.key.take() {
            self.cache.lock().fill(key, results);
        }
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.cache.lock().searching.remove(&key);
        }
    }
}

/// Searches on a [`TaskQueue`](crate::queue::TaskQueue). The existence check
/// and the claim on a key happen under one lock, so concurrent submissions of
/// the same query search it once.
pub struct ThreadedQueryHandler<I> {
    index: Arc<I>,
    cache: Arc<Mutex<QueryCache>>,
    spawner: Spawner,
}

impl<I: SearchIndex + Send + Sync + 'static> ThreadedQueryHandler<I> {
    pub fn new(index: Arc<I>, spawner: Spawner) -> Self {
        Self { index, cache: Arc::new(Mutex::new(QueryCache::default())), spawner }
    }

    /// Queues the search of one line and returns immediately.
    pub fn submit_line(&self, line: &str, exact: bool) {
        let index = Arc::clone(&self.index);
        let cache = Arc::clone(&self.cache);
        let line = line.to_string();
        self.spawner.submit(move || {
            let Some(query) = normalize(&line, &english_stemmer()) else { return Ok(()) };
            let claim = cache.lock().claim(&query.key);
            if let Claim::Claimed = claim {
                let guard = ClaimGuard::new(&cache, query.key);
                guard.fill(index.search(&query.terms, exact));
            }
            Ok(())
        });
    }

    /// One task per non-blank line, then waits for all of them.
    pub fn submit_file(&self, path: &Path, exact: bool) -> Result<()> {
        let submitted = self.submit_lines(path, exact);
        self.spawner.await_idle();
        let submitted = submitted?;
        tracing::info!(path = %path.display(), submitted, "query file processed");
        Ok(())
    }

    fn submit_lines(&self, path: &Path, exact: bool) -> Result<usize> {
        let mut submitted = 0;
        for_each_line(path, |line| {
            if !line.trim().is_empty() {
                self.submit_line(line, exact);
                submitted += 1;
            }
        })?;
        Ok(submitted)
    }

    /// Searches `line` on the calling thread, or returns the cached results.
    /// Results are cached unless another task is already searching the same
    /// query.
    pub fn search_line(&self, line: &str, exact: bool) -> Vec<SearchResult> {
        let Some(query) = normalize(line, &english_stemmer()) else { return Vec::new() };
        let claim = self.cache.lock().claim(&query.key);
        match claim {
            Claim::Cached(results) => results,
            Claim::Claimed => {
                let guard = ClaimGuard::new(&self.cache, query.key);
                let results = self.index.search(&query.terms, exact);
                guard.fill(results.clone());
                results
            }
            Claim::Busy => self.index.search(&query.terms, exact),
        }
    }

    pub fn all_queries(&self) -> Vec<String> {
        self.cache.lock().results.keys().cloned().collect()
    }

    pub fn results_for(&self, line: &str) -> Vec<SearchResult> {
        normalize(line, &english_stemmer())
            .and_then(|q| self.cache.lock().results.get(&q.key).cloned())
            .unwrap_or_default()
    }

    pub fn write_results(&self, path: &Path) -> Result<()> {
        persist::save_results(path, &self.cache.lock().results)
    }

    pub fn index(&self) -> &Arc<I> {
        &self.index
    }
}

impl<I: SearchIndex + Send + Sync + 'static> QueryHandler for ThreadedQueryHandler<I> {
    fn submit_line(&mut self, line: &str, exact: bool) {
        ThreadedQueryHandler::submit_line(self, line, exact);
    }

    fn submit_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        ThreadedQueryHandler::submit_file(self, path, exact)
    }

    fn all_queries(&self) -> Vec<String> {
        ThreadedQueryHandler::all_queries(self)
    }

    fn results_for(&self, line: &str) -> Vec<SearchResult> {
        ThreadedQueryHandler::results_for(self, line)
    }

    fn write_results(&self, path: &Path) -> Result<()> {
        ThreadedQueryHandler::write_results(self, path)
    }
}
