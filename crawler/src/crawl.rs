use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use url::Url;
use wordindex::tokenizer::{english_stemmer, stem_line};
use wordindex::{ConcurrentInvertedIndex, Spawner, TaskQueue};

use crate::error::CrawlError;
use crate::fetch::Fetcher;
use crate::html::{extract_title, find_links, is_http, normalize, strip_block_elements, strip_entities, strip_tags};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Urls reserved for crawling, seed included.
    pub visited: usize,
    /// Pages that were fetched and indexed.
    pub indexed: usize,
}

/// Pages left to schedule (seed included) and every url scheduled so far.
/// Both only change together, under one lock.
#[derive(Debug)]
struct CrawlBudget {
    remaining: usize,
    visited: HashSet<Url>,
}

impl CrawlBudget {
    fn new(seed: Url, max_pages: usize) -> Self {
        Self { remaining: max_pages, visited: HashSet::from([seed]) }
    }

    /// Claims unseen links while more than one page of budget is left.
    fn reserve(&mut self, links: Vec<Url>) -> Vec<Url> {
        let mut reserved = Vec::new();
        for link in links {
            if self.remaining <= 1 {
                break;
            }
            if self.visited.insert(link.clone()) {
                self.remaining -= 1;
                reserved.push(link);
            }
        }
        reserved
    }
}

/// State of one crawl, shared by every task it spawns.
struct Crawl<F> {
    budget: Mutex<CrawlBudget>,
    index: Arc<ConcurrentInvertedIndex>,
    fetcher: Arc<F>,
    spawner: Spawner,
    indexed: AtomicUsize,
}

impl<F: Fetcher> Crawl<F> {
    fn crawl_one(self: &Arc<Self>, url: &Url) {
        let Some(html) = self.fetcher.fetch(url) else {
            tracing::debug!(%url, "nothing to index");
            return;
        };
        let title = tracing::enabled!(Level::DEBUG).then(|| extract_title(&html)).flatten();
        let html = strip_block_elements(&html);

        let links = find_links(url, &html);
        let reserved = self.budget.lock().reserve(links);
        for link in reserved {
            let crawl = Arc::clone(self);
            self.spawner.submit(move || {
                crawl.crawl_one(&link);
                Ok(())
            });
        }

        let text = strip_entities(&strip_tags(&html));
        let stems = stem_line(&text, &english_stemmer());
        self.index.add_all(&stems, url.as_str(), 1);
        self.indexed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%url, title = title.as_deref().unwrap_or(""), stems = stems.len(), "indexed page");
    }
}

/// Breadth of a crawl is bounded by its page budget; every page it reaches
/// is indexed into the shared index.
pub struct WebCrawler<F> {
    index: Arc<ConcurrentInvertedIndex>,
    fetcher: Arc<F>,
}

impl<F: Fetcher> WebCrawler<F> {
    pub fn new(index: Arc<ConcurrentInvertedIndex>, fetcher: F) -> Self {
        Self { index, fetcher: Arc::new(fetcher) }
    }

    /// Crawls from `seed` visiting at most `max_pages` distinct urls, the
    /// seed included. The seed page is processed on the calling thread; the
    /// rest fan out on `queue`. Returns once every spawned page is done.
    ///
    /// Must not be called from a worker of `queue`.
    pub fn crawl(&self, seed: &str, max_pages: usize, queue: &TaskQueue) -> Result<CrawlSummary, CrawlError> {
        let url = Url::parse(seed.trim())
            .map_err(|source| CrawlError::InvalidSeed { seed: seed.to_string(), source })?;
        if !is_http(&url) {
            return Err(CrawlError::UnsupportedScheme(seed.to_string()));
        }
        if max_pages == 0 {
            return Ok(CrawlSummary::default());
        }
        let url = normalize(url);

        let crawl = Arc::new(Crawl {
            budget: Mutex::new(CrawlBudget::new(url.clone(), max_pages)),
            index: Arc::clone(&self.index),
            fetcher: Arc::clone(&self.fetcher),
            spawner: queue.spawner(),
            indexed: AtomicUsize::new(0),
        });
        crawl.crawl_one(&url);
        queue.await_idle();

        let summary = CrawlSummary {
            visited: crawl.budget.lock().visited.len(),
            indexed: crawl.indexed.load(Ordering::Relaxed),
        };
        tracing::info!(seed = %url, visited = summary.visited, indexed = summary.indexed, "crawl complete");
        Ok(summary)
    }
}
