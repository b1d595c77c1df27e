use anyhow::Result;
use clap::Parser;
use crawler::{HttpFetcher, WebCrawler};
use server::{AppState, Queries};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use wordindex::builder::{build, build_concurrent};
use wordindex::persist::{save_counts, save_index};
use wordindex::queue::DEFAULT_THREADS;
use wordindex::traverse::text_files;
use wordindex::{ConcurrentInvertedIndex, InvertedIndex, QueryFileHandler, QueryHandler, TaskQueue, ThreadedQueryHandler};

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Build a stemmed inverted index from text files or a web crawl and search it", long_about = None)]
struct Cli {
    /// Text file or directory of .txt/.text files to index
    #[arg(long)]
    text: Option<PathBuf>,
    /// Seed url to crawl and index
    #[arg(long)]
    html: Option<String>,
    /// Maximum number of pages to crawl, seed included
    #[arg(long, default_value_t = 1)]
    max: usize,
    /// Build and search on a worker pool
    #[arg(long, num_args = 0..=1, default_missing_value = "5")]
    threads: Option<usize>,
    /// File of search queries, one per line
    #[arg(long)]
    query: Option<PathBuf>,
    /// Prefix search instead of exact search
    #[arg(long, default_value_t = false)]
    partial: bool,
    /// Write the inverted index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,
    /// Write per-location token counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
    counts: Option<PathBuf>,
    /// Write search results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,
    /// Serve the index over HTTP on this port once built
    #[arg(long, num_args = 0..=1, default_missing_value = "8080")]
    port: Option<u16>,
}

impl Cli {
    /// A crawl always runs on the pool, and so does serving, which shares the
    /// pooled query handler.
    fn threaded(&self) -> bool {
        self.threads.is_some() || self.html.is_some() || self.port.is_some()
    }

    fn worker_count(&self) -> usize {
        self.threads.filter(|&n| n > 0).unwrap_or(DEFAULT_THREADS)
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let start = Instant::now();

    if !cli.threaded() {
        let words = run_single(&cli);
        report_elapsed(start, words);
        return Ok(());
    }

    let queue = TaskQueue::new(cli.worker_count());
    let queries = run_threaded(&cli, &queue);
    report_elapsed(start, queries.index().len());

    if let Some(port) = cli.port {
        // the crawl's blocking http client is gone by now, so a runtime is safe to start
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let state = AppState::new(Arc::new(queries), !cli.partial);
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        if let Err(err) = runtime.block_on(server::serve(state, addr)) {
            tracing::error!(error = ?err, %addr, "server stopped");
        }
    }
    queue.stop_and_wait();
    Ok(())
}

fn report_elapsed(start: Instant, words: usize) {
    let elapsed = start.elapsed().as_secs_f64();
    tracing::info!(elapsed_s = elapsed, words, "all work complete");
    println!("Elapsed: {elapsed:.6} seconds");
}

/// Returns the number of distinct words indexed.
fn run_single(cli: &Cli) -> usize {
    let mut index = InvertedIndex::new();
    if let Some(path) = &cli.text {
        match text_files(path) {
            Ok(files) => {
                build(&files, &mut index);
            }
            Err(err) => tracing::error!(error = ?err, "unable to list text files"),
        }
    }
    write_output("counts", cli.counts.as_deref(), |p| save_counts(p, &index));
    write_output("index", cli.index.as_deref(), |p| save_index(p, &index));

    let mut handler = QueryFileHandler::new(&index);
    run_queries(&mut handler, cli);
    index.len()
}

fn run_threaded(cli: &Cli, queue: &TaskQueue) -> Queries {
    let index = Arc::new(ConcurrentInvertedIndex::new());

    if let Some(path) = &cli.text {
        match text_files(path) {
            Ok(files) => build_concurrent(&files, &index, queue),
            Err(err) => tracing::error!(error = ?err, "unable to list text files"),
        }
    }
    if let Some(seed) = &cli.html {
        crawl(seed, cli.max, &index, queue);
    }
    write_output("counts", cli.counts.as_deref(), |p| index.write_counts(p));
    write_output("index", cli.index.as_deref(), |p| index.write_index(p));

    let mut handler = ThreadedQueryHandler::new(index, queue.spawner());
    run_queries(&mut handler, cli);
    handler
}

fn crawl(seed: &str, max_pages: usize, index: &Arc<ConcurrentInvertedIndex>, queue: &TaskQueue) {
    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(err) => {
            tracing::error!(error = ?err, "unable to start crawler");
            return;
        }
    };
    let crawler = WebCrawler::new(Arc::clone(index), fetcher);
    if let Err(err) = crawler.crawl(seed, max_pages, queue) {
        tracing::error!(error = ?err, seed, "crawl failed");
    }
}

fn run_queries(handler: &mut impl QueryHandler, cli: &Cli) {
    if let Some(path) = &cli.query {
        if let Err(err) = handler.submit_file(path, !cli.partial) {
            tracing::error!(error = ?err, "unable to search queries");
        }
    }
    write_output("results", cli.results.as_deref(), |p| handler.write_results(p));
}

fn write_output<F>(what: &str, path: Option<&Path>, write: F)
where
    F: FnOnce(&Path) -> wordindex::error::Result<()>,
{
    let Some(path) = path else { return };
    match write(path) {
        Ok(()) => tracing::info!(what, path = %path.display(), "wrote output"),
        Err(err) => tracing::error!(error = ?err, what, "unable to write output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("indexer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn outputs_default_only_when_flag_present() {
        let cli = parse(&["--text", "input", "--index", "--results", "out.json"]);
        assert_eq!(cli.index.as_deref(), Some(Path::new("index.json")));
        assert_eq!(cli.results.as_deref(), Some(Path::new("out.json")));
        assert_eq!(cli.counts, None);
        assert_eq!(cli.port, None);
        assert!(!cli.threaded());
    }

    #[test]
    fn threads_default_and_invalid_counts() {
        let cli = parse(&["--threads"]);
        assert!(cli.threaded());
        assert_eq!(cli.worker_count(), 5);
        assert_eq!(parse(&["--threads", "0"]).worker_count(), DEFAULT_THREADS);
        assert_eq!(parse(&["--threads", "3"]).worker_count(), 3);
    }

    #[test]
    fn crawling_implies_threads() {
        let cli = parse(&["--html", "https://example.com/", "--max", "20", "--port"]);
        assert!(cli.threaded());
        assert!(parse(&["--text", "input", "--port", "9000"]).threaded());
        assert_eq!(cli.max, 20);
        assert_eq!(cli.port, Some(8080));
        assert!(!cli.partial);
    }
}
