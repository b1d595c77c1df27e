//! Bounded parallel web crawler feeding a shared inverted index.

pub mod crawl;
pub mod error;
pub mod fetch;
pub mod html;

pub use crawl::{CrawlSummary, WebCrawler};
pub use error::CrawlError;
pub use fetch::{Fetcher, HttpFetcher, StaticFetcher};
