//! Crawler module: the crawl engine
//!
//! This module contains the core of the spider:
//! - the URL frontier and seen set
//! - HTTP fetching with retry and response classification
//! - HTML parsing, content scans, and charset handling
//! - the coordinator driving the bounded worker pool

mod analyzer;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use analyzer::{decode_body, email_records, regex_matches};
pub use coordinator::{Coordinator, StopFlags};
pub use fetcher::{
    build_http_client, FetchOutcome, FetchedPage, Fetcher, BINARY_EXTENSIONS,
    CLOUDFLARE_CHALLENGE_TITLE,
};
pub use frontier::{Frontier, FrontierItem};
pub use parser::{candidate_links, page_title};
