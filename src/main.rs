//! skein command-line entry point

use clap::Parser;
use skein::config::{parse_names_window, parse_page_ranges, read_seed_file, Config};
use skein::Coordinator;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// skein: a concurrent web spider
///
/// Fetches the given URLs, optionally recurses into discovered links, and
/// extracts regex matches, e-mail addresses, and downloaded pages.
#[derive(Parser, Debug)]
#[command(name = "skein")]
#[command(version)]
#[command(about = "A concurrent web spider", long_about = None)]
struct Cli {
    /// Seed URLs; may contain the literal {page} template
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Read newline-delimited seed URLs from a file (repeatable)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Recurse into links discovered on fetched pages
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Maximum recursion depth
    #[arg(short = 'd', long, value_name = "N", default_value_t = 3)]
    max_depth: u32,

    /// Retries after a transport failure
    #[arg(short = 'm', long, value_name = "N", default_value_t = 0)]
    max_retries: u32,

    /// Integer ranges the {page} template expands to, e.g. "1-2,5,6-10" (repeatable)
    #[arg(short = 'p', long = "pages", value_name = "RANGES")]
    pages: Vec<String>,

    /// Proxy URL applied to both http and https requests
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Fixed User-Agent header (default: random pick per run)
    #[arg(short = 'A', long, value_name = "STRING")]
    user_agent: Option<String>,

    /// Newline-delimited user-agent list to pick from
    #[arg(long, value_name = "FILE")]
    user_agents_file: Option<PathBuf>,

    /// Maximum concurrent fetches
    #[arg(short = 't', long, value_name = "N", default_value_t = 10)]
    max_threads: usize,

    /// Stop the crawl softly when this pattern matches a page body
    #[arg(short = 's', long, value_name = "REGEX")]
    stop_pattern: Option<String>,

    /// Stop the crawl softly on the first HTTP 404
    #[arg(long)]
    stop_on_404: bool,

    /// Re-enqueue URLs answered with a Cloudflare challenge page
    #[arg(long)]
    requeue_cloudflare: bool,

    /// Only recurse into paths matching this pattern (repeatable)
    #[arg(long = "recurse-pattern", value_name = "REGEX")]
    recurse_patterns: Vec<String>,

    /// Never recurse into paths matching this pattern (repeatable)
    #[arg(long = "recurse-ignore-pattern", value_name = "REGEX")]
    recurse_ignore_patterns: Vec<String>,

    /// Follow links to any host
    #[arg(long)]
    cross_domains: bool,

    /// Additional allowed host (exact or *.wildcard, repeatable)
    #[arg(long = "domains", value_name = "HOST")]
    domains: Vec<String>,

    /// Only descend into paths below each page's own path
    #[arg(short = 'n', long)]
    no_parent: bool,

    /// Traverse depth-first instead of breadth-first
    #[arg(long)]
    depth_first: bool,

    /// Download only URLs with this path extension (repeatable)
    #[arg(long = "download-extension", value_name = "EXT")]
    download_extensions: Vec<String>,

    /// Download only URLs whose path matches this pattern (repeatable)
    #[arg(long = "download-regex", value_name = "REGEX")]
    download_regexes: Vec<String>,

    /// Download only URLs whose path starts with this prefix (repeatable)
    #[arg(long = "download-within", value_name = "PREFIX")]
    download_within: Vec<String>,

    /// Report matches of this pattern with their URL and line (repeatable)
    #[arg(long = "search-regex", value_name = "REGEX")]
    search_regexes: Vec<String>,

    /// Report e-mail addresses found in pages
    #[arg(long)]
    search_emails: bool,

    /// Report mailto:-prefixed e-mail addresses found in pages
    #[arg(long)]
    search_mailtos: bool,

    /// Pattern locating a human name near each e-mail address
    #[arg(long, value_name = "REGEX")]
    email_names: Option<String>,

    /// Line window searched for names, relative to the address line: "start [end]"
    #[arg(long, value_name = "\"START [END]\"", allow_hyphen_values = true)]
    email_names_lines: Option<String>,

    /// Root directory for mirrored page downloads
    #[arg(short = 'o', long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// File receiving one fetched URL per line
    #[arg(long, value_name = "FILE")]
    out_urls: Option<PathBuf>,

    /// File receiving e-mail records (default: stdout)
    #[arg(long, value_name = "FILE")]
    out_emails: Option<PathBuf>,

    /// File receiving regex-match records (default: stdout)
    #[arg(long, value_name = "FILE")]
    out_regex: Option<PathBuf>,

    /// Write the log to a file instead of stderr
    #[arg(long, value_name = "FILE")]
    out_log: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'D', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.debug, cli.out_log.as_deref())?;

    let config = build_config(cli)?;

    let mut coordinator = match Coordinator::new(config) {
        Ok(coordinator) => coordinator,
        Err(err) => {
            tracing::error!("{}", err);
            return Err(err.into());
        }
    };

    coordinator.run().await?;
    Ok(())
}

/// Sets up the tracing subscriber
///
/// `-D/--debug` raises the filter to debug level; `--out-log` redirects the
/// stream to a file without ANSI escapes.
fn setup_logging(debug: bool, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if debug {
        EnvFilter::new("skein=debug,info")
    } else {
        EnvFilter::new("skein=info,warn")
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}

/// Assembles the run configuration from the parsed command line
fn build_config(cli: Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();

    config.seeds = cli.urls;
    for file in &cli.files {
        config.seeds.extend(read_seed_file(file)?);
    }

    config.pages = parse_page_ranges(&cli.pages)?;

    config.scope.recurse = cli.recurse;
    config.scope.max_depth = cli.max_depth;
    config.scope.depth_first = cli.depth_first;
    config.scope.cross_domains = cli.cross_domains;
    config.scope.domains = cli.domains;
    config.scope.no_parent = cli.no_parent;
    config.scope.recurse_patterns = cli.recurse_patterns;
    config.scope.recurse_ignore_patterns = cli.recurse_ignore_patterns;

    config.network.max_retries = cli.max_retries;
    config.network.proxy = cli.proxy;
    config.network.user_agent = cli.user_agent;
    config.network.user_agents_file = cli.user_agents_file;
    config.network.max_threads = cli.max_threads;

    config.stop.stop_pattern = cli.stop_pattern;
    config.stop.stop_on_404 = cli.stop_on_404;
    config.stop.requeue_cloudflare = cli.requeue_cloudflare;

    config.search.search_regexes = cli.search_regexes;
    config.search.search_emails = cli.search_emails;
    config.search.search_mailtos = cli.search_mailtos;
    config.search.email_names = cli.email_names;
    config.search.email_names_lines = cli
        .email_names_lines
        .as_deref()
        .map(parse_names_window)
        .transpose()?;

    config.download.extensions = cli.download_extensions;
    config.download.regexes = cli.download_regexes;
    config.download.within = cli.download_within;

    config.output.out_dir = cli.out_dir;
    config.output.out_urls = cli.out_urls;
    config.output.out_emails = cli.out_emails;
    config.output.out_regex = cli.out_regex;

    Ok(config)
}
