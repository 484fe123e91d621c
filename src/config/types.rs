use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for a crawl run
///
/// Assembled from the command line at startup and immutable for the run.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Seed URLs, possibly containing the `{page}` template
    pub seeds: Vec<String>,

    /// Integers the `{page}` template expands against
    pub pages: Vec<u64>,

    pub scope: ScopeConfig,
    pub network: NetworkConfig,
    pub stop: StopConfig,
    pub search: SearchConfig,
    pub download: DownloadConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Remaining depth assigned to seed URLs
    ///
    /// Without `--recurse` every seed is fetched but never recursed into.
    pub fn initial_depth(&self) -> u32 {
        if self.scope.recurse {
            self.scope.max_depth
        } else {
            0
        }
    }
}

/// Recursion scope configuration
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Whether discovered links are followed at all
    pub recurse: bool,

    /// Maximum recursion depth from a seed
    pub max_depth: u32,

    /// Insert new work at the head of the frontier instead of the tail
    pub depth_first: bool,

    /// Follow links to any host
    pub cross_domains: bool,

    /// Extra allowed hosts (exact or `*.wildcard` entries)
    pub domains: Vec<String>,

    /// Only descend into paths below the parent's path
    pub no_parent: bool,

    /// Path must match at least one of these (anchored at start)
    pub recurse_patterns: Vec<String>,

    /// Path must match none of these (anchored at start)
    pub recurse_ignore_patterns: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            recurse: false,
            max_depth: 3,
            depth_first: false,
            cross_domains: false,
            domains: Vec::new(),
            no_parent: false,
            recurse_patterns: Vec::new(),
            recurse_ignore_patterns: Vec::new(),
        }
    }
}

/// Network and worker-pool configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Retries after a transport failure (non-2xx statuses are never retried)
    pub max_retries: u32,

    /// Sleep between transport-failure retries
    pub fail_sleep: Duration,

    /// Proxy URL applied to both http and https requests
    pub proxy: Option<String>,

    /// Fixed User-Agent override
    pub user_agent: Option<String>,

    /// Newline-delimited user-agent list; one is picked per run
    pub user_agents_file: Option<PathBuf>,

    /// Maximum concurrent fetches
    pub max_threads: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            fail_sleep: Duration::from_secs(1),
            proxy: None,
            user_agent: None,
            user_agents_file: None,
            max_threads: 10,
        }
    }
}

/// Early-termination configuration
#[derive(Debug, Clone, Default)]
pub struct StopConfig {
    /// Soft-stop the crawl when this pattern matches a page body
    pub stop_pattern: Option<String>,

    /// Soft-stop the crawl on the first HTTP 404
    pub stop_on_404: bool,

    /// Re-enqueue URLs answered with a Cloudflare challenge page
    pub requeue_cloudflare: bool,
}

/// Content-search configuration
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// User-supplied patterns scanned line-by-line over each page
    pub search_regexes: Vec<String>,

    /// Scan for plain e-mail addresses
    pub search_emails: bool,

    /// Scan for `mailto:`-prefixed e-mail addresses
    pub search_mailtos: bool,

    /// Pattern locating a human name near each address
    pub email_names: Option<String>,

    /// Line window `(start, end)` relative to the address line; both may be
    /// negative. Absent means the whole page is searched.
    pub email_names_lines: Option<(i64, i64)>,
}

/// Download-qualification configuration
///
/// When all three lists are empty, every fetched URL qualifies for download.
#[derive(Debug, Clone, Default)]
pub struct DownloadConfig {
    /// Path extensions that qualify
    pub extensions: Vec<String>,

    /// Path patterns that qualify (anchored, case-insensitive)
    pub regexes: Vec<String>,

    /// Path prefixes that qualify (compared after stripping the leading `/`)
    pub within: Vec<String>,
}

impl DownloadConfig {
    /// True when any qualification rule is configured
    pub fn is_selective(&self) -> bool {
        !self.extensions.is_empty() || !self.regexes.is_empty() || !self.within.is_empty()
    }
}

/// Output sink configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Root of the mirrored download tree
    pub out_dir: Option<PathBuf>,

    /// Log of successfully fetched URLs, one per line
    pub out_urls: Option<PathBuf>,

    /// E-mail artifact log; stdout when unset
    pub out_emails: Option<PathBuf>,

    /// Regex-match artifact log; stdout when unset
    pub out_regex: Option<PathBuf>,
}
