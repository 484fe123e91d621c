//! Crawl coordination: seeding, the dispatch loop, and workers
//!
//! The coordinator expands `{page}` templates in the seeds, feeds the
//! frontier, and drives the dispatch loop: pull a bounded batch of eligible
//! items, hand each to a worker task, wait for at least one completion, and
//! repeat until the frontier and the in-flight set are both empty. Soft-stop
//! drops pending work and lets in-flight fetches finish; hard-stop also
//! latches the loop off.

use crate::config::{resolve_user_agent, validate, Config, SearchSet};
use crate::crawler::analyzer::{decode_body, email_records, regex_matches};
use crate::crawler::fetcher::{build_http_client, FetchOutcome, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierItem};
use crate::crawler::parser::candidate_links;
use crate::output::{DownloadRules, Outputs};
use crate::url::{promote, AdmissionFilter};
use crate::SkeinError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run-wide termination latches
///
/// All three flags move in one direction only. Workers may read a stale
/// value for a moment, which costs at most one extra page of recursion.
#[derive(Debug)]
pub struct StopFlags {
    running: AtomicBool,
    soft: AtomicBool,
    pattern_reached: AtomicBool,
}

impl StopFlags {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            soft: AtomicBool::new(false),
            pattern_reached: AtomicBool::new(false),
        }
    }

    /// True until a hard stop
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True once a soft (or hard) stop was requested
    pub fn soft_stopped(&self) -> bool {
        self.soft.load(Ordering::Acquire)
    }

    /// True once the stop pattern has matched on any worker
    pub fn pattern_reached(&self) -> bool {
        self.pattern_reached.load(Ordering::Acquire)
    }

    fn request_soft(&self) {
        self.soft.store(true, Ordering::Release);
    }

    fn request_hard(&self) {
        self.soft.store(true, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    fn mark_pattern_reached(&self) -> bool {
        !self.pattern_reached.swap(true, Ordering::AcqRel)
    }
}

/// End-of-run totals, reported once at shutdown
#[derive(Debug, Default)]
struct RunCounters {
    pages_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    links_admitted: AtomicU64,
    cloudflare_requeues: AtomicU64,
}

/// Everything a worker needs, shared behind one `Arc`
struct CrawlContext {
    config: Config,
    search: SearchSet,
    admission: AdmissionFilter,
    download_rules: DownloadRules,
    frontier: Frontier,
    fetcher: Fetcher,
    outputs: Outputs,
    stop: StopFlags,
    fetch_slots: Semaphore,
    counters: RunCounters,
}

impl CrawlContext {
    /// Idempotent soft-stop: drop pending work, let in-flight work finish
    fn soft_stop(&self) {
        self.stop.request_soft();
        self.frontier.clear_pending();
    }
}

/// Drives a complete crawl run
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
}

impl Coordinator {
    /// Validates the configuration and assembles the engine
    ///
    /// Fails fast on the startup-fatal conditions: no seeds, no output
    /// method, or any user regex that does not compile.
    pub fn new(config: Config) -> Result<Self, SkeinError> {
        let search = validate(&config)?;
        let admission = AdmissionFilter::new(&config.scope)?;
        let download_rules = DownloadRules::new(&config.download)?;

        let user_agent = resolve_user_agent(&config.network)?;
        tracing::debug!("User-Agent for this run: {}", user_agent);
        let client = build_http_client(&user_agent, config.network.proxy.as_deref())?;
        let fetcher = Fetcher::new(client, &config.network, download_rules.clone());

        let outputs = Outputs::open(&config)?;
        let frontier = Frontier::new(config.scope.depth_first, config.initial_depth());
        let fetch_slots = Semaphore::new(config.network.max_threads);

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                config,
                search,
                admission,
                download_rules,
                frontier,
                fetcher,
                outputs,
                stop: StopFlags::new(),
                fetch_slots,
                counters: RunCounters::default(),
            }),
        })
    }

    /// Runs the crawl to completion
    pub async fn run(&mut self) -> Result<(), SkeinError> {
        self.seed();
        self.dispatch_loop().await;
        self.report();
        Ok(())
    }

    /// Requests a hard stop: pending work is dropped and the dispatch loop
    /// cannot be revived by racing insertions
    pub fn stop(&self) {
        self.ctx.stop.request_hard();
        self.ctx.frontier.clear_pending();
    }

    /// Expands `{page}` templates and feeds the frontier
    fn seed(&self) {
        for seed in expand_seeds(&self.ctx.config.seeds, &self.ctx.config.pages) {
            match promote(&seed, None) {
                Ok(url) => {
                    self.ctx.frontier.submit(url, None);
                }
                Err(err) => {
                    tracing::warn!("Dropping seed '{}': {}", seed, err);
                }
            }
        }
        tracing::info!("Seeded {} URL(s)", self.ctx.frontier.pending_len());
    }

    /// The frontier-to-pool loop
    ///
    /// Each iteration dispatches at most `max_threads + 2` eligible items,
    /// then blocks until at least one in-flight task finishes and drains all
    /// other completed tasks. The loop terminates once the frontier is empty
    /// and nothing is in flight.
    async fn dispatch_loop(&self) {
        let batch_limit = self.ctx.config.network.max_threads + 2;
        let mut tasks: JoinSet<()> = JoinSet::new();

        while self.ctx.stop.is_running() {
            for item in self.ctx.frontier.next_batch(batch_limit) {
                let ctx = Arc::clone(&self.ctx);
                tasks.spawn(process_item(ctx, item));
            }

            if tasks.is_empty() {
                if self.ctx.frontier.is_empty() {
                    break;
                }
                continue;
            }

            if let Some(joined) = tasks.join_next().await {
                consume_task_result(joined);
            }
            while let Some(joined) = tasks.try_join_next() {
                consume_task_result(joined);
            }
        }

        // In-flight work runs to completion even after a stop
        while let Some(joined) = tasks.join_next().await {
            consume_task_result(joined);
        }
    }

    fn report(&self) {
        let counters = &self.ctx.counters;
        tracing::info!(
            "Crawl finished: {} page(s) fetched, {} URL(s) dispatched, {} link(s) admitted, \
             {} fetch failure(s), {} Cloudflare requeue(s)",
            counters.pages_fetched.load(Ordering::Relaxed),
            self.ctx.frontier.seen_len(),
            counters.links_admitted.load(Ordering::Relaxed),
            counters.fetch_failures.load(Ordering::Relaxed),
            counters.cloudflare_requeues.load(Ordering::Relaxed),
        );
    }
}

/// Consumes a finished worker, logging panics without propagating them
fn consume_task_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        if !err.is_cancelled() {
            tracing::error!("Worker task failed: {}", err);
        }
    }
}

/// Expands `{page}` templates against the configured page numbers
///
/// Seeds without the template (or runs without `-p`) pass through verbatim.
fn expand_seeds(seeds: &[String], pages: &[u64]) -> Vec<String> {
    let mut expanded = Vec::new();

    for seed in seeds {
        if seed.contains("{page}") && !pages.is_empty() {
            for page in pages {
                expanded.push(seed.replace("{page}", &page.to_string()));
            }
        } else {
            expanded.push(seed.clone());
        }
    }

    expanded
}

/// One worker: fetch, classify, analyze, recurse
async fn process_item(ctx: Arc<CrawlContext>, item: FrontierItem) {
    // Tasks that have not started fetching yet are cancelled by a soft
    // stop; the flag is rechecked after the pool slot is acquired because a
    // stop may land while the task is still queued.
    if ctx.stop.soft_stopped() {
        return;
    }

    let Ok(_permit) = ctx.fetch_slots.acquire().await else {
        return;
    };

    if ctx.stop.soft_stopped() {
        return;
    }

    match ctx.fetcher.fetch(&item.url).await {
        FetchOutcome::Success(page) => {
            ctx.counters.pages_fetched.fetch_add(1, Ordering::Relaxed);
            handle_page(&ctx, &item, &page.body, &page.content_type);
        }
        FetchOutcome::NotFound => {
            tracing::debug!("404 for {}", item.url);
            if ctx.config.stop.stop_on_404 {
                tracing::info!("Stopping crawl: 404 at {}", item.url);
                ctx.soft_stop();
            }
        }
        FetchOutcome::CloudflareChallenge => {
            if ctx.config.stop.requeue_cloudflare && ctx.frontier.requeue(item.clone()) {
                ctx.counters
                    .cloudflare_requeues
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Requeued Cloudflare-challenged URL {}", item.url);
            } else {
                tracing::warn!("Cloudflare challenge at {}, dropping", item.url);
            }
        }
        FetchOutcome::HttpError { status } => {
            tracing::warn!("HTTP {} for {}", status, item.url);
        }
        FetchOutcome::TransportFailed => {
            ctx.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
        FetchOutcome::Skipped => {}
    }
}

/// Post-fetch pipeline for a 200 response
fn handle_page(ctx: &CrawlContext, item: &FrontierItem, body: &[u8], content_type: &str) {
    if let Err(err) = ctx.outputs.record_url(item.url.as_str()) {
        tracing::error!("Failed to log URL {}: {}", item.url, err);
    }

    if ctx.outputs.download_enabled() && ctx.download_rules.qualifies(&item.url) {
        if let Err(err) = ctx.outputs.save_page(&item.url, body) {
            tracing::error!("Failed to save {}: {}", item.url, err);
        }
    }

    if !content_type.contains("text/html") {
        return;
    }

    // Stop-pattern scan runs first, over the raw bytes
    if let Some(stop_re) = &ctx.search.stop_pattern {
        if !ctx.stop.pattern_reached() && stop_re.is_match(body) {
            if ctx.stop.mark_pattern_reached() {
                tracing::info!("Stop pattern matched at {}", item.url);
            }
            ctx.soft_stop();
        }
    }

    let text = decode_body(body, content_type);
    let lines: Vec<&str> = text.split('\n').collect();

    let matches = regex_matches(&item.url, &lines, &ctx.search.patterns);
    if let Err(err) = ctx.outputs.record_matches(&matches) {
        tracing::error!("Failed to log matches for {}: {}", item.url, err);
    }

    let emails = email_records(&lines, &ctx.search);
    if let Err(err) = ctx.outputs.record_emails(&emails) {
        tracing::error!("Failed to log emails for {}: {}", item.url, err);
    }

    if item.remaining_depth > 0 && !ctx.stop.pattern_reached() && !ctx.stop.soft_stopped() {
        for raw_link in candidate_links(&text) {
            if ctx
                .admission
                .admit(&ctx.frontier, &item.url, &raw_link, item.remaining_depth)
            {
                ctx.counters.links_admitted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
