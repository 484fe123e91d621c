use crate::config::{compile_regex, ScopeConfig};
use crate::crawler::Frontier;
use crate::url::normalize::promote;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// The policy gate between link discovery and frontier insertion
///
/// Every candidate link passes through [`AdmissionFilter::admit`], which is
/// the only place recursion policy lives. Checks run in a fixed order:
/// normalize, seen-set, include patterns, exclude patterns, no-parent, and
/// domain scope; a candidate that survives is submitted to the frontier with
/// one less remaining depth than its parent.
#[derive(Debug)]
pub struct AdmissionFilter {
    cross_domains: bool,
    domains: Vec<String>,
    no_parent: bool,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl AdmissionFilter {
    /// Compiles the scope configuration into an admission filter
    ///
    /// Fails when any recurse pattern does not compile; like every other
    /// user-supplied regex this is startup-fatal.
    pub fn new(scope: &ScopeConfig) -> Result<Self, ConfigError> {
        let include = scope
            .recurse_patterns
            .iter()
            .map(|p| compile_regex(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = scope
            .recurse_ignore_patterns
            .iter()
            .map(|p| compile_regex(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cross_domains: scope.cross_domains,
            domains: scope.domains.clone(),
            no_parent: scope.no_parent,
            include,
            exclude,
        })
    }

    /// Decides whether a discovered link enters the frontier
    ///
    /// `remaining_depth` is the *parent's* remaining depth; the candidate is
    /// enqueued with `remaining_depth - 1`. Returns true when the candidate
    /// was admitted and actually enqueued.
    pub fn admit(
        &self,
        frontier: &Frontier,
        parent: &Url,
        raw_link: &str,
        remaining_depth: u32,
    ) -> bool {
        if remaining_depth == 0 {
            return false;
        }

        // Canonicalize before the seen check so every membership test sees
        // the same string for the same resource.
        let url = match promote(raw_link, Some(parent)) {
            Ok(url) => url,
            Err(err) => {
                tracing::trace!("Rejected link '{}': {}", raw_link, err);
                return false;
            }
        };

        if frontier.is_seen(url.as_str()) {
            return false;
        }

        let path = url.path();

        if !self.include.is_empty() && !self.include.iter().any(|re| match_at_start(re, path)) {
            return false;
        }

        if self.exclude.iter().any(|re| match_at_start(re, path)) {
            return false;
        }

        if self.no_parent && !within_parent(parent.path(), path) {
            return false;
        }

        if !self.host_in_scope(parent, &url) {
            return false;
        }

        frontier.submit(url, Some(remaining_depth as i64 - 1))
    }

    /// Domain-scope rule: cross-domains admits everything; otherwise the
    /// candidate host must equal the parent's host or match an allowed entry.
    fn host_in_scope(&self, parent: &Url, candidate: &Url) -> bool {
        if self.cross_domains {
            return true;
        }

        let (Some(parent_host), Some(host)) = (parent.host_str(), candidate.host_str()) else {
            return false;
        };

        if host == parent_host {
            return true;
        }

        self.domains.iter().any(|entry| host_matches(entry, host))
    }
}

/// Anchored-at-start matching
///
/// Equivalent to Python's `re.match`: a leftmost match exists at offset 0
/// exactly when some match starts there.
fn match_at_start(re: &Regex, text: &str) -> bool {
    re.find(text).is_some_and(|m| m.start() == 0)
}

/// True when `path` descends from `parent_path`
fn within_parent(parent_path: &str, path: &str) -> bool {
    let base = parent_path.trim_end_matches('/');
    path.len() > base.len() && path.starts_with(base) && path.as_bytes()[base.len()] == b'/'
}

/// Checks a host against an allowed-domains entry
///
/// `example.com` matches only itself; `*.example.com` matches the bare
/// domain and any subdomain.
fn host_matches(entry: &str, host: &str) -> bool {
    if let Some(base) = entry.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{base}"))
    } else {
        host == entry
    }
}
