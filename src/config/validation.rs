use crate::config::types::Config;
use crate::ConfigError;
use regex::Regex;

/// The e-mail address pattern scanned over page lines
pub const EMAIL_PATTERN: &str = r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+";

/// User-supplied patterns compiled once at startup
///
/// Any pattern that fails to compile is a startup-fatal configuration error;
/// the crawl never begins with a partially usable search set.
#[derive(Debug, Clone, Default)]
pub struct SearchSet {
    /// `--search-regex` patterns, scanned per line with findall semantics
    pub patterns: Vec<Regex>,

    /// The e-mail pattern in effect, or None when e-mail search is off.
    /// `--search-mailtos` uses the `mailto:`-prefixed variant.
    pub email: Option<Regex>,

    /// `--email-names` pattern
    pub names: Option<Regex>,

    /// `--email-names-lines` window relative to the address line
    pub names_window: Option<(i64, i64)>,

    /// `--stop-pattern`, scanned over the raw byte body
    pub stop_pattern: Option<regex::bytes::Regex>,
}

/// Compiles a user-supplied pattern, mapping failures to a `ConfigError`
pub fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_bytes_regex(pattern: &str) -> Result<regex::bytes::Regex, ConfigError> {
    regex::bytes::Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Validates the configuration and compiles the search patterns
///
/// # Startup-fatal conditions
///
/// * no seed URLs
/// * no output method (no sink files, no download dir, no active search)
/// * any user regex that fails to compile
pub fn validate(config: &Config) -> Result<SearchSet, ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "No URLs supplied; pass positional URLs or -f/--file".to_string(),
        ));
    }

    if !has_output_method(config) {
        return Err(ConfigError::Validation(
            "No output method selected; pass -o/--out-dir, --out-urls, --out-emails, \
             --out-regex, or a search option"
                .to_string(),
        ));
    }

    if config.network.max_threads == 0 {
        return Err(ConfigError::Validation(
            "--max-threads must be at least 1".to_string(),
        ));
    }

    compile_search(config)
}

/// True when at least one artifact of the run would be observable
fn has_output_method(config: &Config) -> bool {
    let output = &config.output;
    let search = &config.search;

    output.out_dir.is_some()
        || output.out_urls.is_some()
        || output.out_emails.is_some()
        || output.out_regex.is_some()
        || !search.search_regexes.is_empty()
        || search.search_emails
        || search.search_mailtos
}

fn compile_search(config: &Config) -> Result<SearchSet, ConfigError> {
    let search = &config.search;

    let patterns = search
        .search_regexes
        .iter()
        .map(|p| compile_regex(p))
        .collect::<Result<Vec<_>, _>>()?;

    // The mailto-prefixed pattern subsumes the plain one when both flags are
    // given; matches are stripped of the prefix either way.
    let email = if search.search_mailtos {
        Some(compile_regex(&format!(r"mailto:\s*{EMAIL_PATTERN}"))?)
    } else if search.search_emails {
        Some(compile_regex(EMAIL_PATTERN)?)
    } else {
        None
    };

    let names = search
        .email_names
        .as_deref()
        .map(compile_regex)
        .transpose()?;

    let stop_pattern = config
        .stop
        .stop_pattern
        .as_deref()
        .map(compile_bytes_regex)
        .transpose()?;

    Ok(SearchSet {
        patterns,
        email,
        names,
        names_window: search.email_names_lines,
        stop_pattern,
    })
}
