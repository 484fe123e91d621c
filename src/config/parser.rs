use crate::config::types::NetworkConfig;
use crate::ConfigError;
use rand::seq::SliceRandom;
use std::path::Path;

/// Fallback user agents used when no `-A` override and no agents file is given
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Parses page-range specs like `1-2,5,6-10` into the integers they cover
///
/// Each spec is a comma-separated list of single integers or inclusive
/// `start-end` ranges. Multiple specs are concatenated in order.
///
/// # Examples
///
/// ```
/// use skein::config::parse_page_ranges;
///
/// let pages = parse_page_ranges(&["1-2,5".to_string()]).unwrap();
/// assert_eq!(pages, vec![1, 2, 5]);
/// ```
pub fn parse_page_ranges(specs: &[String]) -> Result<Vec<u64>, ConfigError> {
    let mut pages = Vec::new();

    for spec in specs {
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(ConfigError::InvalidPages(spec.clone()));
            }

            match part.split_once('-') {
                Some((start, end)) => {
                    let start: u64 = start
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidPages(spec.clone()))?;
                    let end: u64 = end
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidPages(spec.clone()))?;
                    if end < start {
                        return Err(ConfigError::InvalidPages(spec.clone()));
                    }
                    pages.extend(start..=end);
                }
                None => {
                    let page: u64 = part
                        .parse()
                        .map_err(|_| ConfigError::InvalidPages(spec.clone()))?;
                    pages.push(page);
                }
            }
        }
    }

    Ok(pages)
}

/// Parses an `--email-names-lines` window spec: `"start [end]"`
///
/// Both values may be negative (lines before the address line). When only a
/// start is given, the window collapses to that single relative line.
pub fn parse_names_window(spec: &str) -> Result<(i64, i64), ConfigError> {
    let parts: Vec<&str> = spec.split_whitespace().collect();

    match parts.as_slice() {
        [start] => {
            let start: i64 = start
                .parse()
                .map_err(|_| ConfigError::InvalidWindow(spec.to_string()))?;
            Ok((start, start))
        }
        [start, end] => {
            let start: i64 = start
                .parse()
                .map_err(|_| ConfigError::InvalidWindow(spec.to_string()))?;
            let end: i64 = end
                .parse()
                .map_err(|_| ConfigError::InvalidWindow(spec.to_string()))?;
            Ok((start, end))
        }
        _ => Err(ConfigError::InvalidWindow(spec.to_string())),
    }
}

/// Reads newline-delimited seed URLs from a file
///
/// Blank lines and `#` comment lines are skipped.
pub fn read_seed_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Loads a newline-delimited user-agent list
pub fn load_user_agents(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let agents: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if agents.is_empty() {
        return Err(ConfigError::Validation(format!(
            "User-agents file '{}' contains no entries",
            path.display()
        )));
    }

    Ok(agents)
}

/// Resolves the User-Agent string used for the whole run
///
/// Priority: the `-A` override, then a uniform random pick from the agents
/// file, then a uniform random pick from the built-in list.
pub fn resolve_user_agent(network: &NetworkConfig) -> Result<String, ConfigError> {
    if let Some(agent) = &network.user_agent {
        return Ok(agent.clone());
    }

    let mut rng = rand::thread_rng();

    if let Some(path) = &network.user_agents_file {
        let agents = load_user_agents(path)?;
        // load_user_agents rejects empty lists
        return Ok(agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string()));
    }

    Ok(DEFAULT_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DEFAULT_USER_AGENTS[0])
        .to_string())
}
