//! Mirrored download tree: qualification rules and path layout

use crate::config::DownloadConfig;
use crate::output::traits::{BlobWriter, OutputError, OutputResult};
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use url::Url;

/// Compiled download-qualification rules
///
/// With no rules configured every fetched URL qualifies; otherwise a URL
/// qualifies when *any* rule accepts it.
#[derive(Debug, Clone, Default)]
pub struct DownloadRules {
    extensions: Vec<String>,
    regexes: Vec<Regex>,
    within: Vec<String>,
}

impl DownloadRules {
    /// Compiles the download configuration
    ///
    /// Path patterns are case-insensitive and anchored at the start of the
    /// path; an invalid pattern is startup-fatal.
    pub fn new(download: &DownloadConfig) -> Result<Self, ConfigError> {
        let regexes = download
            .regexes
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConfigError::InvalidRegex {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extensions: download.extensions.clone(),
            regexes,
            within: download.within.clone(),
        })
    }

    /// True when any qualification rule is configured
    pub fn is_selective(&self) -> bool {
        !self.extensions.is_empty() || !self.regexes.is_empty() || !self.within.is_empty()
    }

    /// Decides whether a URL's body should be written to the mirror tree
    pub fn qualifies(&self, url: &Url) -> bool {
        if !self.is_selective() {
            return true;
        }

        let path = url.path();

        if let Some(ext) = path_extension(url) {
            if self.extensions.iter().any(|e| e == ext) {
                return true;
            }
        }

        if self
            .regexes
            .iter()
            .any(|re| re.find(path).is_some_and(|m| m.start() == 0))
        {
            return true;
        }

        let trimmed = path.trim_start_matches('/');
        self.within.iter().any(|prefix| trimmed.starts_with(prefix))
    }
}

/// Extracts the last `.`-separated segment of a URL path
///
/// Returns None when the final path segment has no dot at all.
pub fn path_extension(url: &Url) -> Option<&str> {
    let leaf = url.path().rsplit('/').next()?;
    match leaf.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Computes the filesystem location a URL's body is mirrored to
///
/// Layout: `<root>/<host>/<path dirs>/<leaf>[?query][#fragment]`. When the
/// computed location already names a directory (or the URL path ends in a
/// slash), the body lands in `<location>/directory_content` instead.
pub fn mirror_path(root: &Path, url: &Url) -> PathBuf {
    let mut path = root.join(url.host_str().unwrap_or("unknown-host"));

    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    if let Some((leaf, dirs)) = segments.split_last() {
        for dir in dirs {
            path.push(dir);
        }

        let mut name = (*leaf).to_string();
        if let Some(query) = url.query() {
            name.push('?');
            name.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            name.push('#');
            name.push_str(fragment);
        }
        path.push(name);
    }

    if url.path().ends_with('/') || segments.is_empty() || path.is_dir() {
        path.push("directory_content");
    }

    path
}

/// A [`BlobWriter`] that mirrors page bodies under a root directory
#[derive(Debug)]
pub struct MirrorTree {
    root: PathBuf,
}

impl MirrorTree {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl BlobWriter for MirrorTree {
    fn write_blob(&mut self, url: &Url, body: &[u8]) -> OutputResult<()> {
        let target = mirror_path(&self.root, url);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Open {
                path: parent.display().to_string(),
                source,
            })?;
        }

        std::fs::write(&target, body).map_err(|source| OutputError::Open {
            path: target.display().to_string(),
            source,
        })
    }
}
