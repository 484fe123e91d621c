//! Skein: a concurrent web spider
//!
//! This crate implements a single-process crawler that fetches a frontier of
//! seed URLs with a bounded worker pool, discovers links in HTML responses,
//! recurses into them under configurable scope rules, and extracts regex
//! matches, e-mail addresses, and mirrored page downloads.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for skein operations
#[derive(Debug, Error)]
pub enum SkeinError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid page range '{0}'")]
    InvalidPages(String),

    #[error("Invalid names-lines window '{0}'")]
    InvalidWindow(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{0}'")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Missing host in URL '{0}'")]
    MissingHost(String),

    #[error("Host-relative link '{0}' has no parent URL")]
    NoParent(String),
}

/// Result type alias for skein operations
pub type Result<T> = std::result::Result<T, SkeinError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::crawler::Coordinator;
pub use crate::output::OutputError;
pub use crate::url::{promote, AdmissionFilter};
