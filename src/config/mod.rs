//! Configuration module for skein
//!
//! A run's configuration is assembled from the command line once at startup
//! and stays immutable for the run. This module holds the config record
//! itself, the small parsers behind the CLI surface (page ranges, names-lines
//! windows, seed and user-agent files), and the startup validation that
//! compiles every user-supplied regex.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DownloadConfig, NetworkConfig, OutputConfig, ScopeConfig, SearchConfig, StopConfig,
};

// Re-export parser and validation entry points
pub use parser::{
    load_user_agents, parse_names_window, parse_page_ranges, read_seed_file, resolve_user_agent,
};
pub use validation::{compile_regex, validate, SearchSet, EMAIL_PATTERN};
