//! Output module for skein
//!
//! This module handles the run's artifact sinks:
//! - the URL log (one successfully fetched URL per line)
//! - the regex-match and e-mail logs (falling back to stdout)
//! - the mirrored download tree
//!
//! All sinks are serialized behind one mutex so records never interleave
//! across workers.

mod download;
mod traits;
mod writers;

pub use download::{mirror_path, path_extension, DownloadRules, MirrorTree};
pub use traits::{BlobWriter, LineWriter, OutputError, OutputResult};
pub use writers::{FileLineWriter, Outputs, StdoutLineWriter};
