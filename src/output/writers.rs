//! Concrete output sinks and the synchronized output hub

use crate::config::Config;
use crate::output::download::MirrorTree;
use crate::output::traits::{BlobWriter, LineWriter, OutputError, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use url::Url;

/// A [`LineWriter`] appending to a file
///
/// Lines are flushed as they are written so the log is usable while the
/// crawl is still running.
pub struct FileLineWriter {
    writer: BufWriter<File>,
}

impl FileLineWriter {
    /// Opens (or creates) the file in append mode
    pub fn open(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OutputError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LineWriter for FileLineWriter {
    fn append(&mut self, line: &str) -> OutputResult<()> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// A [`LineWriter`] printing to standard output
///
/// Used for regex and e-mail artifacts when no file was configured.
pub struct StdoutLineWriter;

impl LineWriter for StdoutLineWriter {
    fn append(&mut self, line: &str) -> OutputResult<()> {
        println!("{line}");
        Ok(())
    }
}

struct Sinks {
    urls: Option<Box<dyn LineWriter>>,
    regex: Option<Box<dyn LineWriter>>,
    emails: Option<Box<dyn LineWriter>>,
    download: Option<MirrorTree>,
}

/// The synchronized output hub
///
/// All sinks share one mutex so that lines are appended atomically across
/// workers and download writes never interleave with log writes.
pub struct Outputs {
    sinks: Mutex<Sinks>,
}

impl Outputs {
    /// Opens every configured sink
    ///
    /// The regex and e-mail sinks fall back to stdout when the matching
    /// search is active but no file was given; the URL log and download tree
    /// exist only when configured.
    pub fn open(config: &Config) -> OutputResult<Self> {
        let output = &config.output;
        let search = &config.search;

        let urls = output
            .out_urls
            .as_deref()
            .map(|path| FileLineWriter::open(path).map(boxed))
            .transpose()?;

        let regex = match (&output.out_regex, !search.search_regexes.is_empty()) {
            (Some(path), _) => Some(boxed(FileLineWriter::open(path)?)),
            (None, true) => Some(boxed(StdoutLineWriter)),
            (None, false) => None,
        };

        let searching_emails = search.search_emails || search.search_mailtos;
        let emails = match (&output.out_emails, searching_emails) {
            (Some(path), _) => Some(boxed(FileLineWriter::open(path)?)),
            (None, true) => Some(boxed(StdoutLineWriter)),
            (None, false) => None,
        };

        let download = output
            .out_dir
            .as_ref()
            .map(|dir| MirrorTree::new(dir.clone()));

        Ok(Self {
            sinks: Mutex::new(Sinks {
                urls,
                regex,
                emails,
                download,
            }),
        })
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Sinks> {
        self.sinks.lock().expect("output lock poisoned")
    }

    /// Appends one successfully fetched URL to the URL log
    pub fn record_url(&self, url: &str) -> OutputResult<()> {
        if let Some(sink) = self.locked().urls.as_mut() {
            sink.append(url)?;
        }
        Ok(())
    }

    /// Appends regex-match records, all under one lock acquisition
    pub fn record_matches(&self, records: &[String]) -> OutputResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut sinks = self.locked();
        if let Some(sink) = sinks.regex.as_mut() {
            for record in records {
                sink.append(record)?;
            }
        }
        Ok(())
    }

    /// Appends e-mail records, all under one lock acquisition
    pub fn record_emails(&self, records: &[String]) -> OutputResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut sinks = self.locked();
        if let Some(sink) = sinks.emails.as_mut() {
            for record in records {
                sink.append(record)?;
            }
        }
        Ok(())
    }

    /// Writes a page body into the mirror tree
    pub fn save_page(&self, url: &Url, body: &[u8]) -> OutputResult<()> {
        if let Some(tree) = self.locked().download.as_mut() {
            tree.write_blob(url, body)?;
        }
        Ok(())
    }

    /// True when a download tree is configured
    pub fn download_enabled(&self) -> bool {
        self.locked().download.is_some()
    }
}

fn boxed<W: LineWriter + 'static>(writer: W) -> Box<dyn LineWriter> {
    Box::new(writer)
}
