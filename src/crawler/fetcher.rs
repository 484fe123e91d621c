//! HTTP fetching and response classification
//!
//! One GET per frontier item, with a fixed sleep-and-retry policy for
//! transport failures. Non-2xx statuses are never retried; they are
//! classified so the worker can react (404 soft-stop, Cloudflare requeue).

use crate::config::NetworkConfig;
use crate::crawler::parser::page_title;
use crate::output::{path_extension, DownloadRules};
use crate::SkeinError;
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use tokio::time::sleep;
use url::Url;

/// The `<title>` substring that identifies a Cloudflare challenge page
pub const CLOUDFLARE_CHALLENGE_TITLE: &str = "Attention Required! | Cloudflare";

/// Path extensions that are never fetched when selective download is on and
/// the URL fails every download rule
pub const BINARY_EXTENSIONS: &[&str] = &[
    "3dm", "3ds", "3g2", "3gp", "7z", "a", "aac", "adp", "ai", "aif", "aiff", "alz", "ape", "apk",
    "ar", "arj", "asf", "au", "avi", "bak", "baml", "bh", "bin", "bk", "bmp", "btif", "bz2",
    "bzip2", "cab", "caf", "cgm", "class", "cmx", "cpio", "cr2", "cur", "dat", "dcm", "deb", "dex",
    "djvu", "dll", "dmg", "dng", "doc", "docm", "docx", "dot", "dotm", "dra", "DS_Store", "dsk",
    "dts", "dtshd", "dvb", "dwg", "dxf", "ecelp4800", "ecelp7470", "ecelp9600", "egg", "eol",
    "eot", "epub", "exe", "f4v", "fbs", "fh", "fla", "flac", "fli", "flv", "fpx", "fst", "fvt",
    "g3", "gh", "gif", "graffle", "gz", "gzip", "h261", "h263", "h264", "icns", "ico", "ief",
    "img", "ipa", "iso", "jar", "jpeg", "jpg", "jpgv", "jpm", "jxr", "key", "ktx", "lha", "lib",
    "lvp", "lz", "lzh", "lzma", "lzo", "m3u", "m4a", "m4v", "mar", "mdi", "mht", "mid", "midi",
    "mj2", "mka", "mkv", "mmr", "mng", "mobi", "mov", "movie", "mp3", "mp4", "mp4a", "mpeg",
    "mpg", "mpga", "mxu", "nef", "npx", "numbers", "nupkg", "o", "oga", "ogg", "ogv", "otf",
    "pages", "pbm", "pcx", "pdb", "pdf", "pea", "pgm", "pic", "png", "pnm", "pot", "potm", "potx",
    "ppa", "ppam", "ppm", "pps", "ppsm", "ppsx", "ppt", "pptm", "pptx", "psd", "pya", "pyc",
    "pyo", "pyv", "qt", "rar", "ras", "raw", "resources", "rgb", "rip", "rlc", "rmf", "rmvb",
    "rtf", "rz", "s3m", "s7z", "scpt", "sgi", "shar", "sil", "sketch", "slk", "smv", "snk", "so",
    "stl", "suo", "sub", "swf", "tar", "tbz", "tbz2", "tga", "tgz", "thmx", "tif", "tiff", "tlz",
    "ttc", "ttf", "txz", "udf", "uvh", "uvi", "uvm", "uvp", "uvs", "uvu", "viv", "vob", "war",
    "wav", "wax", "wbmp", "wdp", "weba", "webm", "webp", "whl", "wim", "wm", "wma", "wmv", "wmx",
    "woff", "woff2", "wrm", "wvx", "xbm", "xif", "xla", "xlam", "xls", "xlsb", "xlsm", "xlsx",
    "xlt", "xltm", "xltx", "xm", "xmind", "xpi", "xpm", "xwd", "xz", "z", "zip", "zipx",
];

/// Result of fetching one frontier item
#[derive(Debug)]
pub enum FetchOutcome {
    /// HTTP 200 with the body read; proceed to analysis
    Success(FetchedPage),

    /// HTTP 404
    NotFound,

    /// HTTP 403 whose page title identifies a Cloudflare challenge
    CloudflareChallenge,

    /// Any other non-200 status
    HttpError { status: u16 },

    /// Transport failure after exhausting retries, or an unreadable body
    TransportFailed,

    /// Binary-extension short-circuit; no request was issued
    Skipped,
}

/// A successfully fetched page
#[derive(Debug)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,

    /// Raw response body
    pub body: Vec<u8>,

    /// The `Content-Type` header, including any charset parameter
    pub content_type: String,
}

impl FetchedPage {
    /// True when the response declared an HTML body
    pub fn is_html(&self) -> bool {
        self.content_type.contains("text/html")
    }
}

/// Builds the run's HTTP client
///
/// The User-Agent is fixed for the run; the proxy, when configured, applies
/// to both http and https. Redirects are followed. No request timeout is set
/// beyond the client library's defaults.
pub fn build_http_client(user_agent: &str, proxy: Option<&str>) -> Result<Client, SkeinError> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Fetches frontier items and classifies the responses
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    fail_sleep: std::time::Duration,
    download_rules: DownloadRules,
}

impl Fetcher {
    pub fn new(client: Client, network: &NetworkConfig, download_rules: DownloadRules) -> Self {
        Self {
            client,
            max_retries: network.max_retries,
            fail_sleep: network.fail_sleep,
            download_rules,
        }
    }

    /// Fetches one URL and classifies the result
    ///
    /// Transport failures are retried up to `max_retries` times with a fixed
    /// sleep in between; HTTP error statuses are returned as-is without
    /// retrying.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        if self.should_skip_binary(url) {
            tracing::debug!("Skipping binary extension: {}", url);
            return FetchOutcome::Skipped;
        }

        let response = match self.request_with_retry(url).await {
            Some(response) => response,
            None => return FetchOutcome::TransportFailed,
        };

        let status = response.status();
        match status {
            StatusCode::OK => {
                let final_url = response.url().clone();
                let content_type = response
                    .headers()
                    .get("content-type")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                match response.bytes().await {
                    Ok(body) => FetchOutcome::Success(FetchedPage {
                        final_url,
                        body: body.to_vec(),
                        content_type,
                    }),
                    Err(err) => {
                        tracing::warn!("Failed to read body from {}: {}", url, err);
                        FetchOutcome::TransportFailed
                    }
                }
            }
            StatusCode::NOT_FOUND => FetchOutcome::NotFound,
            StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                if is_cloudflare_challenge(&body) {
                    FetchOutcome::CloudflareChallenge
                } else {
                    FetchOutcome::HttpError {
                        status: status.as_u16(),
                    }
                }
            }
            _ => FetchOutcome::HttpError {
                status: status.as_u16(),
            },
        }
    }

    /// Issues the GET, sleeping and retrying on transport errors
    async fn request_with_retry(&self, url: &Url) -> Option<reqwest::Response> {
        let mut attempt: u32 = 0;

        loop {
            match self.client.get(url.clone()).send().await {
                Ok(response) => return Some(response),
                Err(err) => {
                    if attempt >= self.max_retries {
                        tracing::warn!(
                            "Giving up on {} after {} attempt(s): {}",
                            url,
                            attempt + 1,
                            err
                        );
                        return None;
                    }
                    attempt += 1;
                    tracing::debug!("Retry {}/{} for {}: {}", attempt, self.max_retries, url, err);
                    sleep(self.fail_sleep).await;
                }
            }
        }
    }

    /// Binary-extension short-circuit
    ///
    /// Applies only when download qualification is selective; a URL that
    /// fails every download rule and carries a known binary extension is
    /// never fetched.
    fn should_skip_binary(&self, url: &Url) -> bool {
        self.download_rules.is_selective()
            && !self.download_rules.qualifies(url)
            && path_extension(url).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext))
    }
}

/// Recognizes a Cloudflare challenge page by its `<title>`
fn is_cloudflare_challenge(body: &str) -> bool {
    page_title(body).is_some_and(|title| title.contains(CLOUDFLARE_CHALLENGE_TITLE))
}
