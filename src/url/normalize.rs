use crate::UrlError;
use url::Url;

/// URL schemes the spider will fetch
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Promotes a raw link to an absolute URL with a supported scheme
///
/// Two promotion rules are applied, in order:
///
/// 1. A leading `/` means the link is host-relative: the parent URL's scheme,
///    host, and port are prepended.
/// 2. A missing scheme means `http://` is prepended.
///
/// After promotion the URL must parse, carry a scheme in
/// [`SUPPORTED_SCHEMES`], and have a non-empty host.
///
/// # Arguments
///
/// * `raw` - The link as found in a page or on the command line
/// * `parent` - The URL of the page the link was found on; `None` for seeds
///
/// # Examples
///
/// ```
/// use skein::url::promote;
/// use url::Url;
///
/// let parent = Url::parse("https://a.test/dir/page").unwrap();
/// let url = promote("/other", Some(&parent)).unwrap();
/// assert_eq!(url.as_str(), "https://a.test/other");
///
/// let url = promote("b.test/x", None).unwrap();
/// assert_eq!(url.as_str(), "http://b.test/x");
/// ```
pub fn promote(raw: &str, parent: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse(raw.to_string()));
    }

    let url = if raw.starts_with('/') {
        let parent = parent.ok_or_else(|| UrlError::NoParent(raw.to_string()))?;
        let host = parent
            .host_str()
            .ok_or_else(|| UrlError::MissingHost(parent.as_str().to_string()))?;

        let promoted = match parent.port() {
            Some(port) => format!("{}://{}:{}{}", parent.scheme(), host, port, raw),
            None => format!("{}://{}{}", parent.scheme(), host, raw),
        };
        Url::parse(&promoted).map_err(|_| UrlError::Parse(raw.to_string()))?
    } else {
        match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("http://{raw}")).map_err(|_| UrlError::Parse(raw.to_string()))?
            }
            Err(_) => return Err(UrlError::Parse(raw.to_string())),
        }
    };

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url.as_str().to_string()));
    }

    Ok(url)
}
