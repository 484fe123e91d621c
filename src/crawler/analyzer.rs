//! Page analysis: charset decoding and the regex / e-mail scans
//!
//! Analysis runs only on `text/html` responses. The body is decoded once,
//! split into lines, and each scan walks those lines; line numbers in the
//! emitted records are 0-based indices into that split.

use crate::config::SearchSet;
use encoding_rs::Encoding;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// How many leading bytes are searched for an HTML-declared charset
const META_SNIFF_LIMIT: usize = 1024;

/// Decodes a response body to text
///
/// The HTML-declared charset (a `<meta charset>` in the first kilobyte) wins
/// over the `Content-Type` header charset when both exist; the fallback is
/// lossy UTF-8.
pub fn decode_body(body: &[u8], content_type: &str) -> String {
    let declared = meta_charset(body).or_else(|| header_charset(content_type));

    let encoding = declared
        .as_deref()
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// Extracts the charset parameter from a `Content-Type` header value
fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Finds a `<meta charset=...>` declaration near the top of the body
fn meta_charset(body: &[u8]) -> Option<String> {
    static META: OnceLock<regex::bytes::Regex> = OnceLock::new();
    let re = META.get_or_init(|| {
        regex::bytes::Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-zA-Z0-9_\-]+)"#)
            .expect("meta charset pattern is valid")
    });

    let head = &body[..body.len().min(META_SNIFF_LIMIT)];
    let captures = re.captures(head)?;
    Some(String::from_utf8_lossy(&captures[1]).into_owned())
}

/// Runs every search pattern over the page lines
///
/// Each match produces one record of the form `<url>:<line>: <match>`, with
/// findall semantics per line (every non-overlapping match is reported).
pub fn regex_matches(url: &Url, lines: &[&str], patterns: &[Regex]) -> Vec<String> {
    let mut records = Vec::new();

    for pattern in patterns {
        for (line_number, line) in lines.iter().enumerate() {
            for found in pattern.find_iter(line) {
                records.push(format!("{}:{}: {}", url, line_number, found.as_str()));
            }
        }
    }

    records
}

/// Scans the page lines for e-mail addresses
///
/// Each hit is stripped of any `mailto:` prefix. When a names pattern is
/// configured, a co-located name is searched either across the whole page or
/// within the configured window around the address line; a found name yields
/// `<name> <address>` records, otherwise the bare address is recorded.
pub fn email_records(lines: &[&str], search: &SearchSet) -> Vec<String> {
    let Some(email_re) = &search.email else {
        return Vec::new();
    };

    let mut records = Vec::new();

    for (line_number, line) in lines.iter().enumerate() {
        for found in email_re.find_iter(line) {
            let address = strip_mailto(found.as_str());

            let record = match &search.names {
                Some(names_re) => match find_name(lines, line_number, names_re, search.names_window)
                {
                    Some(name) => format!("{name} <{address}>"),
                    None => address.to_string(),
                },
                None => address.to_string(),
            };
            records.push(record);
        }
    }

    records
}

/// Drops a `mailto:` prefix (and any whitespace after it) from a match
fn strip_mailto(hit: &str) -> &str {
    hit.strip_prefix("mailto:").map(str::trim_start).unwrap_or(hit)
}

/// Searches for a name near an address
///
/// With a window `(start, end)` the search covers lines
/// `[line + start, line + end]` clamped to the page; without one it covers
/// every line. The name is the pattern's first capture group when present,
/// else the whole match.
fn find_name(
    lines: &[&str],
    line_number: usize,
    names_re: &Regex,
    window: Option<(i64, i64)>,
) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let last = lines.len() as i64 - 1;

    let (first, end) = match window {
        Some((start, end)) => {
            let anchor = line_number as i64;
            (
                (anchor + start).clamp(0, last),
                (anchor + end).clamp(0, last),
            )
        }
        None => (0, last),
    };
    if first > end {
        return None;
    }

    for line in &lines[first as usize..=end as usize] {
        if let Some(captures) = names_re.captures(line) {
            let name = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string());
            if name.is_some() {
                return name;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{compile_regex, Config};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn search_set(emails: bool, mailtos: bool, names: Option<&str>, window: Option<(i64, i64)>) -> SearchSet {
        let mut config = Config::default();
        config.seeds.push("http://a.test/".to_string());
        config.output.out_urls = Some(std::path::PathBuf::from("/tmp/skein_urls.txt"));
        config.search.search_emails = emails;
        config.search.search_mailtos = mailtos;
        config.search.email_names = names.map(str::to_string);
        config.search.email_names_lines = window;
        crate::config::validate(&config).unwrap()
    }

    #[test]
    fn test_decode_utf8_default() {
        let text = decode_body("héllo".as_bytes(), "text/html");
        assert_eq!(text, "héllo");
    }

    #[test]
    fn test_decode_header_charset() {
        // "café" in latin-1
        let body = [0x63, 0x61, 0x66, 0xE9];
        let text = decode_body(&body, "text/html; charset=iso-8859-1");
        assert_eq!(text, "café");
    }

    #[test]
    fn test_html_declared_charset_wins_over_header() {
        let mut body = b"<html><head><meta charset=\"iso-8859-1\"></head><body>caf".to_vec();
        body.push(0xE9);
        body.extend_from_slice(b"</body></html>");

        // The header claims UTF-8; the meta declaration is what decodes 0xE9
        let text = decode_body(&body, "text/html; charset=utf-8");
        assert!(text.contains("café"));
    }

    #[test]
    fn test_meta_charset_only_sniffed_near_the_top() {
        let mut body = vec![b' '; 2048];
        body.extend_from_slice(b"<meta charset=\"iso-8859-1\">");
        assert_eq!(meta_charset(&body), None);
    }

    #[test]
    fn test_header_charset_parsing() {
        assert_eq!(
            header_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            header_charset("text/html; charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(header_charset("text/html"), None);
    }

    #[test]
    fn test_regex_records_carry_url_and_line() {
        let patterns = vec![compile_regex(r"t\w+n").unwrap()];
        let lines = vec!["nothing here", "a token and a train", "token"];

        let records = regex_matches(&url("http://a.test/p"), &lines, &patterns);
        assert_eq!(
            records,
            vec![
                "http://a.test/p:1: token",
                "http://a.test/p:1: train",
                "http://a.test/p:2: token",
            ]
        );
    }

    #[test]
    fn test_regex_line_numbers_are_zero_based() {
        let patterns = vec![compile_regex("hit").unwrap()];
        let lines = vec!["hit"];

        let records = regex_matches(&url("http://a.test/"), &lines, &patterns);
        assert_eq!(records, vec!["http://a.test/:0: hit"]);
    }

    #[test]
    fn test_email_scan_plain() {
        let search = search_set(true, false, None, None);
        let lines = vec!["contact us at jane@x.test or visit"];

        assert_eq!(email_records(&lines, &search), vec!["jane@x.test"]);
    }

    #[test]
    fn test_email_scan_off_without_flags() {
        let search = search_set(false, false, None, None);
        let lines = vec!["jane@x.test"];
        assert!(email_records(&lines, &search).is_empty());
    }

    #[test]
    fn test_mailto_scan_strips_prefix() {
        let search = search_set(false, true, None, None);
        let lines = vec![r#"<a href="mailto: jane@x.test">mail</a>"#, "bare@x.test"];

        // Only the mailto-prefixed address matches in mailto mode
        assert_eq!(email_records(&lines, &search), vec!["jane@x.test"]);
    }

    #[test]
    fn test_email_name_found_globally() {
        let search = search_set(true, false, Some(r"Dr\.\s+([A-Za-z ]+)"), None);
        let lines = vec!["Dr. Jane Roe", "", "jane@x.test"];

        assert_eq!(email_records(&lines, &search), vec!["Jane Roe <jane@x.test>"]);
    }

    #[test]
    fn test_email_name_window_hits() {
        let search = search_set(true, false, Some(r"Dr\.\s+([A-Za-z ]+)"), Some((-3, -1)));
        let mut lines = vec![""; 13];
        lines[10] = "Dr. Jane Roe";
        lines[12] = "jane@x.test";

        assert_eq!(email_records(&lines, &search), vec!["Jane Roe <jane@x.test>"]);
    }

    #[test]
    fn test_email_name_window_misses() {
        let search = search_set(true, false, Some(r"Dr\.\s+([A-Za-z ]+)"), Some((-1, -1)));
        let mut lines = vec![""; 13];
        lines[10] = "Dr. Jane Roe";
        lines[12] = "jane@x.test";

        // The name sits outside the one-line window, so only the address is kept
        assert_eq!(email_records(&lines, &search), vec!["jane@x.test"]);
    }

    #[test]
    fn test_email_name_window_clamps_to_page() {
        let search = search_set(true, false, Some(r"(Jane)"), Some((-10, 10)));
        let lines = vec!["Jane", "jane@x.test"];

        assert_eq!(email_records(&lines, &search), vec!["Jane <jane@x.test>"]);
    }

    #[test]
    fn test_name_is_whole_match_without_capture_group() {
        let search = search_set(true, false, Some(r"Dr\. [A-Za-z]+"), None);
        let lines = vec!["Dr. Jane", "jane@x.test"];

        assert_eq!(email_records(&lines, &search), vec!["Dr. Jane <jane@x.test>"]);
    }
}
