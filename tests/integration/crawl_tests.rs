//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive full
//! crawl runs end-to-end, asserting on the requests the server saw and the
//! artifact files the run produced.

use skein::config::Config;
use skein::Coordinator;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal config: one seed, URL log into the given directory
fn base_config(seed: &str, scratch: &Path) -> Config {
    let mut config = Config::default();
    config.seeds.push(seed.to_string());
    config.output.out_urls = Some(scratch.join("urls.txt"));
    config
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn run_crawl(config: Config) {
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    coordinator.run().await.expect("Crawl failed");
}

#[tokio::test]
async fn test_breadth_first_same_host_scope() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    // The index links one same-host page and one external page
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(format!(
            r#"<html><body>
                <a href="{base_url}/x">Local</a>
                <a href="http://b.test/y">External</a>
            </body></html>"#
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html_response("<html><body>Leaf</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.scope.recurse = true;
    config.scope.max_depth = 1;
    run_crawl(config).await;

    // Only the two same-host pages were fetched, root first
    assert_eq!(requested_paths(&mock_server).await, vec!["/", "/x"]);
    assert_eq!(
        read_lines(&scratch.path().join("urls.txt")),
        vec![format!("{base_url}/"), format!("{base_url}/x")]
    );
}

#[tokio::test]
async fn test_page_template_expansion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    for page in [1, 2, 5] {
        Mock::given(method("GET"))
            .and(path(format!("/p={page}")))
            .respond_with(html_response("<html><body>page</body></html>".to_string()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = base_config(&format!("{base_url}/p={{page}}"), scratch.path());
    config.pages = vec![1, 2, 5];
    run_crawl(config).await;

    assert_eq!(requested_paths(&mock_server).await.len(), 3);
}

#[tokio::test]
async fn test_stop_on_404_halts_dispatch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/p/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(html_response("<html><body>page</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/p/{{page}}"), scratch.path());
    config.pages = (1..=10).collect();
    config.stop.stop_on_404 = true;
    // One fetch slot serializes the workers so the 404 lands before page 4
    config.network.max_threads = 1;
    run_crawl(config).await;

    let paths = requested_paths(&mock_server).await;
    assert!(paths.contains(&"/p/1".to_string()));
    assert!(paths.contains(&"/p/2".to_string()));
    assert!(paths.contains(&"/p/3".to_string()));
    for page in 4..=10 {
        assert!(
            !paths.contains(&format!("/p/{page}")),
            "page {page} was fetched after the 404"
        );
    }
}

#[tokio::test]
async fn test_cloudflare_requeue_retries_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    let challenge = r#"<html><head><title>Attention Required! | Cloudflare</title></head>
        <body>Checking your browser</body></html>"#;

    // First GET answers the challenge, the second succeeds
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string(challenge)
                .insert_header("content-type", "text/html"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<html><body>Through</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.stop.requeue_cloudflare = true;
    run_crawl(config).await;

    // Exactly two GETs for the URL, one recorded success
    assert_eq!(requested_paths(&mock_server).await, vec!["/", "/"]);
    assert_eq!(
        read_lines(&scratch.path().join("urls.txt")),
        vec![format!("{base_url}/")]
    );
}

#[tokio::test]
async fn test_cloudflare_without_requeue_drops() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    let challenge = r#"<html><head><title>Attention Required! | Cloudflare</title></head></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string(challenge)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = base_config(&format!("{base_url}/"), scratch.path());
    run_crawl(config).await;

    assert!(read_lines(&scratch.path().join("urls.txt")).is_empty());
}

#[tokio::test]
async fn test_email_names_window() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    // "Dr. Jane Roe" on line 10, the address on line 12
    let mut lines = vec![""; 13];
    lines[0] = "<html><body><pre>";
    lines[10] = "Dr. Jane Roe";
    lines[12] = "jane@x.test</pre></body></html>";
    let body = lines.join("\n");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(body))
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.search.search_emails = true;
    config.search.email_names = Some(r"Dr\.\s+([A-Za-z ]+)".to_string());
    config.search.email_names_lines = Some((-3, -1));
    config.output.out_emails = Some(scratch.path().join("emails.txt"));
    run_crawl(config).await;

    assert_eq!(
        read_lines(&scratch.path().join("emails.txt")),
        vec!["Jane Roe <jane@x.test>"]
    );
}

#[tokio::test]
async fn test_depth_first_with_ignore_pattern() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body>
                <a href="/a">A</a>
                <a href="/skip/b">Skipped</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_response(
            r#"<html><body><a href="/a/1">Deeper</a></body></html>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a/1"))
        .respond_with(html_response("<html><body>Leaf</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/skip/b"))
        .respond_with(html_response("<html><body>Never</body></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.scope.recurse = true;
    config.scope.max_depth = 2;
    config.scope.depth_first = true;
    config.scope.recurse_ignore_patterns = vec!["^/skip".to_string()];
    run_crawl(config).await;

    let paths = requested_paths(&mock_server).await;
    assert!(paths.contains(&"/a".to_string()));
    assert!(paths.contains(&"/a/1".to_string()));
    assert!(!paths.contains(&"/skip/b".to_string()));
}

#[tokio::test]
async fn test_regex_search_records_url_and_line() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    let body = "<html><body>\nnothing\nserial: ABC-123\n</body></html>";
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(body.to_string()))
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.search.search_regexes = vec![r"ABC-\d+".to_string()];
    config.output.out_regex = Some(scratch.path().join("matches.txt"));
    run_crawl(config).await;

    assert_eq!(
        read_lines(&scratch.path().join("matches.txt")),
        vec![format!("{base_url}/:2: ABC-123")]
    );
}

#[tokio::test]
async fn test_stop_pattern_suppresses_recursion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body>LAST-PAGE-MARKER <a href="/next">Next</a></body></html>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html_response("<html><body>More</body></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.scope.recurse = true;
    config.scope.max_depth = 3;
    config.stop.stop_pattern = Some("LAST-PAGE-MARKER".to_string());
    run_crawl(config).await;

    assert_eq!(requested_paths(&mock_server).await, vec!["/"]);
}

#[tokio::test]
async fn test_selective_download_skips_binary_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();
    let mirror = scratch.path().join("mirror");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body>
                <a href="/page.html">Page</a>
                <a href="/big.zip">Archive</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(html_response("<html><body>Saved</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    // The archive fails every download rule and has a binary extension, so
    // no GET is ever issued for it
    Mock::given(method("GET"))
        .and(path("/big.zip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/"), scratch.path());
    config.scope.recurse = true;
    config.scope.max_depth = 1;
    config.download.extensions = vec!["html".to_string()];
    config.output.out_dir = Some(mirror.clone());
    run_crawl(config).await;

    let paths = requested_paths(&mock_server).await;
    assert!(paths.contains(&"/page.html".to_string()));
    assert!(!paths.contains(&"/big.zip".to_string()));

    // The qualifying page was mirrored under <out_dir>/<host>/<path>
    let host_dir = mirror
        .join(url::Url::parse(&base_url).unwrap().host_str().unwrap().to_string());
    let mirrored: Vec<_> = walk_files(&host_dir);
    assert!(
        mirrored.iter().any(|p| p.ends_with("page.html")),
        "expected page.html in mirror tree, found {mirrored:?}"
    );
}

#[tokio::test]
async fn test_no_parent_confines_crawl_to_subtree() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html_response(
            r#"<html><body>
                <a href="/docs/guide">Guide</a>
                <a href="/elsewhere">Outside</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/guide"))
        .respond_with(html_response("<html><body>Guide</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(html_response("<html><body>Never</body></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = base_config(&format!("{base_url}/docs/"), scratch.path());
    config.scope.recurse = true;
    config.scope.max_depth = 2;
    config.scope.no_parent = true;
    run_crawl(config).await;

    let paths = requested_paths(&mock_server).await;
    assert!(paths.contains(&"/docs/guide".to_string()));
    assert!(!paths.contains(&"/elsewhere".to_string()));
}

#[tokio::test]
async fn test_depth_zero_fetches_without_recursing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body><a href="/linked">Linked</a></body></html>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    // Without --recurse the seed is fetched but its links are not followed
    let config = base_config(&format!("{base_url}/"), scratch.path());
    run_crawl(config).await;

    assert_eq!(requested_paths(&mock_server).await, vec!["/"]);
}

fn walk_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else {
            files.push(path.display().to_string());
        }
    }
    files
}
