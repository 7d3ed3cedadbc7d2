//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitemapper::config::{parse_config, Config};
use sitemapper::crawler::{crawl, Coordinator};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `root`
///
/// `extra` is inserted before the tables, so it may carry top-level keys
/// such as `changefreq` and `priority`.
fn create_test_config(root: &str, output: &str, extra: &str) -> Config {
    parse_config(&format!(
        r#"
{extra}

[crawler]
root-url = "{root}"
max-tasks = 3
request-timeout = 5
probe-timeout = 5

[output]
path = '{output}'
timezone-offset = 3
"#
    ))
    .expect("test config is valid")
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    let body: String = body.into();
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_page_site_terminates() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a> <a href="/b">B</a>"#).await;
    mount_page(&server, "/a", r#"<a href="/">home</a>"#).await;
    mount_page(&server, "/b", "<p>leaf</p>").await;

    let config = create_test_config(&format!("{}/", base_url), "unused.xml", "");
    let coordinator = Coordinator::new(config).unwrap();

    let done = tokio::time::timeout(Duration::from_secs(20), coordinator.crawl())
        .await
        .expect("crawl did not terminate");

    assert_eq!(done.len(), 3);
    assert!(done.values().all(|entry| entry.ok));
    assert!(done.contains_key(&format!("{}/a", base_url)));
    assert!(done.contains_key(&format!("{}/b", base_url)));

    let counts = coordinator.frontier().counts();
    assert_eq!(counts.queued, 0);
    assert_eq!(counts.in_flight, 0);
    assert_eq!(counts.active_tasks, 0);
}

#[tokio::test]
async fn test_unreachable_root_records_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let root = format!("http://127.0.0.1:{}/", port);
    let coordinator = Coordinator::new(create_test_config(&root, "unused.xml", "")).unwrap();

    let done = tokio::time::timeout(Duration::from_secs(20), coordinator.crawl())
        .await
        .expect("crawl did not terminate");

    assert_eq!(done.len(), 1);
    let entry = &done[&root];
    assert!(!entry.ok);
    assert!(!entry.has_metadata());
}

#[tokio::test]
async fn test_image_confirmed_by_probe() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<p><img src="a.jpg" title="Cat"></p>"#).await;
    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let root = format!("{}/", base_url);
    let coordinator = Coordinator::new(create_test_config(&root, "unused.xml", "")).unwrap();
    let done = coordinator.crawl().await;

    let images = &done[&root].images;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].src, format!("{}/a.jpg", base_url));
    assert_eq!(images[0].title.as_deref(), Some("Cat"));
    assert_eq!(images[0].caption, None);
}

#[tokio::test]
async fn test_image_rejected_when_not_an_image() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<img src="/fake.jpg"><img src="/missing.png">"#).await;
    mount_page(&server, "/fake.jpg", "<p>not an image</p>").await;

    let root = format!("{}/", server.uri());
    let coordinator = Coordinator::new(create_test_config(&root, "unused.xml", "")).unwrap();
    let done = coordinator.crawl().await;

    assert!(done[&root].ok);
    assert!(done[&root].images.is_empty());
}

#[tokio::test]
async fn test_image_shared_across_pages_fetched_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", r#"<img src="/logo.png" title="Logo">"#).await;
    mount_page(&server, "/b", r#"<img src="/logo.png">"#).await;
    // Slow enough that both pages ask while the first check is running
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let root = format!("{}/", base_url);
    let config = create_test_config(&root, "unused.xml", "");
    let coordinator = Coordinator::new(config).unwrap();
    let done = coordinator.crawl().await;

    assert_eq!(done.len(), 3);
    let logo = format!("{}/logo.png", base_url);
    for page in ["a", "b"] {
        let images = &done[&format!("{}/{}", base_url, page)].images;
        assert_eq!(images.len(), 1, "/{} lost its image", page);
        assert_eq!(images[0].src, logo);
    }
    assert_eq!(coordinator.frontier().counts().pending_images, 0);
}

#[tokio::test]
async fn test_excluded_and_off_site_links_skipped() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/admin/panel">admin</a>
           <a href="/photo.png">photo</a>
           <a href="https://elsewhere.example/">away</a>
           <a href="mailto:someone@example.com">mail</a>
           <a href="/page">page</a>"#,
    )
    .await;
    mount_page(&server, "/page", "<p>page</p>").await;
    Mock::given(method("GET"))
        .and(path("/admin/panel"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let root = format!("{}/", base_url);
    let mut config = create_test_config(&root, "unused.xml", "");
    config.filters.exclude_urls = vec![r"\.png$".to_string(), "/admin/".to_string()];

    let coordinator = Coordinator::new(config).unwrap();
    let done = coordinator.crawl().await;

    let page = format!("{}/page", base_url);
    let urls: Vec<&str> = done.keys().map(String::as_str).collect();
    assert_eq!(urls, vec![root.as_str(), page.as_str()]);
}

#[tokio::test]
async fn test_heavily_linked_pages_recorded_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    // Every page links to every other page, with fragments and duplicates
    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{i}">p{i}</a><a href="/p{i}#top">again</a>"#))
        .collect();
    mount_page(&server, "/", &links).await;
    for i in 0..10 {
        mount_page(&server, &format!("/p{}", i), &links).await;
    }

    let root = format!("{}/", base_url);
    let coordinator = Coordinator::new(create_test_config(&root, "unused.xml", "")).unwrap();
    let done = tokio::time::timeout(Duration::from_secs(30), coordinator.crawl())
        .await
        .expect("crawl did not terminate");

    assert_eq!(done.len(), 11);
    assert!(done.keys().all(|url| !url.contains('#')));
    for i in 0..10 {
        let requests = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == format!("/p{}", i))
            .count();
        assert_eq!(requests, 1, "/p{} fetched more than once", i);
    }
}

#[tokio::test]
async fn test_non_html_and_error_pages_are_reachable() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(&server, "/", r#"<a href="/data.json">json</a><a href="/gone">gone</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"<a href="/never">x</a>"#, "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;

    let root = format!("{}/", base_url);
    let coordinator = Coordinator::new(create_test_config(&root, "unused.xml", "")).unwrap();
    let done = coordinator.crawl().await;

    assert_eq!(done.len(), 3);
    assert!(done.values().all(|entry| entry.ok));
    assert!(!done.contains_key(&format!("{}/never", base_url)));
    assert!(server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .all(|r| r.url.path() != "/never"));
}

#[tokio::test]
async fn test_full_run_writes_xml_sitemap() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("sitemap.xml");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html(r#"<a href="/blog/post1">post</a><img src="/cat.jpg" title="Cat &amp; Dog">"#)
                .insert_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/blog/post1", "<p>post</p>").await;
    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(&server)
        .await;

    let root = format!("{}/", base_url);
    let config = create_test_config(
        &root,
        &output.to_string_lossy(),
        r#"
changefreq = [
    { pattern = "/blog/", value = "weekly" },
    { pattern = "/", value = "daily" },
]
priority = [
    { pattern = "/blog/", value = 0.6 },
    { pattern = "/", value = 1.0 },
]
"#,
    );

    let report = crawl(config).await.unwrap();
    assert_eq!(report.done, 2);
    assert_eq!(report.ok, 2);
    assert_eq!(report.images, 1);
    assert_eq!(report.queued, 0);
    assert_eq!(report.in_flight, 0);

    let xml = std::fs::read_to_string(&output).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\""));
    assert!(xml.contains(&format!(
        "<url><loc>{}/</loc><lastmod>2015-10-21T10:28:00+03:00</lastmod>\
         <changefreq>daily</changefreq><priority>1.0</priority>\
         <image:image><image:loc>{}/cat.jpg</image:loc>\
         <image:title>Cat &amp; Dog</image:title></image:image></url>",
        base_url, base_url
    )));
    assert!(xml.contains(&format!(
        "<url><loc>{}/blog/post1</loc><changefreq>weekly</changefreq><priority>0.6</priority></url>",
        base_url
    )));
    assert!(xml.trim_end().ends_with("</urlset>"));
}

#[tokio::test]
async fn test_full_run_writes_plain_list() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("sitemap.txt");

    mount_page(&server, "/", r#"<a href="/z">z</a><a href="/a">a</a>"#).await;
    mount_page(&server, "/a", "").await;
    mount_page(&server, "/z", "").await;

    let root = format!("{}/", base_url);
    let mut config = create_test_config(&root, &output.to_string_lossy(), "");
    config.output.format = "plain-list".parse().unwrap();

    crawl(config).await.unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        format!("{0}/\n{0}/a\n{0}/z\n", base_url)
    );
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>home</p>").await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("missing").join("sitemap.xml");

    let root = format!("{}/", server.uri());
    let config = create_test_config(&root, &output.to_string_lossy(), "");

    assert!(crawl(config).await.is_err());
}
