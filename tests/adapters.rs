mod common;

use common::memory_store;
use std::time::Duration;
use unified_scraper::backend::{
    Backend, BrowserSettings, CrawlerBackend, FeedBackend, HttpBackend, http_client,
};
use unified_scraper::{BackendKind, BackendRegistry, Error, Strategy, TargetOptions, UnifiedScraper};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn article_page() -> String {
    let paragraph = "<p>Copper prices climbed for a third session on Tuesday, as smelters in Chile \
                     and Peru cut output, and traders bet that tighter supply would outlast the \
                     slowdown in Chinese demand, according to analysts at several banks.</p>";
    format!(
        "<html><head><title>Copper climbs</title><script>track()</script></head><body>\
         <nav><a href=\"/\">Home</a> <a href=\"/markets\">Markets</a></nav>\
         <article>{}{}{}</article>\
         <footer>Copyright</footer></body></html>",
        paragraph, paragraph, paragraph
    )
}

fn rss_feed() -> String {
    let items: String = (1..=4)
        .map(|i| {
            format!(
                "<item><title>Mine update {i}</title><description>Production at site {i} rose \
                 on stronger grades.</description><link>https://x.com/{i}</link></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Mining Wire</title>\
         <link>https://x.com</link><description>Daily mining news</description>{}</channel></rss>",
        items
    )
}

async fn serve(server: &MockServer, route: &str, body: String, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, content_type),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn http_backend_reads_content_containers() {
    let server = MockServer::start().await;
    serve(&server, "/copper", article_page(), "text/html; charset=utf-8").await;

    let backend = HttpBackend::new(http_client().unwrap());
    let url = format!("{}/copper", server.uri());
    let result = backend
        .fetch(&url, &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.title, "Copper climbs");
    assert!(result.content().contains("smelters in Chile"));
    assert!(!result.content().contains("track()"));
    assert!(!result.content().contains("Markets"));
    assert_eq!(result.metadata["matched_selectors"][0], "article");
    assert_eq!(result.metadata["content_type"], "text/html; charset=utf-8");
}

#[tokio::test]
async fn target_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_page()))
        .expect(1)
        .mount(&server)
        .await;

    let mut target = TargetOptions::default();
    target.headers.insert("x-api-key".into(), "secret".into());

    let backend = HttpBackend::new(http_client().unwrap());
    let result = backend
        .fetch(&format!("{}/private", server.uri()), &target, TIMEOUT)
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(http_client().unwrap());
    let err = backend
        .fetch(&format!("{}/down", server.uri()), &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status(503)));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_page())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::new(http_client().unwrap());
    let err = backend
        .fetch(
            &format!("{}/slow", server.uri()),
            &TargetOptions::default(),
            Duration::from_millis(300),
        )
        .await
        .unwrap_err();
    match err {
        Error::Http(e) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn feed_backend_renders_entries() {
    let server = MockServer::start().await;
    serve(&server, "/news.rss", rss_feed(), "application/rss+xml").await;

    let backend = FeedBackend::new(http_client().unwrap());
    let result = backend
        .fetch(&format!("{}/news.rss", server.uri()), &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.title, "Mining Wire");
    assert!(result.content().starts_with("Feed: Mining Wire"));
    assert!(result.content().contains("Title: Mine update 4"));
    assert_eq!(result.metadata["feed_entries"], 4);
    assert_eq!(result.metadata["feed_info"]["description"], "Daily mining news");
}

#[tokio::test]
async fn feed_backend_rejects_html() {
    let server = MockServer::start().await;
    serve(&server, "/feed/", article_page(), "text/html").await;

    let backend = FeedBackend::new(http_client().unwrap());
    let err = backend
        .fetch(&format!("{}/feed/", server.uri()), &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Feed(_)));
}

#[tokio::test]
async fn crawler_backend_extracts_main_text() {
    let server = MockServer::start().await;
    serve(&server, "/story", article_page(), "text/html").await;

    let backend = CrawlerBackend::new(http_client().unwrap());
    let result = backend
        .fetch(&format!("{}/story", server.uri()), &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.content().contains("Copper prices climbed"));
    assert!(result.metadata.contains_key("links"));
}

#[tokio::test]
async fn standard_registry_routes_feeds_end_to_end() {
    let server = MockServer::start().await;
    serve(&server, "/feed/", rss_feed(), "application/rss+xml").await;

    let registry = BackendRegistry::standard(&BrowserSettings::default()).unwrap();
    let scraper = UnifiedScraper::new(memory_store().await, registry, None);
    let strategy = Strategy::new(BackendKind::Crawler, vec![BackendKind::Http]).with_rate_limit(0.0);

    let result = scraper
        .scrape(&format!("{}/feed/", server.uri()), None, &strategy)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.scraper_used(), "feedparser");
    assert_eq!(scraper.intelligence().attempt_count().await.unwrap(), 1);
}

#[tokio::test]
async fn standard_registry_falls_back_past_broken_pages() {
    let server = MockServer::start().await;
    serve(&server, "/page", article_page(), "text/html").await;

    let registry = BackendRegistry::standard(&BrowserSettings::default()).unwrap();
    let scraper = UnifiedScraper::new(memory_store().await, registry, None);
    // The feed parser cannot read HTML, so http has to pick it up.
    let strategy = Strategy::new(BackendKind::Feed, vec![BackendKind::Http]).with_rate_limit(0.0);

    let result = scraper
        .scrape(&format!("{}/page", server.uri()), None, &strategy)
        .await
        .unwrap();
    assert_eq!(result.scraper_used(), "http");
    assert_eq!(scraper.intelligence().attempt_count().await.unwrap(), 2);
}

#[cfg(not(feature = "headless"))]
#[tokio::test]
async fn headless_needs_its_feature() {
    let backend = unified_scraper::backend::HeadlessBackend::new(None);
    let err = backend
        .fetch("https://example.com", &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(BackendKind::Headless)));
}

#[cfg(not(feature = "webdriver"))]
#[tokio::test]
async fn webdriver_needs_its_feature() {
    let backend = unified_scraper::backend::WebDriverBackend::new("http://localhost:4444".into());
    let err = backend
        .fetch("https://example.com", &TargetOptions::default(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(BackendKind::Browser)));
}
