use reqwest::StatusCode;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use crate::extractor::{
    ExtractError, ExtractionRules, Extractor, FeedIndex, FeedItem, Fallback, StrategyTag,
    analyze_page,
};
use crate::fetcher::client::MockHttpTransport;
use crate::fetcher::{FetchConfig, FetchError, Fetcher, PageRequest, PageResponse};

const ARTICLE_URL: &str = "https://news.example.com/markets/stablecoin-supply";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/extractor/tests/fixtures/{name}"))
        .expect("Failed to read test fixture")
}

fn extractor(transport: MockHttpTransport) -> Extractor {
    let config = FetchConfig {
        retry_base_delay: Duration::ZERO,
        ..FetchConfig::default()
    };
    Extractor::new(Fetcher::with_transport(Arc::new(transport), config))
}

/// Serves `page` for the article and `amp` (or a 404) for its AMP mirror.
fn serving(page: String, amp: Option<String>) -> MockHttpTransport {
    let mut transport = MockHttpTransport::new();
    transport.expect_get().returning(move |request: PageRequest| {
        if request.url.path().ends_with("/amp/") {
            return Ok(match &amp {
                Some(html) => PageResponse::from_html(request.url, StatusCode::OK, html.clone()),
                None => PageResponse::from_html(request.url, StatusCode::NOT_FOUND, ""),
            });
        }
        Ok(PageResponse::from_html(request.url, StatusCode::OK, page.clone()))
    });
    transport
}

fn words(chars: usize) -> String {
    "Liquidity providers pulled funds from the pool as volatility rose. "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}

#[tokio::test]
async fn test_extract_article() {
    let extractor = extractor(serving(fixture("article.html"), None));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Selectors);
    assert_eq!(result.metadata.source_url, ARTICLE_URL);
    assert!(result.html.contains("combined supply of dollar-pegged tokens"));
    assert!(result.html.contains("short-term rates stay elevated"));
    assert!(!result.html.contains("<script"));
    assert!(!result.html.contains("<figure"));
    assert!(!result.html.contains("Share on X"));
    assert!(!result.html.contains("Related Stories"));
    assert!(!result.html.contains("Bitcoin slips"));

    // Relative links resolve against the page
    assert!(
        result
            .html
            .contains("https://news.example.com/policy/attestations")
    );
    assert!(result.metadata.text_length > 600);
}

#[tokio::test]
async fn test_article_with_trailing_nav() {
    let body = words(600);
    let html = format!(
        r#"<html><body><article><p>{body}</p><nav>Related Stories <a href="/x">Other</a></nav></article></body></html>"#
    );
    let extractor = extractor(serving(html, None));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Selectors);
    assert_eq!(result.html, format!("<p>{body}</p>"));
    assert_eq!(result.metadata.text_length, body.trim().chars().count());
}

#[test]
fn test_analyze_heuristic_page() {
    let rules = ExtractionRules::default();

    let sanitized = analyze_page(&fixture("heuristic.html"), &rules)
        .unwrap()
        .unwrap();

    assert_eq!(sanitized.strategy, StrategyTag::HeuristicPicker);
    assert!(sanitized.html.contains("flared"));
    assert!(!sanitized.html.contains("Most read"));
    assert!(!sanitized.html.contains("Home"));
}

#[tokio::test]
async fn test_paywall_links_out() {
    let extractor = extractor(serving(fixture("paywall.html"), None));

    let err = extractor.extract_article(ARTICLE_URL).await.unwrap_err();

    assert!(matches!(err, ExtractError::Paywall));
    assert_eq!(err.fallback(), Fallback::LinkOut);
}

#[tokio::test]
async fn test_short_page_uses_amp_mirror() {
    let page = format!("<html><body><article><p>{}</p></article></body></html>", words(260));
    let amp = format!(
        r#"<html><body><article><p>{}</p><p><a href="chart">Chart</a></p></article></body></html>"#,
        words(900)
    );
    let extractor = extractor(serving(page, Some(amp)));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::AmpFallback);
    assert!(result.metadata.text_length > 800);
    // Links in the mirror resolve against the mirror's URL
    assert!(
        result
            .html
            .contains("https://news.example.com/markets/stablecoin-supply/amp/chart")
    );
}

#[tokio::test]
async fn test_short_page_kept_when_amp_missing() {
    let page = format!("<html><body><article><p>{}</p></article></body></html>", words(260));
    let extractor = extractor(serving(page, None));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Selectors);
}

#[tokio::test]
async fn test_paywalled_amp_mirror_is_ignored() {
    let page = format!("<html><body><article><p>{}</p></article></body></html>", words(260));
    let amp = format!(
        "<html><body><article><p>{}</p><p>Premium content</p></article></body></html>",
        words(900)
    );
    let extractor = extractor(serving(page, Some(amp)));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Selectors);
}

#[tokio::test]
async fn test_nothing_extractable() {
    let extractor = extractor(serving(
        "<html><body><p>Loading...</p></body></html>".to_string(),
        None,
    ));

    let err = extractor.extract_article(ARTICLE_URL).await.unwrap_err();

    assert!(matches!(err, ExtractError::NoContentFound));
    assert_eq!(err.fallback(), Fallback::ShortDescription);
}

#[tokio::test]
async fn test_sanitized_away_is_insufficient() {
    let page = format!(
        "<html><body><article><p>{} Read our Blog.</p></article></body></html>",
        words(300)
    );
    let extractor = extractor(serving(page, None));

    let err = extractor.extract_article(ARTICLE_URL).await.unwrap_err();

    assert!(matches!(err, ExtractError::InsufficientContent { text_len: 0 }));
}

#[tokio::test]
async fn test_min_content_comes_from_rules() {
    let page = format!("<html><body><article><p>{}</p></article></body></html>", words(260));
    let mut rules = ExtractionRules::default();
    rules.thresholds.min_content = 400;
    let extractor = extractor(serving(page, None)).with_rules(rules);

    let err = extractor.extract_article(ARTICLE_URL).await.unwrap_err();

    assert!(matches!(err, ExtractError::InsufficientContent { text_len } if text_len > 200));
}

#[tokio::test]
async fn test_fetch_failure_surfaces_last_error() {
    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .times(3)
        .returning(|_| Err(FetchError::Dns("no such host".to_string())));
    let extractor = extractor(transport);

    let err = extractor.extract_article(ARTICLE_URL).await.unwrap_err();

    assert!(matches!(err, ExtractError::Fetch(FetchError::Dns(_))));
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn test_feed_content_skips_fetch() {
    let mut transport = MockHttpTransport::new();
    transport.expect_get().never();
    let feed = FeedIndex::new([FeedItem {
        link: format!("{ARTICLE_URL}?utm_source=rss"),
        content: format!(
            r#"<p>{}</p><p><a href="/data/supply">Data</a></p><script>track()</script>"#,
            words(250)
        ),
    }]);
    let extractor = extractor(transport).with_feed(Arc::new(feed));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Rss);
    assert!(!result.html.contains("<script"));
    assert!(result.html.contains("https://news.example.com/data/supply"));
}

#[tokio::test]
async fn test_short_feed_content_falls_back_to_page() {
    let feed = FeedIndex::new([FeedItem {
        link: ARTICLE_URL.to_string(),
        content: "<p>Teaser only.</p>".to_string(),
    }]);
    let extractor = extractor(serving(fixture("article.html"), None)).with_feed(Arc::new(feed));

    let result = extractor.extract_article(ARTICLE_URL).await.unwrap();

    assert_eq!(result.metadata.strategy, StrategyTag::Selectors);
}

#[tokio::test]
async fn test_cached_extraction_fetches_once() {
    let html = fixture("article.html");
    let mut transport = MockHttpTransport::new();
    transport.expect_get().times(1).returning(move |request: PageRequest| {
        Ok(PageResponse::from_html(request.url, StatusCode::OK, html.clone()))
    });
    let extractor = extractor(transport);

    let first = extractor.extract_article_cached(ARTICLE_URL).await.unwrap();
    let second = extractor
        .extract_article_cached(&format!("{ARTICLE_URL}/?utm_medium=social"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(extractor.get_cached_extraction(ARTICLE_URL).is_some());

    extractor.clear_cache();
    assert!(extractor.get_cached_extraction(ARTICLE_URL).is_none());
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let extractor = extractor(serving(fixture("paywall.html"), None));

    assert!(extractor.extract_article_cached(ARTICLE_URL).await.is_err());
    assert!(extractor.cache().is_empty());
}

#[test]
fn test_extraction_future_is_send() {
    fn assert_send<T: Send>(_: &T) {}

    let extractor = extractor(MockHttpTransport::new());
    let future = extractor.extract_article(ARTICLE_URL);
    assert_send(&future);
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use crate::extractor::cleaner::sanitize;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_analyze_never_panics(html in ".*") {
            let _ = analyze_page(&html, &ExtractionRules::default());
        }

        #[test]
        fn test_sanitize_is_stable(
            paragraphs in prop::collection::vec(
                prop_oneof![
                    4 => "[A-Za-z0-9 ,.|é]{0,160}",
                    1 => "(Updated|Reported|Markets) [1-9] (hour|hours|minute|minutes|days) ago",
                    1 => "[A-Za-z ]{0,80}(Jan|Sep|Oct) [1-9][0-9]?, 20[0-9]{2}[A-Za-z ]{0,40}",
                    1 => "By [A-Z][a-z]{2,8} [A-Z][a-z]{2,8} \\| Sep [1-9], 2025",
                    1 => Just("Related Stories".to_string()),
                ],
                0..16,
            ),
        ) {
            let rules = ExtractionRules::default();
            let html: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
            let once = sanitize(&html, &rules);
            prop_assert_eq!(sanitize(&once, &rules), once);
        }
    }
}
