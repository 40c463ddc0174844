use crate::fetcher::{
    errors::FetchError,
    types::{Charset, PageResponse},
};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderMap};
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

/// How much of the body is scanned for `<meta>` charset declarations.
const SNIFF_WINDOW: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Bytes,
    content_type: &str,
) -> Result<PageResponse, FetchError> {
    let charset = detect_charset(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, &charset);

    Ok(PageResponse {
        url_final,
        status,
        headers,
        body_raw: body_bytes,
        body_utf8,
        charset,
        fetched_at: Utc::now(),
    })
}

/// Declared charset first (header, `<meta charset>`, `<meta http-equiv>`),
/// statistical detection last.
fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    if let Some(encoding) = declared_encoding(&CHARSET_REGEX, content_type) {
        return Charset::from_encoding(encoding);
    }

    let head = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let head_str = String::from_utf8_lossy(head);

    for pattern in [&*META_CHARSET_REGEX, &*META_HTTP_EQUIV_REGEX] {
        if let Some(encoding) = declared_encoding(pattern, &head_str) {
            return Charset::from_encoding(encoding);
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, false);
    Charset::from_encoding(detector.guess(None, true))
}

fn declared_encoding(pattern: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

/// Malformed sequences become U+FFFD; a stray bad byte never costs the page.
fn decode_to_utf8(body_bytes: &[u8], charset: &Charset) -> String {
    let encoding = charset.encoding();
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        warn!(
            encoding = encoding.name(),
            "body had malformed sequences, decoded lossily"
        );
    }

    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_charset_from_content_type() {
        let content_type = "text/html; charset=utf-8";
        let body = b"<html><head><title>Test</title></head></html>";

        assert_eq!(detect_charset(content_type, body), Charset::Utf8);
    }

    #[test]
    fn test_detect_charset_from_meta_tag() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"><title>Test</title></head></html>";

        // encoding_rs maps ISO-8859-1 to its windows-1252 superset
        assert_eq!(detect_charset("text/html", body), Charset::Windows1252);
    }

    #[test]
    fn test_detect_charset_from_meta_http_equiv() {
        let body = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\"><title>Test</title></head></html>";

        assert_eq!(detect_charset("text/html", body), Charset::Windows1252);
    }

    #[test]
    fn test_header_charset_wins_over_meta() {
        let body = b"<html><head><meta charset=\"windows-1252\"></head></html>";

        assert_eq!(detect_charset("text/html; charset=UTF-8", body), Charset::Utf8);
    }

    #[test]
    fn test_decode_latin1_body() {
        // "café" in windows-1252
        let body = [0x63, 0x61, 0x66, 0xE9];

        assert_eq!(decode_to_utf8(&body, &Charset::Windows1252), "café");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let body = [0x66, 0x6F, 0xFF, 0x6F];

        assert_eq!(decode_to_utf8(&body, &Charset::Utf8), "fo\u{FFFD}o");
    }

    #[test]
    fn test_stray_byte_keeps_page() {
        let url = Url::parse("https://news.example.com/story").unwrap();
        let mut body = format!(
            "<article><p>{}</p></article>",
            "Miners sold more coins than usual after the difficulty adjustment. ".repeat(13)
        )
        .into_bytes();
        body[100] = 0xFF;

        let page = process_response(
            url,
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from(body),
            "text/html; charset=utf-8",
        )
        .unwrap();

        assert_eq!(page.charset, Charset::Utf8);
        assert!(page.body_utf8.contains('\u{FFFD}'));
        assert!(page.body_utf8.ends_with("</p></article>"));
    }

    #[test]
    fn test_process_response_decodes_body() {
        let url = Url::parse("https://news.example.com/story").unwrap();
        let body = Bytes::from("<p>Hello, 世界!</p>");

        let page = process_response(
            url.clone(),
            StatusCode::OK,
            HeaderMap::new(),
            body,
            "text/html; charset=utf-8",
        )
        .unwrap();

        assert_eq!(page.url_final, url);
        assert_eq!(page.body_utf8, "<p>Hello, 世界!</p>");
        assert_eq!(page.charset, Charset::Utf8);
    }
}
