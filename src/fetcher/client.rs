use crate::fetcher::{
    backoff::retry_delay,
    errors::FetchError,
    pipeline::process_response,
    types::{FetchOptions, PageRequest, PageResponse},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client, ClientBuilder,
    header::{self, HeaderMap, HeaderValue},
};
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

/// Desktop browser signatures, rotated per attempt.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const REFERER: &str = "https://www.google.com/";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Budget for a whole `fetch_page` call, retries included.
    pub overall_timeout: Duration,
    /// Budget for a single attempt.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Backoff unit; attempt `n` waits `retry_base_delay * (n + 1)`.
    pub retry_base_delay: Duration,
    pub max_body_size: u64,
    pub max_redirects: usize,
    pub pool_max_idle_per_host: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            retry_base_delay: Duration::from_millis(250),
            max_body_size: 5 * 1024 * 1024, // 5MB
            max_redirects: 10,
            pool_max_idle_per_host: 10,
        }
    }
}

/// A single HTTP GET. Non-2xx answers come back as `Ok` with their status;
/// classifying them is the [`Fetcher`]'s job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: PageRequest) -> Result<PageResponse, FetchError>;
}

/// reqwest-backed transport. The client keeps idle keep-alive connections
/// per host, so repeated fetches against one publisher reuse sockets.
pub struct ReqwestTransport {
    client: Client,
    max_body_size: u64,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body_size: config.max_body_size,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: PageRequest) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let final_url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            return process_response(final_url, status, headers, Bytes::new(), "text/html");
        }

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > self.max_body_size
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        // Content-Length may be missing or wrong
        if body_bytes.len() as u64 > self.max_body_size {
            return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
        }

        process_response(final_url, status, headers, body_bytes, &content_type)
    }
}

/// Fetch-with-retry over an [`HttpTransport`].
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    config: FetchConfig,
}

impl Fetcher {
    /// Fetcher over the default reqwest transport.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url`, retrying non-2xx answers and transient network errors up to
    /// `max_retries` more times. The last error is returned once attempts run
    /// out. The whole call is bounded by the options' deadline (or the
    /// configured overall timeout) and by the optional cancellation token.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_page(
        &self,
        url: &str,
        options: &FetchOptions,
        max_retries: u32,
    ) -> Result<PageResponse, FetchError> {
        let url = Url::parse(url)?;
        let deadline = Instant::now() + options.deadline.unwrap_or(self.config.overall_timeout);
        let cancel = options.cancel.clone().unwrap_or_else(CancellationToken::new);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            outcome = timeout_at(deadline, self.attempt_with_retries(url, &options.headers, max_retries)) => {
                outcome.unwrap_or_else(|_| {
                    warn!("fetch deadline exceeded");
                    Err(FetchError::DeadlineExceeded)
                })
            }
        }
    }

    async fn attempt_with_retries(
        &self,
        url: Url,
        extra_headers: &HeaderMap,
        max_retries: u32,
    ) -> Result<PageResponse, FetchError> {
        let mut attempt = 0;

        loop {
            let request = PageRequest {
                url: url.clone(),
                headers: browser_headers(attempt, extra_headers),
            };

            let error = match self.transport.get(request).await {
                Ok(page) if page.status.is_success() => {
                    debug!(
                        attempt,
                        status = %page.status,
                        bytes = page.body_raw.len(),
                        "fetched page"
                    );
                    return Ok(page);
                }
                Ok(page) => FetchError::Http {
                    status: page.status,
                },
                Err(error) => error,
            };

            if attempt >= max_retries || !error.should_retry() {
                warn!(attempts = attempt + 1, error = %error, "fetch failed");
                return Err(error);
            }

            let delay = retry_delay(attempt, self.config.retry_base_delay);
            debug!(
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "fetch attempt failed, backing off"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Browser-like request headers for attempt `attempt`; `extra` overrides them.
pub fn browser_headers(attempt: u32, extra: &HeaderMap) -> HeaderMap {
    let user_agent = USER_AGENTS[attempt as usize % USER_AGENTS.len()];

    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));

    for (name, value) in extra {
        headers.insert(name.clone(), value.clone());
    }
    headers
}
