use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::IngestConfig;
use crate::error::FetchError;

/// Source of raw documents: `fetch(url)` returns the response body.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches over HTTP, retrying transient failures with exponential backoff.
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    initial_backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            retries: config.retries,
            initial_backoff: config.initial_backoff,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        retry_with_backoff(|| self.fetch_once(url), self.retries, self.initial_backoff).await
    }
}

/// Retry helper with exponential backoff
async fn retry_with_backoff<F, Fut, T>(
    mut f: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && e.is_transient() => {
                let delay = initial_delay * (1u32 << attempt.min(16));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Serves documents from memory. Unknown URLs answer HTTP 404.
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut urls) = self.requested.lock() {
            urls.push(url.to_string());
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local server answering every request with `status` and no body.
    /// Returns its URL and the number of requests served so far.
    async fn serve_status(status: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/meps"), hits)
    }

    fn http_fetcher(retries: usize) -> HttpFetcher {
        HttpFetcher::new(&IngestConfig {
            retries,
            initial_backoff: Duration::from_millis(1),
            ..IngestConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn http_server_errors_are_retried_then_reported() {
        let (url, hits) = serve_status("503 Service Unavailable").await;

        let result = http_fetcher(2).fetch(&url).await;

        assert!(matches!(result, Err(FetchError::Status(503))));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn http_not_found_is_attempted_once() {
        let (url, hits) = serve_status("404 Not Found").await;

        let result = http_fetcher(2).fetch(&url).await;

        assert!(matches!(result, Err(FetchError::Status(404))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn static_fetcher_serves_known_urls() {
        let fetcher = StaticFetcher::new().with("https://example.test/a", "body");

        assert_eq!(fetcher.fetch("https://example.test/a").await.unwrap(), "body");
        assert!(matches!(
            fetcher.fetch("https://example.test/b").await,
            Err(FetchError::Status(404))
        ));
        assert_eq!(
            fetcher.requested(),
            vec!["https://example.test/a", "https://example.test/b"]
        );
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = retry_with_backoff(
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(FetchError::Status(503))
                } else {
                    Ok("ok")
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry_with_backoff(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Status(404))
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(FetchError::Status(404))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry_with_backoff(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Status(500))
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(FetchError::Status(500))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
