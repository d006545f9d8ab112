use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const BACKOFF_STEP_SECS: f64 = 0.8;
const BACKOFF_CAP_SECS: f64 = 3.0;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url} after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Anything that can hand back the HTML body of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Shared HTTP client with per-request timeout and bounded retries.
pub struct Fetcher {
    client: reqwest::Client,
    attempts: u32,
}

impl Fetcher {
    pub fn new(timeout: Duration, retries: u32) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Fetcher::with_client(client, retries))
    }

    fn with_client(client: reqwest::Client, retries: u32) -> Self {
        Fetcher {
            client,
            attempts: retries.max(1),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        with_retries(url, self.attempts, backoff, move || self.fetch_once(url)).await
    }
}

/// Run `op` up to `attempts` times, sleeping `wait(n)` after failed attempt `n`.
async fn with_retries<T, F, Fut>(
    url: &str,
    attempts: u32,
    wait: fn(u32) -> Duration,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let pause = wait(attempt);
                warn!(
                    "Fetch failed for {} (attempt {}/{}): {}, retrying in {:.1}s",
                    url,
                    attempt,
                    attempts,
                    e,
                    pause.as_secs_f64()
                );
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(e),
                })
            }
        }
    }
}

/// Linear backoff, capped.
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs_f64((BACKOFF_STEP_SECS * attempt as f64).min(BACKOFF_CAP_SECS))
}
