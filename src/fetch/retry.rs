use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// An [`HttpClient`] wrapper that retries transport failures and 5xx responses.
///
/// The delay doubles after every attempt, starting at `backoff`. Requests that
/// cannot be cloned (streaming bodies) are sent once.
pub struct Retry<C> {
    pub inner: C,
    pub retries: u32,
    pub backoff: Duration,
}

impl<C> Retry<C> {
    pub fn new(inner: C, retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            retries,
            backoff,
        }
    }

    /// Backoff before retry number `attempt + 1`, saturating at `Duration::MAX`.
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Retry<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            let Some(this_req) = req.try_clone() else {
                return self.inner.execute(req).await;
            };

            match self.inner.execute(this_req).await {
                Ok(resp) if !resp.status().is_server_error() || attempt >= self.retries => {
                    return Ok(resp);
                }
                Err(e) if attempt >= self.retries => return Err(e),
                Ok(resp) => {
                    warn!(url = %req.url(), status = %resp.status(), attempt, "Server error, retrying");
                }
                Err(e) => {
                    warn!(url = %req.url(), error = %e, attempt, "Request failed, retrying");
                }
            }

            tokio::time::sleep(self.delay(attempt)).await;
            attempt += 1;
        }
    }
}
