//! Registry document downloading.

use std::time::Duration;

use reqwest::Client;
use shrink_util::errors::ShrinkError;

/// Retries after the first attempt for transient failures.
pub const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Build a shared reqwest client for registry requests.
pub fn build_client(timeout: Duration) -> miette::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("shrink/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            ShrinkError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Download a registry document as text.
///
/// Failures for which [`ShrinkError::is_transient`] holds (connection
/// errors, timeouts, 5xx answers) are retried up to `retries` more times with
/// a linearly growing delay. Anything else, including a non-200 status below
/// 500, is returned immediately.
pub async fn fetch_text(client: &Client, url: &str, retries: u32) -> Result<String, ShrinkError> {
    let mut attempt = 0;
    loop {
        match fetch_once(client, url).await {
            Ok(body) => return Ok(body),
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                tracing::debug!("retrying {url} (attempt {}): {err}", attempt + 1);
                tokio::time::sleep(RETRY_DELAY * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn fetch_once(client: &Client, url: &str) -> Result<String, ShrinkError> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| ShrinkError::Network {
            message: format!("Request to {url} failed: {e}"),
        })?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        return Err(ShrinkError::HttpStatus {
            code: status.as_u16(),
            url: url.to_string(),
        });
    }

    resp.text().await.map_err(|e| ShrinkError::Network {
        message: format!("Failed to read response from {url}: {e}"),
    })
}
