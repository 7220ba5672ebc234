//! Feed retrieval over HTTP or from the local filesystem.

mod basic;
mod client;
mod retry;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use retry::Retry;

use crate::detection::FireTable;
use crate::error::{FeedError, Result};
use crate::parser::parse_feed;
use tracing::{debug, info};

/// GETs `url` and returns the body. Non-success statuses are fetch errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse::<reqwest::Url>()
            .map_err(|e| FeedError::fetch(url, e))?,
    );

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FeedError::fetch(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::fetch(url, format!("HTTP status {status}")));
    }

    let bytes = resp.bytes().await.map_err(|e| FeedError::fetch(url, e))?;
    debug!(url, bytes = bytes.len(), "Feed bytes received");
    Ok(bytes.to_vec())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client))]
pub async fn fetch_source<C: HttpClient + ?Sized>(client: &C, location: &str) -> Result<Vec<u8>> {
    if is_remote(location) {
        fetch_bytes(client, location).await
    } else {
        tokio::fs::read(location)
            .await
            .map_err(|e| FeedError::fetch(location, e))
    }
}

/// Fetches and normalizes the feed at `location`.
#[tracing::instrument(skip(client))]
pub async fn load_feed<C: HttpClient + ?Sized>(client: &C, location: &str) -> Result<FireTable> {
    let bytes = fetch_source(client, location).await?;
    let table = parse_feed(&bytes, location)?;
    info!(
        rows = table.len(),
        dropped = table.dropped,
        crs = %table.crs,
        "Feed loaded"
    );
    Ok(table)
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
