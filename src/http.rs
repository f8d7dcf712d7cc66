//! Shared request helper giving every client the same connection-level retry.

use log::debug;
use reqwest::{Client, Response};
use std::time::Duration;

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sends a GET, retrying only when the connection itself could not be made.
///
/// Timeouts and HTTP error statuses are returned to the caller on the first attempt;
/// a server that answered is not asked again here.
pub(crate) async fn get_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    max_retries: u32,
) -> Result<Response, reqwest::Error> {
    let mut attempt = 0;
    loop {
        match client.get(url).query(query).send().await {
            Err(e) if e.is_connect() && attempt < max_retries => {
                attempt += 1;
                debug!(
                    "Connection to {} failed (attempt {}/{}): {}",
                    url, attempt, max_retries, e
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
            result => return result,
        }
    }
}
