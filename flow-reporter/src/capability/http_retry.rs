//! HTTP retry with exponential backoff for provider calls.
//!
//! Handles 429 rate limiting, 5xx server errors, and network timeouts.

use crate::{Capability, Error};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Send an HTTP request with retry and exponential backoff.
///
/// Retry behavior:
/// - 429 (rate limited): backoff 2s, 4s, 8s
/// - 5xx (server error): backoff 1s, 2s, 4s
/// - Timeout/connect error: backoff 1s, 2s, 4s
/// - Other 4xx: non-retriable, fails immediately with the response body
pub async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    max_retries: u32,
    capability: Capability,
    context: &str,
) -> crate::Result<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let mut last_error = format!("{}: no attempts made", context);

    for attempt in 0..max_retries {
        let is_last = attempt + 1 == max_retries;

        match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    last_error = format!("{}: rate limited (429)", context);
                    let delay = Duration::from_secs(2u64.pow(attempt + 1));
                    warn!("{}: rate limited (429), retrying in {:?}", context, delay);
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                } else if status.is_server_error() {
                    last_error = format!("{}: server error ({})", context, status);
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    warn!("{}: server error ({}), retrying in {:?}", context, status, delay);
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    warn!("{}: non-retriable error ({})", context, status);
                    return Err(Error::external(
                        capability,
                        format!("{}: {} {}", context, status, body.trim()),
                    ));
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_error = format!("{}: network error: {}", context, e);
                let delay = Duration::from_secs(2u64.pow(attempt));
                warn!("{}: network error ({}), retrying in {:?}", context, e, delay);
                if !is_last {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                warn!("{}: request failed: {}", context, e);
                return Err(Error::external(capability, format!("{}: {}", context, e)));
            }
        }
    }

    warn!("{}: failed after {} attempts", context, max_retries);
    Err(Error::external(capability, last_error))
}
