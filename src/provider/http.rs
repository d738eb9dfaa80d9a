//! Shared HTTP client and request plumbing for chat backends.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::BackendError;
use crate::util::timeout::with_timeout;

/// Build a client for one backend instance.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .pool_max_idle_per_host(2)
        .build()
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// POST a JSON body and decode a JSON reply, bounded by `timeout`.
///
/// The body is encoded before any I/O so an unencodable payload never
/// reaches the network.
pub async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
    timeout: Duration,
) -> Result<R, BackendError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let payload = serde_json::to_vec(body)?;

    with_timeout(timeout, async {
        let resp = client
            .post(url)
            .headers(bearer_headers(api_key))
            .body(payload)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        debug!(url, status, bytes = text.len(), "chat completion response");

        if status != 200 {
            return Err(BackendError::Status { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))
    })
    .await
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout.as_millis() as u64)
    } else {
        BackendError::Transport(err)
    }
}
