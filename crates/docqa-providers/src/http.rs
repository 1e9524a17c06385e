//! Shared HTTP plumbing and failure classification for provider adapters

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use docqa_core::{Error, Result};

const CONTENT_POLICY_MARKERS: &[&str] = &[
    "content_policy_violation",
    "content_filter",
    "content management policy",
    "flagged by moderation",
];

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a transport-level failure. Timeouts and connection problems are
/// worth retrying; a body that does not decode is not.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::permanent(format!("{provider}: malformed response: {err}"))
    } else if err.is_timeout() {
        Error::transient(format!("{provider}: request timed out"))
    } else {
        Error::transient(format!("{provider}: request failed: {err}"))
    }
}

/// Map a non-success HTTP status
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> Error {
    if is_content_policy(body) {
        return Error::ContentPolicy(format!("{provider} rejected the prompt: {body}"));
    }

    let message = format!("{provider} returned {status}: {body}");
    match status.as_u16() {
        408 | 425 | 429 => Error::transient(message),
        code if code >= 500 => Error::transient(message),
        _ => Error::permanent(message),
    }
}

pub(crate) fn is_content_policy(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTENT_POLICY_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Send `request` and decode a JSON success body
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(status_error(provider, status, &body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;
    serde_json::from_str(&body)
        .map_err(|e| Error::permanent(format!("{provider}: unexpected response body: {e}")))
}

/// Check that a provider returned one vector of the configured size per input.
pub(crate) fn check_vectors(
    provider: &str,
    expected_count: usize,
    dimensions: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(Error::permanent(format!(
            "{provider}: expected {expected_count} embeddings, got {}",
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(Error::permanent(format!(
            "{provider}: embedding has {} dimensions, expected {dimensions}",
            bad.len()
        )));
    }
    Ok(())
}
