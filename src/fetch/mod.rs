//! HTTP client seam for source adapters.
//!
//! [`HttpClient`] is the injection point: adapters are generic over it so
//! tests can substitute canned responses, and the auth wrappers compose
//! around [`BasicClient`] for sources that need credentials.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Issues a GET for `url` and deserializes the JSON response body.
///
/// Non-2xx responses are surfaced as [`SourceError::Status`] with the body
/// attached, since air-quality providers put their error detail there.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: &str,
) -> Result<T, SourceError> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()
            .map_err(|e| SourceError::Malformed(format!("invalid URL {url}: {e}")))?,
    );

    let resp = client.execute(req).await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
