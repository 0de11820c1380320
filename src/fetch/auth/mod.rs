//! Credential-injecting [`HttpClient`](super::HttpClient) wrappers.
//!
//! Air-quality providers split between the two: OpenAQ wants its key in an
//! `X-API-Key` header, WAQI wants a `token` query parameter.

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;
