use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for the source adapters.
///
/// Adapters build requests and hand them here; implementations decide how
/// they go out (plain, credential-wrapped, or canned in tests).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
