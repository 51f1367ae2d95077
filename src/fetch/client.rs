use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes requests for station documents and trip tables.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
