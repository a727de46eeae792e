use super::{ProviderError, ProviderTwoApi, ProviderTwoSearchRequest, ProviderTwoSearchResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct ProviderTwoClient {
    client: Client,
    base_url: String,
}

impl ProviderTwoClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .user_agent("RouteSearchServer/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProviderTwoApi for ProviderTwoClient {
    async fn search(
        &self,
        request: &ProviderTwoSearchRequest,
    ) -> Result<ProviderTwoSearchResponse, ProviderError> {
        let url = format!("{}/api/v1/search", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ErrorStatus { status, body });
        }

        Ok(response.json().await?)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/v1/ping", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("provider two ping failed: {e}");
                false
            }
        }
    }
}
