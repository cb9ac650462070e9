use crate::config::types::{CredentialsConfig, DestinationConfig};
use crate::store::traits::{AttributeStore, StoreError, StoreItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON-over-HTTP client for the attribute store
pub struct HttpAttributeStore {
    domain: String,
    base_url: String,
    access_id: String,
    secret_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpAttributeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAttributeStore")
            .field("domain", &self.domain)
            .field("base_url", &self.base_url)
            .field("access_id", &self.access_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPutRequest {
    pub items: Vec<StoreItem>,
}

impl HttpAttributeStore {
    pub fn new(
        destination: &DestinationConfig,
        credentials: &CredentialsConfig,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(destination.timeout_ms))
            .build()?;

        Ok(Self {
            domain: destination.domain.clone(),
            base_url: destination.endpoint.trim_end_matches('/').to_string(),
            access_id: credentials.access_id.clone(),
            secret_key: credentials.secret_key.clone(),
            client,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn domain_url(&self) -> String {
        format!("{}/domains/{}", self.base_url, self.domain)
    }

    async fn check(response: reqwest::Response) -> Result<(), StoreError> {
        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeStore for HttpAttributeStore {
    async fn ensure_domain(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.domain_url())
            .basic_auth(&self.access_id, Some(&self.secret_key))
            .send()
            .await?;

        Self::check(response).await
    }

    async fn batch_put(&self, items: Vec<StoreItem>) -> Result<(), StoreError> {
        let url = format!("{}/batch-put", self.domain_url());
        let request_body = BatchPutRequest { items };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.access_id, Some(&self.secret_key))
            .json(&request_body)
            .send()
            .await?;

        Self::check(response).await
    }
}
