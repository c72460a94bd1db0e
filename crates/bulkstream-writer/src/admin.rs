//! Index administration — the lifecycle calls around a streaming run:
//! drop the target index beforehand, count documents afterwards.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{body_excerpt, AdminError};

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Clone)]
pub struct IndexAdmin {
    client: reqwest::Client,
    endpoint: String,
}

impl IndexAdmin {
    pub fn new(client: reqwest::Client, endpoint: impl AsRef<str>) -> Self {
        Self {
            client,
            endpoint: endpoint.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Whether `index` exists.
    pub async fn exists(&self, index: &str) -> Result<bool, AdminError> {
        let url = self.url(index);
        let response = self.client.head(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(status_error(url, response).await),
        }
    }

    pub async fn delete(&self, index: &str) -> Result<(), AdminError> {
        let url = self.url(index);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(url, response).await);
        }
        tracing::info!(index, "index deleted");
        Ok(())
    }

    /// Delete `index` if present. Returns whether anything was deleted.
    pub async fn delete_if_exists(&self, index: &str) -> Result<bool, AdminError> {
        if !self.exists(index).await? {
            return Ok(false);
        }
        self.delete(index).await?;
        Ok(true)
    }

    /// Number of documents visible in `index`.
    pub async fn count(&self, index: &str) -> Result<u64, AdminError> {
        let url = format!("{}/_count", self.url(index));
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(url, response).await);
        }
        let raw = response.bytes().await?;
        let parsed: CountResponse = serde_json::from_slice(&raw)?;
        Ok(parsed.count)
    }

    fn url(&self, index: &str) -> String {
        format!("{}/{}", self.endpoint, index)
    }
}

async fn status_error(endpoint: String, response: reqwest::Response) -> AdminError {
    let status = response.status();
    AdminError::Status {
        endpoint,
        status,
        body: body_excerpt(response).await,
    }
}
