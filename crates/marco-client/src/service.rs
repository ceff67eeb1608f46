//! Client of the compatibility query endpoint.

use crate::error::{Result, RewriteError};
use async_trait::async_trait;
use marco_core::Gav;
use marco_core::api::{CompatibilityResponse, compatibilities_path};

#[async_trait]
pub trait CompatibilityService: Send + Sync {
    /// Versions compatible with `gav`, `None` when none have been computed.
    async fn compatible_versions(&self, gav: &Gav) -> Result<Option<Vec<String>>>;
}

#[derive(Clone)]
pub struct HttpCompatibilityService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCompatibilityService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompatibilityService for HttpCompatibilityService {
    async fn compatible_versions(&self, gav: &Gav) -> Result<Option<Vec<String>>> {
        let url = format!("{}{}", self.base_url, compatibilities_path(gav));
        let service_error = |message: String| RewriteError::Service {
            gav: gav.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| service_error(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("no compatibilities computed for {}", gav);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(service_error(format!("HTTP {status}")));
        }

        let body: CompatibilityResponse = response
            .json()
            .await
            .map_err(|e| service_error(e.to_string()))?;
        Ok(Some(body.compatible_versions))
    }
}
