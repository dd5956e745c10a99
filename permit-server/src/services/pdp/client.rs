use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use permit_slo::{
    errors::{self, WithBacktrace},
    Result,
};

use super::Authorizer;
use crate::models::check::{AuthorizationQuery, AuthorizationResult};

#[derive(Debug, Clone)]
pub struct PdpClient {
    client: reqwest::Client,
    allowed_url: String,
    api_key: String,
}

impl PdpClient {
    pub fn new(
        pdp_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(errors::any)?;
        Ok(Self {
            client,
            allowed_url: format!("{}/allowed", pdp_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
        })
    }
}

#[async_trait]
impl Authorizer for PdpClient {
    async fn check(&self, query: &AuthorizationQuery) -> Result<bool> {
        debug!(
            user = %query.user.key,
            action = %query.action,
            resource = %query.resource,
            "querying {}",
            self.allowed_url
        );
        let response = self
            .client
            .post(&self.allowed_url)
            .bearer_auth(&self.api_key)
            .json(query)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(errors::pdp(&format!("status {}: {}", status, body)));
        }
        let result = response
            .json::<AuthorizationResult>()
            .await
            .map_err(transport)?;

        info!(
            user = %query.user.key,
            action = %query.action,
            resource = %query.resource,
            allow = result.allow,
            "pdp decision"
        );
        Ok(result.allow)
    }
}

// reqwest keeps the cause (timeout, refused, ...) in the source chain.
fn transport(err: reqwest::Error) -> WithBacktrace {
    errors::pdp(&format!("{:#}", anyhow::Error::new(err)))
}
