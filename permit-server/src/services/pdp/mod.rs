mod client;

use std::sync::Arc;

use async_trait::async_trait;

use permit_slo::Result;

use crate::models::check::AuthorizationQuery;

pub use client::PdpClient;

/// Asks a policy decision point whether a query is allowed.
#[async_trait]
pub trait Authorizer {
    async fn check(&self, query: &AuthorizationQuery) -> Result<bool>;
}

pub type DynAuthorizer = Arc<dyn Authorizer + Send + Sync>;
