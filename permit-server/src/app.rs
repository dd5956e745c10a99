use std::{ops::Deref, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::info;

use permit_slo::errors;

use crate::{
    models::{check::Resource, user::User},
    services::pdp::{DynAuthorizer, PdpClient},
    AppConfig,
};

pub struct App {
    pub config: AppConfig,
    pub user: User,
    pub resource: Resource,
    pub authorizer: DynAuthorizer,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("initializing pdp client for {}...", config.pdp_url);
        let authorizer = PdpClient::new(
            &config.pdp_url,
            &config.api_key,
            Duration::from_secs(config.timeout),
        )?;
        Self::with_authorizer(config, Arc::new(authorizer))
    }

    pub fn with_authorizer(
        config: AppConfig,
        authorizer: DynAuthorizer,
    ) -> Result<Self> {
        let user = User::from_config(&config)?;
        let resource = Resource::parse(&config.resource, &config.tenant);
        info!(
            "checking {} ({}) for {} {}",
            user.full_name(),
            user.id,
            config.action,
            resource
        );
        Ok(Self {
            config,
            user,
            resource,
            authorizer,
        })
    }
}

#[derive(Clone)]
pub struct AppState(pub Arc<App>);

// deref so you can still access the inner fields easily
impl Deref for AppState {
    type Target = App;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AppState
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = errors::WithBacktrace;
    async fn from_request_parts(
        _: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}

#[cfg(test)]
pub(crate) fn test_state(authorizer: DynAuthorizer) -> AppState {
    AppState(Arc::new(
        App::with_authorizer(crate::config::sample(), authorizer).unwrap(),
    ))
}
