use axum::{routing::get, Json, Router};
use http::StatusCode;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use permit_slo::Result;

use crate::{
    models::check::{
        parse_attributes, AuthorizationQuery, AuthorizationResult, CheckResult,
        Resource,
    },
    valid::Valid,
    AppState,
};

pub fn new_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(quickstart))
        .route("/check", get(check))
        .with_state(state)
}

/// Checks the configured user against the configured action and resource.
async fn quickstart(app: AppState) -> Result<(StatusCode, Json<CheckResult>)> {
    let query = AuthorizationQuery::new(
        &app.user.id,
        &app.config.action,
        app.resource.clone(),
    );
    let permitted = app.authorizer.check(&query).await?;

    let name = app.user.full_name();
    if permitted {
        Ok((
            StatusCode::OK,
            Json(CheckResult::permitted(
                &name,
                &app.config.action,
                &app.config.resource,
            )),
        ))
    } else {
        Ok((
            StatusCode::FORBIDDEN,
            Json(CheckResult::denied(
                &name,
                &app.config.action,
                &app.config.resource,
            )),
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CheckParams {
    #[serde(default)]
    #[validate(length(min = 1))]
    user: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    action: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    resource: String,
    tenant: Option<String>,
    user_attributes: Option<String>,
    resource_attributes: Option<String>,
}

async fn check(
    app: AppState,
    Valid(params): Valid<CheckParams>,
) -> Result<Json<AuthorizationResult>> {
    info!("check query {:#?}", params);
    let tenant = params
        .tenant
        .as_deref()
        .filter(|tenant| !tenant.is_empty())
        .unwrap_or(&app.config.tenant);
    let user_attributes = parse_attributes(
        params.user_attributes.as_deref().unwrap_or_default(),
    )?;
    let resource_attributes = parse_attributes(
        params.resource_attributes.as_deref().unwrap_or_default(),
    )?;

    let query = AuthorizationQuery::new(
        &params.user,
        &params.action,
        Resource::parse(&params.resource, tenant),
    )
    .with_user_attributes(user_attributes)?
    .with_resource_attributes(resource_attributes)?;

    let allow = app.authorizer.check(&query).await?;
    Ok(Json(AuthorizationResult { allow }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use permit_slo::errors;

    use super::*;
    use crate::{
        app::test_state, services::pdp::tests::MockAuthorizer, App,
    };

    async fn call(
        authorizer: MockAuthorizer,
        uri: &str,
    ) -> (StatusCode, Value) {
        send(new_router(test_state(Arc::new(authorizer))), uri).await
    }

    async fn send(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn quickstart_permitted() {
        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .withf(|query| {
                query.user.key == "user123"
                    && query.action == "read"
                    && query.resource.kind == "document"
                    && query.resource.tenant == "default"
            })
            .times(1)
            .returning(|_| Ok(true));

        let (status, body) = call(authorizer, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"result": "Ada Lovelace is PERMITTED to read document!"})
        );
    }

    #[tokio::test]
    async fn quickstart_denied() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_check().times(1).returning(|_| Ok(false));

        let (status, body) = call(authorizer, "/").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let message = body["result"].as_str().unwrap();
        assert!(message.contains("NOT PERMITTED"));
        assert_eq!(message, "Ada Lovelace is NOT PERMITTED to read document!");
    }

    #[tokio::test]
    async fn quickstart_keeps_configured_text() {
        let mut config = crate::config::sample();
        config.first_name = "Zoë".to_owned();
        config.action = "read all".to_owned();
        config.resource = "document:readme:v2".to_owned();

        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .withf(|query| {
                query.action == "read all"
                    && query.resource.kind == "document"
                    && query.resource.key.as_deref() == Some("readme:v2")
            })
            .times(1)
            .returning(|_| Ok(false));
        let app = App::with_authorizer(config, Arc::new(authorizer)).unwrap();

        let (status, body) =
            send(new_router(AppState(Arc::new(app))), "/").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let expected = "Zoë Lovelace is NOT PERMITTED to read all \
                        document:readme:v2!";
        assert_eq!(body, json!({ "result": expected }));
    }

    #[tokio::test]
    async fn quickstart_pdp_failure() {
        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .returning(|_| Err(errors::pdp("connection refused")));

        let (status, body) = call(authorizer, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "2010005");
    }

    #[tokio::test]
    async fn check_with_attributes() {
        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .withf(|query| {
                query.user.key == "bob"
                    && query.action == "delete"
                    && query.resource.kind == "invoice"
                    && query.resource.key.as_deref() == Some("42")
                    && query.resource.tenant == "acme"
                    && query.user.attributes.get("admin") == Some(&json!(true))
            })
            .returning(|_| Ok(false));

        let (status, body) = call(
            authorizer,
            "/check?user=bob&action=delete&resource=invoice:42&tenant=acme\
             &user_attributes=admin:true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"allow": false}));
    }

    #[tokio::test]
    async fn check_default_tenant() {
        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .withf(|query| query.resource.tenant == "default")
            .returning(|_| Ok(true));

        let (status, body) =
            call(authorizer, "/check?user=bob&action=read&resource=invoice")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"allow": true}));
    }

    #[tokio::test]
    async fn check_empty_tenant_falls_back() {
        let mut authorizer = MockAuthorizer::new();
        authorizer
            .expect_check()
            .withf(|query| query.resource.tenant == "default")
            .times(1)
            .returning(|_| Ok(true));

        let (status, body) = call(
            authorizer,
            "/check?user=bob&action=read&resource=invoice&tenant=",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"allow": true}));
    }

    #[tokio::test]
    async fn check_missing_fields() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_check().never();

        let (status, _) = call(authorizer, "/check?user=bob").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn check_bad_attributes() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_check().never();

        let (status, _) = call(
            authorizer,
            "/check?user=bob&action=read&resource=invoice\
             &resource_attributes=broken",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
