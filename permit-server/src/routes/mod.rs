use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::{header::CONTENT_TYPE, HeaderValue, Uri};
use prometheus::{Encoder, TextEncoder};
use tower::ServiceBuilder;
use tower_http::{
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use permit_slo::{errors, Result};

use crate::{
    controllers::{check, health},
    middlewares::{MakeSpanWithTrace, X_TRACE_ID},
    var::{HTTP_REQUESTS_DURATION_SECONDS, HTTP_REQUESTS_TOTAL},
    AppState,
};

pub struct AppRouter;

impl AppRouter {
    pub fn build(state: AppState) -> Router {
        Router::new()
            .merge(check::new_router(state))
            .merge(health::new_router())
            .layer(
                ServiceBuilder::new().layer(
                    TraceLayer::new_for_http()
                        .make_span_with(
                            MakeSpanWithTrace::new().level(Level::INFO),
                        )
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                ),
            )
            .layer(middleware::from_fn(Self::trace))
            .fallback(Self::not_found)
            .route_layer(middleware::from_fn(Self::track_metrics))
            .route("/metrics", get(Self::metrics))
    }

    async fn trace(mut request: Request, next: Next) -> Result<Response> {
        let trace_id = match request.headers().get(X_TRACE_ID) {
            Some(v) => v.clone(),
            None => {
                let v = HeaderValue::from_str(
                    &uuid::Uuid::new_v4().hyphenated().to_string(),
                )
                .map_err(errors::any)?;
                request.headers_mut().insert(X_TRACE_ID, v.clone());
                v
            }
        };
        let mut response = next.run(request).await;
        response.headers_mut().insert(X_TRACE_ID, trace_id);
        Ok(response)
    }

    async fn track_metrics(request: Request, next: Next) -> impl IntoResponse {
        let path = if let Some(matched_path) =
            request.extensions().get::<MatchedPath>()
        {
            matched_path.as_str().to_owned()
        } else {
            request.uri().path().to_owned()
        };
        let start = Instant::now();
        let method = request.method().to_string();
        let response = next.run(request).await;
        let latency = start.elapsed();
        let status = response.status().as_u16().to_string();

        HTTP_REQUESTS_TOTAL
            .with_label_values(&[
                method.as_str(),
                path.as_str(),
                status.as_str(),
            ])
            .inc();
        HTTP_REQUESTS_DURATION_SECONDS
            .with_label_values(&[method.as_str(), path.as_str()])
            .observe(latency.as_secs_f64());

        response
    }

    async fn metrics() -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(errors::any)?;

        Response::builder()
            .status(200)
            .header(CONTENT_TYPE, encoder.format_type())
            .body(Body::from(buffer))
            .map_err(errors::any)
    }

    async fn not_found(uri: Uri) -> impl IntoResponse {
        errors::not_found(&format!("no route for {}", uri))
    }
}
