use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{field, Instrument};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const WS_REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-ws-request-id");

/// Per-request metadata carried in request extensions.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub ws_request_id: Option<String>,
    pub started_at: Instant,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: None,
            ws_request_id: None,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

/// Outermost application middleware: assigns the request id and opens the
/// request span that later middleware records domain, tenant and user on.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let request_id = header_string(&request, &REQUEST_ID_HEADER)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut context = RequestContext::new(request_id.clone());
    context.ws_request_id = header_string(&request, &WS_REQUEST_ID_HEADER);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        domain = field::Empty,
        tenant_id = field::Empty,
        user_id = field::Empty,
    );
    request.extensions_mut().insert(context.clone());

    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = context.elapsed_ms() as u64,
            "request completed"
        )
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn header_string(request: &Request, name: &HeaderName) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| ErrorKind::InternalServerError.error("request context missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|ctx: RequestContext| async move {
                    format!("{}|{}", ctx.request_id, ctx.ws_request_id.unwrap_or_default())
                }),
            )
            .layer(from_fn(request_context))
    }

    #[tokio::test]
    async fn propagates_incoming_request_id() {
        let request = axum::http::Request::builder()
            .uri("/echo")
            .header("x-request-id", "req-42")
            .header("x-ws-request-id", "ws-7")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"req-42|ws-7");
    }

    #[tokio::test]
    async fn generates_request_id_when_absent() {
        let request = axum::http::Request::builder()
            .uri("/echo")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let id = response.headers()["x-request-id"].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
