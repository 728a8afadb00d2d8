use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::auth::parse_jwt;
use crate::config::SecurityConfig;
use crate::error::{AppError, ErrorKind};
use crate::middleware::request_context::RequestContext;
use crate::routing::route::Middleware;

/// Declarable route middleware that authenticates `Authorization: Bearer`
/// tokens and records the token issuer as the request's user id.
pub fn jwt_auth(security: Arc<SecurityConfig>) -> Middleware {
    Middleware::from_fn("jwt_auth", move |mut request: Request, next: Next| {
        let security = security.clone();
        async move {
            let user_id = match authenticate(request.headers(), &security) {
                Ok(user_id) => user_id,
                Err(e) => return e.into_response(),
            };

            tracing::Span::current().record("user_id", user_id.as_str());
            match request.extensions_mut().get_mut::<RequestContext>() {
                Some(ctx) => ctx.user_id = Some(user_id),
                None => {
                    let mut ctx = RequestContext::new(Uuid::new_v4().to_string());
                    ctx.user_id = Some(user_id);
                    request.extensions_mut().insert(ctx);
                }
            }
            next.run(request).await
        }
    })
}

fn authenticate(headers: &HeaderMap, security: &SecurityConfig) -> Result<String, AppError> {
    let token = extract_jwt_from_headers(headers)
        .map_err(|msg| ErrorKind::InvalidAccessToken.error(msg))?;
    parse_jwt(token, security)
        .map_err(|e| ErrorKind::InvalidAccessToken.wrap(e, "invalid access token"))
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_str = headers
        .get(AUTHORIZATION)
        .ok_or("missing Authorization header")?
        .to_str()
        .map_err(|_| "invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("empty JWT token"),
        Some(token) => Ok(token.trim()),
        None => Err("Authorization header must use Bearer token format"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt;
    use crate::middleware::request_context::request_context;
    use axum::{body::Body, http::StatusCode, middleware::from_fn, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn security() -> Arc<SecurityConfig> {
        Arc::new(SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            ..SecurityConfig::default()
        })
    }

    fn app() -> Router {
        let auth = jwt_auth(security());
        Router::new()
            .route(
                "/whoami",
                get(|ctx: RequestContext| async move { ctx.user_id.unwrap_or_default() }),
            )
            .layer(from_fn(move |request: Request, next: Next| auth.call(request, next)))
            .layer(from_fn(request_context))
    }

    fn request(authorization: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn valid_token_sets_user_id() {
        let token = generate_jwt("rider-5", &security()).unwrap();
        let response = app()
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"rider-5");
    }

    #[tokio::test]
    async fn missing_or_malformed_tokens_are_unauthorized() {
        for header in [None, Some("Basic abc"), Some("Bearer "), Some("Bearer not-a-jwt")] {
            let response = app().oneshot(request(header)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{header:?}");
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(extract_jwt_from_headers(&headers).is_err());
        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers), Ok("abc"));
    }
}
