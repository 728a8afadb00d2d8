#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use rideplus_api::config::AppConfig;
use rideplus_api::database::Database;
use rideplus_api::routing::{Middleware, RouteDescriptor};
use rideplus_api::{build_app, App};

pub const JWT_SECRET: &str = "integration-secret";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config
}

pub fn app_with(config: &AppConfig, descriptors: Vec<RouteDescriptor>) -> Result<App> {
    build_app(config, descriptors, Database(None)).context("route registration failed")
}

pub fn token(user: &str) -> Result<String> {
    Ok(rideplus_api::auth::generate_jwt(user, &test_config().security)?)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Value,
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
) -> Result<TestResponse> {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let response = router.clone().oneshot(builder.body(Body::empty())?).await?;

    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    Ok(TestResponse { status, request_id, body })
}

pub async fn get(router: &Router, uri: &str, bearer: Option<&str>) -> Result<TestResponse> {
    send(router, Method::GET, uri, bearer).await
}

/// Invocation log shared by chain-order tests.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Middleware that records its name when it runs.
pub fn recorder(name: &'static str, log: CallLog) -> Middleware {
    Middleware::from_fn(name, move |request: Request, next: Next| {
        if let Ok(mut entries) = log.lock() {
            entries.push(name.to_string());
        }
        next.run(request)
    })
}
