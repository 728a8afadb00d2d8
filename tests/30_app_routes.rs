mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;

use rideplus_api::config::SecurityConfig;
use rideplus_api::error::{AppError, ErrorTrait};
use rideplus_api::middleware::{Decision, PolicyEvaluator, PolicyInput};
use rideplus_api::routes::{route_table, service_routes};
use rideplus_api::routing::{AuthDomains, Statement};

use common::{app_with, get, test_config, token};

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let config = test_config();
    let app = app_with(&config, service_routes(&config))?;

    let response = get(&app.router, "/health", None).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["database"], "disabled");
    assert!(response.request_id.is_some());
    Ok(())
}

#[tokio::test]
async fn whoami_requires_a_token() -> Result<()> {
    let config = test_config();
    let app = app_with(&config, service_routes(&config))?;

    let response = get(&app.router, "/whoami", None).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], true);
    assert_eq!(response.body["code"], 401);
    Ok(())
}

#[tokio::test]
async fn whoami_reports_domain_and_tenant() -> Result<()> {
    let config = test_config();
    let app = app_with(&config, service_routes(&config))?;
    let token = token("rider-9")?;

    let corporate = get(&app.router, "/corporate/acme/whoami", Some(&token)).await?;
    assert_eq!(corporate.status, StatusCode::OK);
    let data = &corporate.body["data"];
    assert_eq!(data["user_id"], "rider-9");
    assert_eq!(data["domain"], "corporate");
    assert_eq!(data["tenant_id"], "acme");
    assert_eq!(data["permissions"], serde_json::json!(["view_profile"]));
    assert_eq!(data["request_id"].as_str(), corporate.request_id.as_deref());

    let team = get(&app.router, "/team/t-4/whoami", Some(&token)).await?;
    assert_eq!(team.body["data"]["tenant_id"], "t-4");

    let system = get(&app.router, "/system/whoami", Some(&token)).await?;
    assert_eq!(system.body["data"]["domain"], "system");
    assert!(system.body["data"]["tenant_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_404_json() -> Result<()> {
    let config = test_config();
    let app = app_with(&config, service_routes(&config))?;

    let response = get(&app.router, "/nowhere", None).await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], 404);
    Ok(())
}

#[tokio::test]
async fn base_path_prefixes_every_endpoint() -> Result<()> {
    let mut config = test_config();
    config.server.base_path = "/v1".to_string();
    let app = app_with(&config, service_routes(&config))?;

    assert_eq!(get(&app.router, "/v1/health", None).await?.status, StatusCode::OK);
    assert_eq!(get(&app.router, "/health", None).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

struct DenyAll;

#[async_trait]
impl PolicyEvaluator for DenyAll {
    async fn evaluate(
        &self,
        _statement: &Statement,
        _input: &PolicyInput,
    ) -> Result<Decision, AppError> {
        Ok(Decision::Deny)
    }
}

#[tokio::test]
async fn denied_policy_is_forbidden() -> Result<()> {
    let config = test_config();
    let table = route_table(
        &AuthDomains::default(),
        Arc::new(config.security.clone()),
        Arc::new(DenyAll),
    );
    let app = app_with(&config, table)?;

    let response = get(&app.router, "/whoami", Some(&token("rider-9")?)).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], ErrorTrait::AccessDenied.message());
    Ok(())
}

#[tokio::test]
async fn tokens_from_another_secret_are_rejected() -> Result<()> {
    let config = test_config();
    let app = app_with(&config, service_routes(&config))?;
    let foreign = rideplus_api::auth::generate_jwt(
        "rider-9",
        &SecurityConfig {
            jwt_secret: "someone-else".to_string(),
            ..SecurityConfig::default()
        },
    )?;

    let response = get(&app.router, "/whoami", Some(&foreign)).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[test]
fn misconfigured_table_fails_the_build() {
    let config = test_config();
    let trips = || async { "trips" };
    let descriptors = vec![rideplus_api::routing::RouteDescriptor::get("trips", trips)
        .in_domain(AuthDomains::default().user)];
    assert!(app_with(&config, descriptors).is_err());
}
