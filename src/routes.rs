//! The service's own route table.

use std::sync::Arc;

use axum::{http::StatusCode, Extension};
use serde_json::{json, Value};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::{health_check, Database};
use crate::middleware::{
    jwt_auth, require_policy, ApiResponse, DomainContext, EffectEvaluator, PermissionContext,
    PolicyEvaluator, RequestContext,
};
use crate::routing::{AuthDomains, Permission, RouteDescriptor, Statement};

/// Read one's own profile, in every domain.
pub fn view_profile(domains: &AuthDomains) -> Permission {
    Permission::new(
        "view_profile",
        domains.all().into_iter().map(|d| d.id),
        Statement::allow("profile:view", "profile"),
    )
}

/// The route table wired with configuration and the default evaluator.
pub fn service_routes(config: &AppConfig) -> Vec<RouteDescriptor> {
    route_table(
        &AuthDomains::from_config(&config.domains),
        Arc::new(config.security.clone()),
        Arc::new(EffectEvaluator),
    )
}

pub fn route_table(
    domains: &AuthDomains,
    security: Arc<SecurityConfig>,
    evaluator: Arc<dyn PolicyEvaluator>,
) -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::get("health", health)
            .public()
            .in_domain(domains.user.clone()),
        RouteDescriptor::get("whoami", whoami)
            .with_permission(view_profile(domains))
            .with_middleware(jwt_auth(security))
            .with_middleware(require_policy(evaluator))
            .in_domains(domains.all()),
    ]
}

async fn health(Extension(database): Extension<Database>) -> ApiResponse<Value> {
    let now = chrono::Utc::now();

    let Some(pool) = database.pool() else {
        return ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "disabled"
        }));
    };

    match health_check(pool).await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

async fn whoami(
    request: RequestContext,
    domain: DomainContext,
    permissions: PermissionContext,
) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "user_id": request.user_id,
        "request_id": request.request_id,
        "domain": domain.domain.name,
        "tenant_id": domain.tenant_id,
        "permissions": permissions.names(),
    }))
}
