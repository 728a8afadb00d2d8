use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::IntoResponse};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::middleware::domain::DomainContext;
use crate::middleware::permission::PermissionContext;
use crate::middleware::request_context::RequestContext;
use crate::routing::domain::{AuthorizationDomain, DomainScope};
use crate::routing::permission::{Effect, Statement};
use crate::routing::route::Middleware;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Request facts a policy engine evaluates a statement against.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyInput {
    pub domain: AuthorizationDomain,
    pub scope: DomainScope,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub method: String,
    pub path: String,
}

/// External policy engine.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        statement: &Statement,
        input: &PolicyInput,
    ) -> Result<Decision, AppError>;
}

/// Stand-in used when no engine is wired: honours each statement's effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectEvaluator;

#[async_trait]
impl PolicyEvaluator for EffectEvaluator {
    async fn evaluate(
        &self,
        statement: &Statement,
        _input: &PolicyInput,
    ) -> Result<Decision, AppError> {
        Ok(match statement.effect {
            Effect::Allow => Decision::Allow,
            Effect::Deny => Decision::Deny,
        })
    }
}

/// Declarable route middleware that admits the request when any injected
/// statement evaluates to [`Decision::Allow`].
pub fn require_policy(evaluator: Arc<dyn PolicyEvaluator>) -> Middleware {
    Middleware::from_fn("require_policy", move |request: Request, next: Next| {
        let evaluator = evaluator.clone();
        async move {
            let outcome = match policy_input(&request) {
                Ok((permissions, input)) => {
                    authorize(evaluator.as_ref(), &permissions, &input).await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => next.run(request).await,
                Err(e) => e.into_response(),
            }
        }
    })
}

fn policy_input(request: &Request) -> Result<(PermissionContext, PolicyInput), AppError> {
    let permissions = request
        .extensions()
        .get::<PermissionContext>()
        .cloned()
        .ok_or_else(|| ErrorKind::InternalServerError.error("permission context missing"))?;
    let domain = request
        .extensions()
        .get::<DomainContext>()
        .ok_or_else(|| ErrorKind::InternalServerError.error("domain context missing"))?;

    let input = PolicyInput {
        domain: domain.domain.clone(),
        scope: domain.scope,
        tenant_id: domain.tenant_id.clone(),
        user_id: request
            .extensions()
            .get::<RequestContext>()
            .and_then(|ctx| ctx.user_id.clone()),
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
    };
    Ok((permissions, input))
}

async fn authorize(
    evaluator: &dyn PolicyEvaluator,
    permissions: &PermissionContext,
    input: &PolicyInput,
) -> Result<(), AppError> {
    for grant in &permissions.grants {
        if evaluator.evaluate(&grant.statement, input).await? == Decision::Allow {
            tracing::debug!(permission = %grant.name, "policy allowed request");
            return Ok(());
        }
    }

    Err(ErrorKind::AccessError
        .error("no permission statement allowed the request")
        .with_context("domain", &input.domain.name)
        .with_context("permissions", permissions.names().join(",")))
}
