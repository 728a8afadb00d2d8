use axum::{
    extract::{FromRequestParts, RawPathParams, Request},
    http::request::Parts,
    middleware::Next,
    response::IntoResponse,
    RequestExt,
};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::routing::domain::{AuthorizationDomain, DomainScope};
use crate::routing::route::Middleware;

/// Which authorization domain the matched endpoint belongs to, and the
/// tenant named in its path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DomainContext {
    pub domain: AuthorizationDomain,
    pub scope: DomainScope,
    pub tenant_id: Option<String>,
}

/// Chain step recording the endpoint's domain and its tenant identifier
/// (`company_id` or `team_id`) in request extensions.
pub fn add_domain_and_tenant_info(domain: AuthorizationDomain, scope: DomainScope) -> Middleware {
    Middleware::from_fn(
        format!("domain:{}", domain.name),
        move |mut request: Request, next: Next| {
            let domain = domain.clone();
            async move {
                let tenant_id = match scope.tenant_param() {
                    Some(param) => match tenant_from_path(&mut request, param).await {
                        Ok(id) => Some(id),
                        Err(e) => return e.into_response(),
                    },
                    None => None,
                };

                let span = tracing::Span::current();
                span.record("domain", domain.name.as_str());
                if let Some(tenant) = &tenant_id {
                    span.record("tenant_id", tenant.as_str());
                }

                request.extensions_mut().insert(DomainContext {
                    domain,
                    scope,
                    tenant_id,
                });
                next.run(request).await
            }
        },
    )
}

async fn tenant_from_path(request: &mut Request, param: &str) -> Result<String, AppError> {
    let params = request
        .extract_parts::<RawPathParams>()
        .await
        .map_err(|e| ErrorKind::InternalServerError.wrap(e, "path parameters unavailable"))?;

    params
        .iter()
        .find(|(key, _)| *key == param)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ErrorKind::InvalidUserInput
                .error("tenant identifier missing from path")
                .with_context("param", param)
        })
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for DomainContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<DomainContext>()
            .cloned()
            .ok_or_else(|| ErrorKind::InternalServerError.error("domain context missing"))
    }
}
