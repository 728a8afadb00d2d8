//! Route registration.
//!
//! Each [`RouteDescriptor`] is expanded once per authorization domain into a
//! concrete endpoint. Protected endpoints must be covered by at least one
//! permission for every domain they are exposed under; any inconsistency
//! fails registration before the router is handed to the server.
//!
//! The handler chain of every endpoint is fixed:
//! permission injectors, then the domain/tenant injector, then the
//! descriptor's own middlewares in declared order, then the handler.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::middleware::{add_domain_and_tenant_info, add_permission_data};

use super::domain::{AuthorizationDomain, DomainScope};
use super::route::{Middleware, RouteDescriptor};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown authorization domain {domain:?} for path: {path} method {method}")]
    UnknownDomain {
        method: String,
        path: String,
        domain: String,
    },

    #[error("invalid permission {permission} for path: {path} method {method}: {source}")]
    InvalidPermission {
        method: String,
        path: String,
        permission: String,
        #[source]
        source: AppError,
    },

    #[error("permission is not set for path: {endpoint} method {method}")]
    MissingPermission {
        method: String,
        path: String,
        endpoint: String,
        domain: String,
    },

    #[error("unsupported method {method} for path: {path}")]
    UnsupportedMethod { method: String, path: String },

    #[error("route registered twice: {method} /{endpoint}")]
    DuplicateRoute { method: String, endpoint: String },

    #[error("invalid path: {path} method {method}: {reason}")]
    InvalidPath {
        method: String,
        path: String,
        reason: String,
    },
}

impl RegistryError {
    pub fn method(&self) -> &str {
        match self {
            RegistryError::UnknownDomain { method, .. }
            | RegistryError::InvalidPermission { method, .. }
            | RegistryError::MissingPermission { method, .. }
            | RegistryError::UnsupportedMethod { method, .. }
            | RegistryError::DuplicateRoute { method, .. }
            | RegistryError::InvalidPath { method, .. } => method,
        }
    }

    /// The descriptor path, or the concrete endpoint once one was derived.
    pub fn path(&self) -> &str {
        match self {
            RegistryError::UnknownDomain { path, .. }
            | RegistryError::InvalidPermission { path, .. }
            | RegistryError::UnsupportedMethod { path, .. }
            | RegistryError::InvalidPath { path, .. } => path,
            RegistryError::MissingPermission { endpoint, .. }
            | RegistryError::DuplicateRoute { endpoint, .. } => endpoint,
        }
    }
}

/// One concrete endpoint produced by registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredRoute {
    pub method: String,
    /// Concrete path, no leading slash.
    pub endpoint: String,
    pub domain: String,
    pub permissions: Vec<String>,
    /// Chain step names in execution order, handler excluded.
    pub middlewares: Vec<String>,
}

#[derive(Debug)]
pub struct Registration {
    pub router: Router,
    pub routes: Vec<RegisteredRoute>,
}

/// Expand, validate and mount every descriptor on `router`.
pub fn register_all<I>(mut router: Router, descriptors: I) -> Result<Registration, RegistryError>
where
    I: IntoIterator<Item = RouteDescriptor>,
{
    let mut routes = Vec::new();
    let mut seen = HashSet::new();

    for descriptor in descriptors {
        for domain in &descriptor.domains {
            let (route, chain) = expand(&descriptor, domain)?;

            let shape = endpoint_shape(&route.endpoint).map_err(|reason| {
                RegistryError::InvalidPath {
                    method: route.method.clone(),
                    path: route.endpoint.clone(),
                    reason,
                }
            })?;
            if !seen.insert((route.method.clone(), shape)) {
                return Err(RegistryError::DuplicateRoute {
                    method: route.method,
                    endpoint: route.endpoint,
                });
            }

            let filter = MethodFilter::try_from(descriptor.method.clone()).map_err(|_| {
                RegistryError::UnsupportedMethod {
                    method: route.method.clone(),
                    path: descriptor.path.clone(),
                }
            })?;

            router = mount(router, &route, endpoint(&descriptor, filter, chain))?;

            tracing::debug!(
                method = %route.method,
                endpoint = %route.endpoint,
                domain = %route.domain,
                chain = ?route.middlewares,
                "registered route"
            );
            routes.push(route);
        }
    }

    tracing::info!(count = routes.len(), "route registration complete");
    Ok(Registration { router, routes })
}

/// Derive the concrete endpoint and handler chain of `descriptor` under `domain`.
fn expand(
    descriptor: &RouteDescriptor,
    domain: &AuthorizationDomain,
) -> Result<(RegisteredRoute, Vec<Middleware>), RegistryError> {
    let method = descriptor.method.to_string();

    let scope = domain.scope().ok_or_else(|| RegistryError::UnknownDomain {
        method: method.clone(),
        path: descriptor.path.clone(),
        domain: domain.name.clone(),
    })?;
    let endpoint = scope.expand(&descriptor.path);

    let mut chain = Vec::new();
    let mut permissions = Vec::new();

    if !descriptor.unauthorized {
        for permission in &descriptor.permissions {
            permission.validate().map_err(|e| RegistryError::InvalidPermission {
                method: method.clone(),
                path: descriptor.path.clone(),
                permission: permission.name.clone(),
                source: ErrorKind::InvalidUserInput
                    .wrap(e, "invalid input")
                    .with_context("permission", &permission.name),
            })?;

            if permission.authorizes(&domain.id) {
                chain.push(add_permission_data(permission));
                permissions.push(permission.name.clone());
            }
        }

        if permissions.is_empty() {
            return Err(RegistryError::MissingPermission {
                method,
                path: descriptor.path.clone(),
                endpoint,
                domain: domain.name.clone(),
            });
        }
    }

    chain.push(add_domain_and_tenant_info(domain.clone(), scope));
    chain.extend(descriptor.middlewares.iter().cloned());

    let route = RegisteredRoute {
        method,
        endpoint,
        domain: scope_label(scope, domain),
        permissions,
        middlewares: chain.iter().map(|mw| mw.name().to_string()).collect(),
    };
    Ok((route, chain))
}

/// Parameter-insensitive form of `endpoint`: `trips/:id` and
/// `trips/:trip_id` share the shape `trips/:`.
fn endpoint_shape(endpoint: &str) -> Result<String, String> {
    let segments: Vec<&str> = if endpoint.is_empty() {
        Vec::new()
    } else {
        endpoint.split('/').collect()
    };
    let mut names = HashSet::new();
    let mut shape = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let kind = match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => "",
        };
        let name = &segment[kind.len()..];

        if name.contains(':') || name.contains('*') {
            return Err(format!("only one parameter is allowed per path segment: {segment}"));
        }
        if kind.is_empty() {
            shape.push(segment.to_string());
            continue;
        }
        if name.is_empty() {
            return Err(format!("path parameters must be named: {segment}"));
        }
        if kind == "*" && i + 1 != segments.len() {
            return Err(format!("catch-all parameters are only allowed at the end: {segment}"));
        }
        if !names.insert(name) {
            return Err(format!("path parameter {name} appears twice"));
        }
        shape.push(kind.to_string());
    }
    Ok(shape.join("/"))
}

/// Add one endpoint to `router`, reporting any conflict the router itself
/// detects as an error.
fn mount(
    router: Router,
    route: &RegisteredRoute,
    method_router: MethodRouter,
) -> Result<Router, RegistryError> {
    let path = format!("/{}", route.endpoint);
    panic::catch_unwind(AssertUnwindSafe(|| router.route(&path, method_router))).map_err(
        |payload| {
            let reason = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("route rejected by router")
                .to_string();
            RegistryError::InvalidPath {
                method: route.method.clone(),
                path: route.endpoint.clone(),
                reason,
            }
        },
    )
}

fn scope_label(scope: DomainScope, domain: &AuthorizationDomain) -> String {
    if scope.name() == domain.id {
        domain.id.clone()
    } else {
        format!("{} ({})", scope.name(), domain.id)
    }
}

/// Wrap the handler in `chain`, first element outermost.
fn endpoint(
    descriptor: &RouteDescriptor,
    filter: MethodFilter,
    chain: Vec<Middleware>,
) -> MethodRouter {
    let handler = descriptor.handler.clone();
    let mut method_router = on(filter, move |request: Request| handler(request));

    for mw in chain.into_iter().rev() {
        method_router = method_router.layer(from_fn(move |request: Request, next: Next| {
            mw.call(request, next)
        }));
    }
    method_router
}
