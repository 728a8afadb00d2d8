use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::Request,
    handler::Handler,
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;

use super::domain::AuthorizationDomain;
use super::permission::Permission;

/// Type-erased request handler.
pub type BoxedHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

type MiddlewareFn = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Erase any axum handler with unit state.
pub fn boxed_handler<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T, ()> + Sync,
    T: 'static,
{
    Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
        Box::pin(handler.clone().call(request, ()))
    })
}

/// A named step in a route's handler chain.
#[derive(Clone)]
pub struct Middleware {
    name: Cow<'static, str>,
    inner: MiddlewareFn,
}

impl Middleware {
    pub fn from_fn<F, Fut, Out>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse,
    {
        Self {
            name: name.into(),
            inner: Arc::new(move |request: Request, next: Next| -> BoxFuture<'static, Response> {
                let fut = f(request, next);
                Box::pin(async move { fut.await.into_response() })
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, request: Request, next: Next) -> BoxFuture<'static, Response> {
        (self.inner)(request, next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}

/// Declarative description of one handler exposed across one or more
/// authorization domains.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Relative path, no leading slash.
    pub path: String,
    pub handler: BoxedHandler,
    pub middlewares: Vec<Middleware>,
    pub permissions: Vec<Permission>,
    pub domains: Vec<AuthorizationDomain>,
    /// Public endpoint: skips permission coverage and injection.
    pub unauthorized: bool,
}

impl RouteDescriptor {
    pub fn new<H, T>(method: Method, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self {
            method,
            path: path.into(),
            handler: boxed_handler(handler),
            middlewares: Vec::new(),
            permissions: Vec::new(),
            domains: Vec::new(),
            unauthorized: false,
        }
    }

    pub fn get<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(Method::GET, path, handler)
    }

    pub fn post<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(Method::POST, path, handler)
    }

    pub fn put<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(Method::PUT, path, handler)
    }

    pub fn patch<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(Method::PATCH, path, handler)
    }

    pub fn delete<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::new(Method::DELETE, path, handler)
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn in_domain(mut self, domain: AuthorizationDomain) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn in_domains(mut self, domains: impl IntoIterator<Item = AuthorizationDomain>) -> Self {
        self.domains.extend(domains);
        self
    }

    pub fn public(mut self) -> Self {
        self.unauthorized = true;
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middlewares", &self.middlewares)
            .field("permissions", &self.permissions)
            .field("domains", &self.domains)
            .field("unauthorized", &self.unauthorized)
            .finish_non_exhaustive()
    }
}
