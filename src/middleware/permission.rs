use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
};

use crate::error::{AppError, ErrorKind};
use crate::routing::permission::{Permission, Statement};
use crate::routing::route::Middleware;

/// A permission whose statement applies to the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantedPermission {
    pub name: String,
    pub statement: Statement,
}

/// Statements injected for the matched endpoint, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionContext {
    pub grants: Vec<GrantedPermission>,
}

impl PermissionContext {
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.grants.iter().map(|g| &g.statement)
    }

    pub fn names(&self) -> Vec<&str> {
        self.grants.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Chain step that appends `permission`'s statement to the request's
/// [`PermissionContext`].
pub fn add_permission_data(permission: &Permission) -> Middleware {
    let grant = GrantedPermission {
        name: permission.name.clone(),
        statement: permission.statement.clone(),
    };
    Middleware::from_fn(
        format!("permission:{}", permission.name),
        move |mut request: Request, next: Next| {
            let grant = grant.clone();
            async move {
                match request.extensions_mut().get_mut::<PermissionContext>() {
                    Some(context) => context.grants.push(grant),
                    None => {
                        request.extensions_mut().insert(PermissionContext {
                            grants: vec![grant],
                        });
                    }
                }
                next.run(request).await
            }
        },
    )
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PermissionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PermissionContext>()
            .cloned()
            .ok_or_else(|| ErrorKind::InternalServerError.error("permission context missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn wrap(router: Router, mw: Middleware) -> Router {
        router.layer(from_fn(move |request: Request, next: Next| mw.call(request, next)))
    }

    #[tokio::test]
    async fn statements_accumulate_in_chain_order() {
        let view = Permission::new("view_trips", ["user"], Statement::allow("trip:view", "trips"));
        let export =
            Permission::new("export_trips", ["user"], Statement::allow("trip:export", "trips"));

        let app = Router::new().route(
            "/trips",
            get(|ctx: PermissionContext| async move { ctx.names().join(",") }),
        );
        let app = wrap(app, add_permission_data(&export));
        let app = wrap(app, add_permission_data(&view));

        let request = axum::http::Request::builder()
            .uri("/trips")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"view_trips,export_trips");
    }

    #[tokio::test]
    async fn missing_context_is_a_server_error() {
        let app = Router::new().route(
            "/trips",
            get(|_ctx: PermissionContext| async { "unreachable" }),
        );
        let request = axum::http::Request::builder()
            .uri("/trips")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn middleware_is_named_after_the_permission() {
        let p = Permission::new("view_trips", ["user"], Statement::allow("trip:view", "trips"));
        assert_eq!(add_permission_data(&p).name(), "permission:view_trips");
    }
}
