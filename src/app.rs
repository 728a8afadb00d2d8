use axum::{
    http::{HeaderValue, Uri},
    middleware::from_fn,
    Extension, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, ServerConfig};
use crate::database::Database;
use crate::error::{AppError, ErrorKind};
use crate::middleware::request_context;
use crate::routing::{register_all, RegisteredRoute, RegistryError, RouteDescriptor};

/// The assembled service.
#[derive(Debug)]
pub struct App {
    pub router: Router,
    pub routes: Vec<RegisteredRoute>,
}

/// Register `descriptors` and wrap them in the application-wide layers.
pub fn build_app<I>(
    config: &AppConfig,
    descriptors: I,
    database: Database,
) -> Result<App, RegistryError>
where
    I: IntoIterator<Item = RouteDescriptor>,
{
    let registration = register_all(Router::new(), descriptors)?;

    let router = match base_path(&config.server) {
        Some(base) => Router::new().nest(&base, registration.router),
        None => registration.router,
    };

    let router = router
        .fallback(not_found)
        .layer(Extension(database))
        .layer(from_fn(request_context))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http());

    Ok(App {
        router,
        routes: registration.routes,
    })
}

/// Normalised nesting prefix; `None` mounts at the root.
fn base_path(server: &ServerConfig) -> Option<String> {
    let trimmed = server.base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn not_found(uri: Uri) -> AppError {
    ErrorKind::ResourceNotFound
        .error("route not found")
        .with_context("path", uri.path())
}
