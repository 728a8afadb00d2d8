use axum::Router;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::routes::service_routes;
use crate::routing::{register_all, RegisteredRoute};

pub fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let registration = register_all(Router::new(), service_routes(&config))?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registration.routes)?),
        OutputFormat::Text => {
            for route in &registration.routes {
                println!("{}", format_route(route));
            }
        }
    }
    Ok(())
}

fn format_route(route: &RegisteredRoute) -> String {
    let permissions = if route.permissions.is_empty() {
        "public".to_string()
    } else {
        route.permissions.join(",")
    };
    format!("{:<7} /{:<40} [{}]", route.method, route.endpoint, permissions)
}
