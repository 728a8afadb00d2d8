pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod routing;

pub use app::{build_app, App};
pub use error::{AppError, ErrorKind};
