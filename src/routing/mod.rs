pub mod domain;
pub mod permission;
pub mod registry;
pub mod route;

pub use domain::{AuthDomains, AuthorizationDomain, DomainScope};
pub use permission::{Effect, Permission, Statement, StatementError};
pub use registry::{register_all, RegisteredRoute, Registration, RegistryError};
pub use route::{boxed_handler, BoxedHandler, Middleware, RouteDescriptor};
