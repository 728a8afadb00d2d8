pub mod auth;
pub mod domain;
pub mod permission;
pub mod policy;
pub mod request_context;
pub mod response;

pub use auth::jwt_auth;
pub use domain::{add_domain_and_tenant_info, DomainContext};
pub use permission::{add_permission_data, GrantedPermission, PermissionContext};
pub use policy::{require_policy, Decision, EffectEvaluator, PolicyEvaluator, PolicyInput};
pub use request_context::{request_context, RequestContext, REQUEST_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
