pub mod approval;
pub mod auth;
pub mod auth_provider;
pub mod dispatch;
pub mod password_auth;
pub mod role_admin;
pub mod role_resolver;
pub mod tenant_admin;
pub mod tenant_guard;
