pub mod announcements;
pub mod auth;
pub mod packages;
pub mod params;
pub mod polls;
pub mod rbac;
pub mod residents;
pub mod sos;
pub mod tenancy;
pub mod visitors;
