pub mod access;
pub mod announcement;
pub mod auth;
pub mod context;
pub mod package;
pub mod poll;
pub mod profile;
pub mod resident;
pub mod role;
pub mod role_binding;
pub mod sos;
pub mod tenancy;
pub mod visitor;
