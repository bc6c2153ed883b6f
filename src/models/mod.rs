pub mod access;
pub mod rbac;
pub mod user;
