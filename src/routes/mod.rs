pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod games;
pub mod health;
pub mod namespaces;
pub mod rbac;
