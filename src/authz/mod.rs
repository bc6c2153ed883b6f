//! Authorization module - permission resolution and request guards
//!
//! A principal is checked against one of three request shapes:
//! - division-scoped permissions, through groups owned by the division
//! - resource-scoped permissions on a game, all granted by one role
//! - legacy namespace grants matched by wildcard path
//!
//! The resolver in use is picked at startup from [`AuthzMode`].

mod catalog;
mod decision;
pub mod guard;
mod legacy;
pub mod namespace;
mod principal;
mod resolver;
mod strategy;

pub use catalog::{Catalog, CatalogEntry, Permission, PermissionScope, CATALOG_VERSION};
pub use decision::{AccessRequest, AuthzError, AuthzResult, Decision, NamespaceAction};
pub use legacy::NamespaceResolver;
pub use principal::{Authorized, Principal, ResourceScope};
pub use resolver::{evaluate_division, evaluate_resource, validate_request, GraphResolver, Resolver};
pub use strategy::{build_resolver, AllowAllResolver, AuthzMode, FixedPrincipalResolver, RoutingResolver};
