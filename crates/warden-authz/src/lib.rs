//! Warden authorization primitives shared by the access-control service.
//!
//! # Purpose
//! Centralizes the permission model (topics, methods, permission sets), role
//! and API-token records, request-target parsing, token hashing, and the
//! permission-matching algorithm used to render allow/deny decisions.
//!
//! # How it fits
//! The service crate resolves credentials into identity facts (OIDC groups or
//! API-token permissions) and hands them to [`PermissionMatcher`] together with
//! the parsed [`RequestTarget`]. Nothing in this crate performs I/O.
//!
//! # Key invariants
//! - Every stored permission has a topic and method from the closed sets.
//! - Permissions are always stamped with the namespace of the owning role or
//!   token before they are persisted.
//! - `read` only ever matches `GET`; `manage` matches every method.
//!
//! # Examples
//! ```rust
//! use warden_authz::{Method, Permission, Permissions, Topic};
//!
//! let mut perms = Permissions::from(vec![Permission::new("", Topic::Secrets, Method::Read)]);
//! perms.stamp_namespace("payments");
//! assert!(perms.validate().is_ok());
//! assert_eq!(perms[0].namespace, "payments");
//! ```

mod errors;
mod groups;
mod matcher;
mod method;
mod permission;
mod record;
mod target;
mod token_hash;
mod topic;

pub use errors::{AuthzError, AuthzResult};
pub use groups::OidcGroups;
pub use matcher::{AllowedNamespaces, MatchOutcome, PermissionMatcher};
pub use method::Method;
pub use permission::{Permission, Permissions};
pub use record::{ApiToken, Role};
pub use target::{API_VERSION_PREFIXES, RequestTarget};
pub use token_hash::hash_token_id;
pub use topic::Topic;
