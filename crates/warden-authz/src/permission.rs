//! Permission and permission-set primitives.
//!
//! # Purpose
//! Defines the `(namespace, topic, method)` permission triple and the ordered
//! permission set carried by roles and API tokens.
//!
//! # How it fits
//! Roles and tokens store [`Permissions`]; the API-token resolver caches the
//! encoded form; the matcher evaluates candidate permissions against a parsed
//! request target.
//!
//! # Key invariants
//! - Topic and method are kept as their wire strings so that stored data with
//!   out-of-set values can still be loaded and rejected by [`Permissions::validate`].
//! - `namespace` is owned by the role/token; callers never choose it.
//!
//! # Examples
//! ```rust
//! use warden_authz::{Method, Permission, Permissions, Topic};
//!
//! let perms = Permissions::from(vec![Permission::new("ns1", Topic::Secrets, Method::Get)]);
//! let encoded = perms.encode();
//! assert_eq!(Permissions::decode(&encoded).expect("decode"), perms);
//! ```
use crate::{AuthzError, AuthzResult, Method, Topic};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Single grant of `method` on `topic` inside `namespace`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, alias = "Namespace")]
    pub namespace: String,
    #[serde(alias = "Topic")]
    pub topic: String,
    #[serde(alias = "Method")]
    pub method: String,
}

impl Permission {
    pub fn new(namespace: impl Into<String>, topic: Topic, method: Method) -> Self {
        Self {
            namespace: namespace.into(),
            topic: topic.as_str().to_string(),
            method: method.as_str().to_string(),
        }
    }

    /// Parse the method against the closed set.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidMethod`] when the method is not one of the allowed values.
    pub fn parsed_method(&self) -> AuthzResult<Method> {
        self.method
            .parse()
            .map_err(|_| AuthzError::InvalidMethod(self.method.clone()))
    }

    /// Parse the topic against the closed set.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidTopic`] when the topic is not one of the allowed values.
    pub fn parsed_topic(&self) -> AuthzResult<Topic> {
        self.topic
            .parse()
            .map_err(|_| AuthzError::InvalidTopic(self.topic.clone()))
    }
}

/// Ordered permission set owned by a role or API token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(Vec<Permission>);

impl Permissions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Check every permission against the closed topic and method sets.
    ///
    /// Pure and total: an empty set is always valid, and the first offending
    /// permission determines the error.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidMethod`] or [`AuthzError::InvalidTopic`].
    pub fn validate(&self) -> AuthzResult<()> {
        for perm in &self.0 {
            perm.parsed_method()?;
            perm.parsed_topic()?;
        }
        Ok(())
    }

    /// Overwrite the namespace of every permission with the owner's namespace.
    pub fn stamp_namespace(&mut self, namespace: &str) {
        for perm in &mut self.0 {
            perm.namespace = namespace.to_string();
        }
    }

    /// Encode as the canonical claim string (JSON array).
    pub fn encode(&self) -> String {
        // Serializing plain strings into a Vec cannot fail.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Decode a claim string produced by [`Permissions::encode`].
    ///
    /// An empty string decodes to an empty set.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidEncoding`] if the string is not a JSON permission array.
    pub fn decode(raw: &str) -> AuthzResult<Self> {
        if raw.is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(raw).map_err(|err| AuthzError::InvalidEncoding(err.to_string()))
    }

    pub fn into_inner(self) -> Vec<Permission> {
        self.0
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(value: Vec<Permission>) -> Self {
        Self(value)
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Permission> for Permissions {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl Deref for Permissions {
    type Target = Vec<Permission>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Permissions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'a> IntoIterator for &'a Permissions {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(topic: &str, method: &str) -> Permission {
        Permission {
            namespace: String::new(),
            topic: topic.to_string(),
            method: method.to_string(),
        }
    }

    #[test]
    fn empty_set_is_valid() {
        assert!(Permissions::new().validate().is_ok());
    }

    #[test]
    fn validate_accepts_full_cross_product() {
        let perms: Permissions = Topic::ALL
            .into_iter()
            .flat_map(|topic| {
                Method::ALL
                    .into_iter()
                    .map(move |method| Permission::new("ns", topic, method))
            })
            .collect();
        assert_eq!(perms.len(), Topic::ALL.len() * Method::ALL.len());
        assert!(perms.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_set_values() {
        let bad_methods = ["get", "HEAD", "OPTIONS", "Manage", "", "*"];
        for method in bad_methods {
            let perms = Permissions::from(vec![raw("secrets", method)]);
            assert_eq!(
                perms.validate(),
                Err(AuthzError::InvalidMethod(method.to_string()))
            );
        }
        let bad_topics = ["logging", "Secrets", "", "gateway", "api-tokens"];
        for topic in bad_topics {
            let perms = Permissions::from(vec![raw(topic, "GET")]);
            assert_eq!(
                perms.validate(),
                Err(AuthzError::InvalidTopic(topic.to_string()))
            );
        }
    }

    #[test]
    fn validate_reports_first_offender() {
        let perms = Permissions::from(vec![
            raw("secrets", "GET"),
            raw("nope", "GET"),
            raw("secrets", "nope"),
        ]);
        assert_eq!(
            perms.validate(),
            Err(AuthzError::InvalidTopic("nope".to_string()))
        );
    }

    #[test]
    fn stamp_namespace_overwrites_caller_value() {
        let mut perms = Permissions::from(vec![
            Permission::new("attacker", Topic::Secrets, Method::Get),
            Permission::new("", Topic::Files, Method::Manage),
        ]);
        perms.stamp_namespace("ns1");
        assert!(perms.iter().all(|perm| perm.namespace == "ns1"));
    }

    #[test]
    fn decode_accepts_empty_and_capitalized_fields() {
        assert!(Permissions::decode("").expect("empty").is_empty());
        let decoded = Permissions::decode(
            r#"[{"Namespace":"ns1","Topic":"secrets","Method":"GET"}]"#,
        )
        .expect("decode");
        assert_eq!(
            decoded,
            Permissions::from(vec![Permission::new("ns1", Topic::Secrets, Method::Get)])
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Permissions::decode("not-json").expect_err("garbage");
        assert!(matches!(err, AuthzError::InvalidEncoding(_)));
    }
}
