use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Ordered set of OIDC group names attached to a role or resolved from a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OidcGroups(Vec<String>);

impl OidcGroups {
    pub fn new(groups: Vec<String>) -> Self {
        Self(groups)
    }

    /// Parse a comma-joined group claim, dropping empty segments.
    pub fn from_joined(raw: &str) -> Self {
        Self(
            raw.split(',')
                .filter(|group| !group.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn join(&self) -> String {
        self.0.join(",")
    }

    /// Reject empty group names; an empty list is valid (and inert).
    ///
    /// # Errors
    /// - [`AuthzError::EmptyGroup`] if any entry is the empty string.
    pub fn validate(&self) -> AuthzResult<()> {
        if self.0.iter().any(String::is_empty) {
            return Err(AuthzError::EmptyGroup);
        }
        Ok(())
    }

    pub fn contains(&self, group: &str) -> bool {
        self.0.iter().any(|candidate| candidate == group)
    }
}

impl Deref for OidcGroups {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for OidcGroups {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[&str; N]> for OidcGroups {
    fn from(value: [&str; N]) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}
