//! Request-target parsing.
//!
//! # Purpose
//! Turns an HTTP request path into the `(namespace, topic)` pair consulted by
//! the authorization engine.
//!
//! # Key invariants
//! - Repeated slashes, trailing slashes, `.` and `..` segments never change
//!   the parsed target of an otherwise identical logical path.
//! - Version prefixes are stripped only as whole path segments.
//! - Anything that is not `/namespaces/...` yields an empty namespace.
//! - Segments are percent-decoded after dot resolution, so the parsed
//!   namespace is the one a router hands to its handlers. A segment that
//!   decodes to something containing `/` or to invalid UTF-8 is rejected.
use crate::errors::{AuthzError, AuthzResult};
use percent_encoding::percent_decode_str;

/// API-version prefixes stripped from the start of a request path.
pub const API_VERSION_PREFIXES: [&str; 3] = ["/api/v1", "/api/v2", "/api/v3"];

const NAMESPACES: &str = "namespaces";

/// Namespace and topic addressed by a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTarget {
    pub namespace: String,
    pub topic: String,
}

impl RequestTarget {
    pub fn new(namespace: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            topic: topic.into(),
        }
    }

    /// Parse a raw (still percent-encoded) request path.
    ///
    /// ```rust
    /// use warden_authz::RequestTarget;
    ///
    /// let target = RequestTarget::from_path("/api/v2/namespaces/p2/t2/something").unwrap();
    /// assert_eq!(target, RequestTarget::new("p2", "t2"));
    ///
    /// let spaced = RequestTarget::from_path("/api/v2/namespaces/team%20a/roles").unwrap();
    /// assert_eq!(spaced.namespace, "team a");
    /// ```
    ///
    /// # Errors
    /// [`AuthzError::InvalidPath`] if a segment decodes to invalid UTF-8 or
    /// contains an encoded `/`.
    pub fn from_path(path: &str) -> AuthzResult<Self> {
        let segments = normalize(path)
            .into_iter()
            .map(decode_segment)
            .collect::<AuthzResult<Vec<String>>>()?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let rest = strip_version(&segments);

        Ok(match rest {
            [] => Self::default(),
            [first, ..] if *first != NAMESPACES => Self::new("", *first),
            [_] => Self::new("", NAMESPACES),
            [_, namespace] => Self::new(*namespace, NAMESPACES),
            [_, namespace, topic, ..] => Self::new(*namespace, *topic),
        })
    }

    /// Namespace creation: `POST /namespaces` with no target namespace.
    pub fn is_namespace_creation(&self, http_method: &str) -> bool {
        http_method == "POST" && self.topic == NAMESPACES && self.namespace.is_empty()
    }
}

/// Split into non-empty segments, resolving `.` and `..` lexically.
fn normalize(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

fn decode_segment(raw: &str) -> AuthzResult<String> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| AuthzError::InvalidPath(raw.to_string()))?;
    if decoded.contains('/') {
        return Err(AuthzError::InvalidPath(raw.to_string()));
    }
    Ok(decoded.into_owned())
}

fn strip_version<'a, 'b>(segments: &'b [&'a str]) -> &'b [&'a str] {
    for prefix in API_VERSION_PREFIXES {
        let prefix_segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        if segments.starts_with(&prefix_segments) {
            return &segments[prefix_segments.len()..];
        }
    }
    segments
}
