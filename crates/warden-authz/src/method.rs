use serde::{Deserialize, Serialize};

/// Method a permission grants.
///
/// `Read` is an alias that only ever matches `GET`; `Manage` matches any HTTP
/// method. The remaining variants match their HTTP method exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "PATCH")]
    Patch,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "manage")]
    Manage,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Post,
        Method::Get,
        Method::Delete,
        Method::Patch,
        Method::Put,
        Method::Read,
        Method::Manage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Get => "GET",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Read => "read",
            Method::Manage => "manage",
        }
    }

    /// Whether a permission carrying this method grants `http_method`.
    pub fn grants(self, http_method: &str) -> bool {
        match self {
            Method::Manage => true,
            Method::Read => http_method == "GET",
            other => other.as_str() == http_method,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or(())
    }
}
