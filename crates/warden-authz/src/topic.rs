use serde::{Deserialize, Serialize};

/// Coarse resource category a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Namespaces,
    Instances,
    Syncs,
    Secrets,
    Variables,
    Files,
    Services,
    Registries,
    Logs,
    Notifications,
    Metrics,
    Events,
    Roles,
    ApiTokens,
}

impl Topic {
    pub const ALL: [Topic; 14] = [
        Topic::Namespaces,
        Topic::Instances,
        Topic::Syncs,
        Topic::Secrets,
        Topic::Variables,
        Topic::Files,
        Topic::Services,
        Topic::Registries,
        Topic::Logs,
        Topic::Notifications,
        Topic::Metrics,
        Topic::Events,
        Topic::Roles,
        Topic::ApiTokens,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Namespaces => "namespaces",
            Topic::Instances => "instances",
            Topic::Syncs => "syncs",
            Topic::Secrets => "secrets",
            Topic::Variables => "variables",
            Topic::Files => "files",
            Topic::Services => "services",
            Topic::Registries => "registries",
            Topic::Logs => "logs",
            Topic::Notifications => "notifications",
            Topic::Metrics => "metrics",
            Topic::Events => "events",
            Topic::Roles => "roles",
            Topic::ApiTokens => "api_tokens",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == value)
            .ok_or(())
    }
}
