use serde::{Deserialize, Serialize};

/// Registry identity issued by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
}

impl Auth {
    /// Names of the fields that are still empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.name.is_empty() {
            out.push("name");
        }
        if self.registry.is_empty() {
            out.push("registry");
        }
        if self.secret.is_empty() {
            out.push("secret");
        }
        out
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Credentials plus the state sources this satellite must track.
///
/// Always replaced as a whole; never patched field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub auth: Auth,
    /// State locators: URLs or file paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "super::null_as_empty")]
    pub states: Vec<String>,
}
