use serde::{Deserialize, Serialize};

use super::null_as_empty;

/// A single registry entity listed in a state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Repository path. After [`Artifact::normalize`] this holds only the parent path.
    #[serde(default)]
    pub repository: String,
    /// Leaf image name.
    #[serde(default)]
    pub name: String,
    /// Tags pointing at this artifact. A `null` list decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Content digest (e.g. `sha256:...`).
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub deleted: bool,
}

impl Artifact {
    pub fn new<R, N, D>(repository: R, name: N, tags: Vec<String>, digest: D) -> Self
    where
        R: Into<String>,
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            repository: repository.into(),
            name: name.into(),
            tags,
            digest: digest.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn first_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    #[inline]
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Identity used when comparing two snapshots: `name|first-tag`.
    ///
    /// Untagged artifacts have no identity and never take part in a diff.
    pub fn diff_key(&self) -> Option<String> {
        self.first_tag().map(|tag| format!("{}|{}", self.name, tag))
    }

    /// Split a combined repository path into parent repository and leaf name.
    ///
    /// - `library/team/nginx` becomes repository `library/team`, name `nginx`;
    /// - `nginx` keeps its repository and uses it as the name;
    /// - an empty repository leaves the artifact untouched.
    pub fn normalize(&mut self) {
        let path = self.repository.trim_end_matches('/');
        if path.is_empty() {
            return;
        }
        match path.rsplit_once('/') {
            Some((repo, leaf)) => {
                let (repo, leaf) = (repo.to_string(), leaf.to_string());
                self.repository = repo;
                self.name = leaf;
            }
            None => {
                let leaf = path.to_string();
                self.repository = leaf.clone();
                self.name = leaf;
            }
        }
    }
}
