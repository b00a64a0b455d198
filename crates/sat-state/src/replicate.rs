use async_trait::async_trait;
use sat_model::Artifact;
use tracing::info;

use crate::errors::StateError;

/// Moves artifacts between the upstream and the local registry.
#[async_trait]
pub trait Replicator: Send + Sync {
    /// Copy `artifacts` from upstream into the local registry.
    async fn replicate(&self, artifacts: &[Artifact]) -> Result<(), StateError>;

    /// Remove `artifacts` from the local registry.
    async fn delete_replication_entity(&self, artifacts: &[Artifact]) -> Result<(), StateError>;
}

/// Logs what would be copied or removed and touches nothing.
#[derive(Debug, Clone)]
pub struct DryRunReplicator {
    destination: String,
}

impl DryRunReplicator {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

fn reference(a: &Artifact) -> String {
    let name = if a.repository.is_empty() || a.repository == a.name {
        a.name.clone()
    } else {
        format!("{}/{}", a.repository, a.name)
    };
    match a.first_tag() {
        Some(tag) => format!("{name}:{tag}"),
        None => format!("{name}@{}", a.digest),
    }
}

#[async_trait]
impl Replicator for DryRunReplicator {
    async fn replicate(&self, artifacts: &[Artifact]) -> Result<(), StateError> {
        for a in artifacts {
            info!(
                destination = %self.destination,
                artifact = %reference(a),
                digest = %a.digest,
                "replicate (dry run)"
            );
        }
        Ok(())
    }

    async fn delete_replication_entity(&self, artifacts: &[Artifact]) -> Result<(), StateError> {
        for a in artifacts {
            info!(
                destination = %self.destination,
                artifact = %reference(a),
                digest = %a.digest,
                "delete (dry run)"
            );
        }
        Ok(())
    }
}
