mod artifact;
pub use artifact::Artifact;

mod state;
pub use state::State;

mod auth;
pub use auth::{Auth, StateConfig};

mod task_id;
pub use task_id::TaskId;

mod payload;
pub use payload::{ConfigUpdate, StopTask};

/// Deserialize a `null` or missing JSON array as an empty vector.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
