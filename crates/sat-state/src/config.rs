use std::time::Duration;

pub const REGISTRATION_TASK: &str = "zero-touch-registration-process";
pub const RECONCILE_TASK: &str = "fetch-replicate-state-process";
pub const CONFIG_REFRESH_TASK: &str = "update-config-process";

/// Control-plane route for zero-touch registration: `GET {url}/satellites/ztr/{token}`.
pub const ZTR_ROUTE: &str = "satellites/ztr";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Credentials the reconciliation task replicates with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Upstream registry, scheme stripped.
    pub source_registry: String,
    /// Local registry artifacts are mirrored into.
    pub destination: String,
    pub use_unsecure: bool,
}

impl Credentials {
    pub fn missing(&self) -> Vec<&'static str> {
        let checks = [
            (self.destination.is_empty(), "destination registry"),
            (self.source_registry.is_empty(), "source registry"),
            (self.username.is_empty(), "username"),
            (self.password.is_empty(), "password"),
        ];
        checks
            .into_iter()
            .filter_map(|(empty, what)| empty.then_some(what))
            .collect()
    }
}
