use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use sat_model::{Config, StateConfig, default_cron};
use tracing::{debug, warn};

use crate::{error::CoreError, schedule::CronSchedule};

/// Agent configuration shared between tasks.
///
/// Readers get an immutable snapshot; writers replace the whole snapshot.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<Arc<Config>>>,
    /// Bumped under the write lock on every snapshot swap.
    version: Arc<AtomicU64>,
    /// Version of the snapshot last written to `path`.
    written: Arc<Mutex<u64>>,
    /// File the configuration came from. Updated state configs are written back here.
    path: Option<Arc<PathBuf>>,
}

impl ConfigStore {
    /// In-memory store.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
            version: Arc::new(AtomicU64::new(0)),
            written: Arc::new(Mutex::new(0)),
            path: None,
        }
    }

    /// Load from a file and validate job schedules.
    ///
    /// Returns the store and the warnings produced while validating.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Vec<String>), CoreError> {
        let path = path.as_ref();
        let mut config = Config::load(path)?;
        let warnings = validate_jobs(&mut config);
        let store = Self {
            path: Some(Arc::new(path.to_path_buf())),
            ..Self::new(config)
        };
        Ok((store, warnings))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> Arc<Config> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn update<F>(&self, f: F) -> (Arc<Config>, u64)
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Config::clone(&guard);
        f(&mut next);
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        (next, version)
    }

    pub fn token(&self) -> String {
        self.snapshot().local.token.clone()
    }

    pub fn ground_control_url(&self) -> String {
        self.snapshot().local.ground_control_url.clone()
    }

    /// Upstream registry the satellite mirrors from.
    pub fn remote_registry_url(&self) -> String {
        self.snapshot().state_config.auth.registry.clone()
    }

    pub fn set_remote_registry_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.update(|cfg| cfg.state_config.auth.registry = url);
    }

    /// Registry the satellite mirrors into.
    ///
    /// `addr:port` of the operator's registry when `bring_own_registry` is set,
    /// otherwise the bundled registry URL.
    pub fn local_registry_url(&self) -> String {
        let cfg = self.snapshot();
        if cfg.local.bring_own_registry {
            format!("{}:{}", cfg.local.own_registry_addr, cfg.local.own_registry_port)
        } else {
            cfg.zot_url.clone()
        }
    }

    pub fn use_unsecure(&self) -> bool {
        self.snapshot().local.use_unsecure
    }

    pub fn own_registry(&self) -> bool {
        self.snapshot().local.bring_own_registry
    }

    pub fn log_level(&self) -> String {
        self.snapshot().log_level().to_string()
    }

    /// Cron expression configured for a job.
    pub fn job_schedule(&self, job: &str) -> Option<String> {
        self.snapshot().job(job).map(|j| j.cron_expression.clone())
    }

    pub fn state_config(&self) -> StateConfig {
        self.snapshot().state_config.clone()
    }

    /// Replace credentials and locators as a whole.
    ///
    /// A file-backed store also writes the new snapshot back to its file, off
    /// the async executor. Failures are logged, not returned.
    pub async fn update_state_config(&self, state_config: StateConfig) {
        let (next, version) = self.update(|cfg| cfg.state_config = state_config);
        let Some(path) = self.path.clone() else {
            return;
        };
        let written = Arc::clone(&self.written);

        let result =
            tokio::task::spawn_blocking(move || write_snapshot(&path, &next, version, &written)).await;
        match result {
            Ok(Ok(true)) => debug!(version, "configuration written"),
            Ok(Ok(false)) => debug!(version, "newer configuration already written"),
            Ok(Err(reason)) => warn!(%reason, "failed to write configuration"),
            Err(e) => warn!(error = %e, "configuration writer did not finish"),
        }
    }
}

/// Write `config` unless a newer version already reached the file.
fn write_snapshot(path: &Path, config: &Config, version: u64, written: &Mutex<u64>) -> Result<bool, String> {
    let mut last = written.lock().unwrap_or_else(PoisonError::into_inner);
    if *last >= version {
        return Ok(false);
    }
    let json = config.to_json_pretty().map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| format!("{}: {e}", path.display()))?;
    *last = version;
    Ok(true)
}

/// Check every job's cron expression.
///
/// Known jobs with an invalid expression fall back to their default; unknown
/// jobs are left as they are. Every problem produces one warning.
pub fn validate_jobs(config: &mut Config) -> Vec<String> {
    let mut warnings = Vec::new();
    for job in &mut config.local.jobs {
        let Err(e) = CronSchedule::parse(&job.cron_expression) else {
            continue;
        };
        match default_cron(&job.name) {
            Some(fallback) => {
                warnings.push(format!(
                    "{e} for job {}; using default schedule {fallback}",
                    job.name
                ));
                job.cron_expression = fallback.to_string();
            }
            None => warnings.push(format!("invalid cron job {}: {e}", job.name)),
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_model::{Auth, Job, LocalConfig, REPLICATE_STATE_JOB, UPDATE_CONFIG_JOB};

    fn sample() -> Config {
        Config {
            local: LocalConfig {
                ground_control_url: "http://gc".into(),
                token: "tok".into(),
                own_registry_addr: "10.0.0.1".into(),
                own_registry_port: "5000".into(),
                jobs: vec![
                    Job {
                        name: REPLICATE_STATE_JOB.into(),
                        cron_expression: "@every 00h01m00s".into(),
                    },
                    Job {
                        name: UPDATE_CONFIG_JOB.into(),
                        cron_expression: "nonsense".into(),
                    },
                    Job {
                        name: "custom".into(),
                        cron_expression: "also nonsense".into(),
                    },
                ],
                ..Default::default()
            },
            zot_url: "127.0.0.1:8585".into(),
            ..Default::default()
        }
    }

    #[test]
    fn accessors_read_snapshot() {
        let store = ConfigStore::new(sample());
        assert_eq!(store.token(), "tok");
        assert_eq!(store.ground_control_url(), "http://gc");
        assert_eq!(store.local_registry_url(), "127.0.0.1:8585");
        assert_eq!(store.job_schedule(REPLICATE_STATE_JOB).as_deref(), Some("@every 00h01m00s"));
        assert_eq!(store.job_schedule("missing"), None);
        assert_eq!(store.log_level(), "info");
    }

    #[test]
    fn own_registry_overrides_local_url() {
        let mut cfg = sample();
        cfg.local.bring_own_registry = true;
        let store = ConfigStore::new(cfg);
        assert!(store.own_registry());
        assert_eq!(store.local_registry_url(), "10.0.0.1:5000");
    }

    #[tokio::test]
    async fn updates_swap_snapshot_without_touching_old_readers() {
        let store = ConfigStore::new(sample());
        let before = store.snapshot();

        store.update_state_config(StateConfig {
            auth: Auth {
                name: "robot".into(),
                registry: "https://harbor".into(),
                secret: "pw".into(),
            },
            states: vec!["a".into()],
        })
        .await;

        assert!(before.state_config.auth.name.is_empty());
        assert_eq!(store.state_config().auth.name, "robot");
        assert_eq!(store.remote_registry_url(), "https://harbor");

        store.set_remote_registry_url("harbor.internal");
        assert_eq!(store.remote_registry_url(), "harbor.internal");
        assert_eq!(store.state_config().auth.name, "robot");
    }

    #[test]
    fn invalid_known_job_falls_back_to_default() {
        let mut cfg = sample();
        let warnings = validate_jobs(&mut cfg);

        assert_eq!(warnings.len(), 2);
        assert_eq!(cfg.job(UPDATE_CONFIG_JOB).unwrap().cron_expression, "@every 00h00m10s");
        assert_eq!(cfg.job("custom").unwrap().cron_expression, "also nonsense");
        assert_eq!(cfg.job(REPLICATE_STATE_JOB).unwrap().cron_expression, "@every 00h01m00s");
    }

    #[tokio::test]
    async fn load_validates_and_persists_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, sample().to_json_pretty().unwrap()).unwrap();

        let (store, warnings) = ConfigStore::load(&path).unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(store.path(), Some(path.as_path()));

        store.update_state_config(StateConfig {
            auth: Auth {
                name: "n".into(),
                registry: "r".into(),
                secret: "s".into(),
            },
            states: vec!["/tmp/state.json".into()],
        })
        .await;

        let on_disk = Config::load(&path).unwrap();
        assert_eq!(on_disk.state_config.auth.name, "n");
        assert_eq!(on_disk.state_config.states, ["/tmp/state.json"]);
    }

    fn named(name: &str) -> StateConfig {
        StateConfig {
            auth: Auth {
                name: name.into(),
                ..Default::default()
            },
            states: vec![],
        }
    }

    #[test]
    fn stale_snapshot_never_overwrites_newer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let written = Mutex::new(0);

        let mut newer = sample();
        newer.state_config = named("newer");
        let mut older = sample();
        older.state_config = named("older");

        assert_eq!(write_snapshot(&path, &newer, 2, &written), Ok(true));
        assert_eq!(write_snapshot(&path, &older, 1, &written), Ok(false));

        assert_eq!(Config::load(&path).unwrap().state_config.auth.name, "newer");
        assert_eq!(*written.lock().unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_leave_the_latest_snapshot_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, sample().to_json_pretty().unwrap()).unwrap();
        let (store, _) = ConfigStore::load(&path).unwrap();

        let updates: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.update_state_config(named(&format!("robot-{i}"))).await })
            })
            .collect();
        for update in updates {
            update.await.unwrap();
        }

        let on_disk = Config::load(&path).unwrap();
        assert_eq!(on_disk.state_config, store.state_config());
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(matches!(
            ConfigStore::load("/no/such/config.json"),
            Err(CoreError::Config(_))
        ));
    }
}
