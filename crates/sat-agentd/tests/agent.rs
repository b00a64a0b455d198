use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use sat_agentd::{Agent, AgentDeps, AgentError};
use sat_core::ConfigStore;
use sat_model::{Artifact, Config, Job, REPLICATE_STATE_JOB};
use sat_state::{FileConfigSource, RECONCILE_TASK, Replicator, StateError};
use serde_json::json;

#[derive(Default)]
struct Recorder {
    replicated: Mutex<Vec<String>>,
}

#[async_trait]
impl Replicator for Recorder {
    async fn replicate(&self, artifacts: &[Artifact]) -> Result<(), StateError> {
        let mut out = self.replicated.lock().unwrap();
        out.extend(artifacts.iter().map(|a| format!("{}/{}", a.repository, a.name)));
        Ok(())
    }

    async fn delete_replication_entity(&self, _artifacts: &[Artifact]) -> Result<(), StateError> {
        Ok(())
    }
}

async fn eventually<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn write_config(path: &Path, ground_control: &str) {
    let config = json!({
        "state_config": {},
        "environment_variables": {
            "ground_control_url": ground_control,
            "token": "edge-token",
            "log_level": "debug",
            "jobs": [
                {"name": "register_satellite", "cron_expression": "@every 50ms"},
                {"name": "replicate_state", "cron_expression": "@every 100ms"},
                {"name": "update_config", "cron_expression": "@every 100ms"}
            ]
        },
        "zot_url": "127.0.0.1:8585"
    });
    std::fs::write(path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registers_then_replicates_issued_state() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    std::fs::write(
        &state_path,
        json!({
            "registry": "harbor.example.com",
            "artifacts": [
                {"repository": "library/nginx", "tags": ["1.25"], "digest": "sha256:1"},
                {"repository": "library/scratch", "tags": null, "digest": "sha256:0"}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let locator = state_path.to_str().unwrap().to_string();

    let issued = json!({
        "auth": {"name": "robot$edge", "registry": "https://harbor.example.com", "secret": "s3cr3t"},
        "states": [locator.clone()]
    });
    let router = Router::new().route(
        "/satellites/ztr/edge-token",
        get(move || {
            let issued = issued.clone();
            async move { Json(issued) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let config_path = dir.path().join("config.json");
    write_config(&config_path, &format!("http://{addr}"));
    let (store, warnings) = ConfigStore::load(&config_path).unwrap();
    assert!(warnings.is_empty());

    let recorder = Arc::new(Recorder::default());
    let mut deps = AgentDeps::new(store.clone(), Arc::new(FileConfigSource::new(&config_path)));
    deps.replicator = recorder.clone();

    let agent = Agent::start(deps).unwrap();
    assert_eq!(agent.scheduler().len(), 3);

    eventually("registration to unschedule itself", || agent.scheduler().len() == 2).await;
    let remaining: Vec<_> = agent.scheduler().scheduled().into_iter().map(|(_, n)| n).collect();
    assert!(remaining.iter().any(|n| n == RECONCILE_TASK));

    eventually("nginx to be replicated", || {
        recorder.replicated.lock().unwrap().contains(&"library/nginx".to_string())
    })
    .await;
    assert_eq!(*recorder.replicated.lock().unwrap(), vec!["library/nginx".to_string()]);
    assert_eq!(agent.reconcile().credentials().source_registry, "harbor.example.com");

    let persisted = Config::load(&config_path).unwrap();
    assert_eq!(persisted.state_config.auth.name, "robot$edge");
    assert_eq!(persisted.state_config.states, vec![locator]);

    tokio::time::timeout(Duration::from_secs(5), agent.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn bad_schedule_is_reported() {
    let mut config = Config::default();
    config.local.jobs.push(Job {
        name: REPLICATE_STATE_JOB.into(),
        cron_expression: "every now and then".into(),
    });
    let store = ConfigStore::new(config);
    let dir = tempfile::tempdir().unwrap();
    let deps = AgentDeps::new(store, Arc::new(FileConfigSource::new(dir.path().join("c.json"))));

    let err = Agent::start(deps).err().expect("start should fail");
    assert!(matches!(err, AgentError::Schedule { task, .. } if task == RECONCILE_TASK));
}
