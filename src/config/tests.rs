use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use crate::config::builder::ConfigBuilder;
use crate::config::constants::REQUIRED_LOCAL_VARS;
use crate::config::environment::{detect_ci_mode, env_string};
use crate::config::types::CiMode;
use crate::config::validation::validate;
use crate::config::{ApplicationTarget, Config};
use crate::error::ConvergenceError;
use crate::poll::PollBudget;
use crate::predicates::Phase;
use crate::scm::ScmProvider;

fn env_lock<'a>() -> std::sync::MutexGuard<'a, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn new(vars: &[(&str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect::<Vec<_>>();
        for (key, value) in vars {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

fn local_vars() -> HashMap<&'static str, String> {
    HashMap::from([
        ("SERVICE_REPO_URL", "https://github.com/example/taxi".to_string()),
        ("GITOPS_REPO_URL", "https://github.com/example/taxi-gitops".to_string()),
        ("IMAGE_REPO", "quay.io/example/taxi".to_string()),
        ("DOCKERCONFIGJSON_PATH", "/tmp/docker.json".to_string()),
        ("GIT_ACCESS_TOKEN", "secret-token".to_string()),
        ("BUS_REPO_URL", "https://github.com/example/bus".to_string()),
    ])
}

fn load(
    vars: &HashMap<&'static str, String>,
    file: Option<&Path>,
    server_version: Option<&str>,
) -> Result<Config> {
    let lookup = |key: &str| -> Result<Option<String>> { Ok(vars.get(key).cloned()) };
    Config::load_with(file, &lookup, server_version)
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, body).unwrap();
    path
}

fn empty_file(dir: &TempDir) -> PathBuf {
    write_config(dir, "")
}

#[test]
fn local_mode_reads_all_required_variables() {
    let dir = TempDir::new().unwrap();
    let config = load(&local_vars(), Some(&empty_file(&dir)), None).unwrap();

    assert_eq!(config.ci, CiMode::Local);
    assert_eq!(config.repositories.service_repo_url, "https://github.com/example/taxi");
    assert_eq!(config.repositories.image_repo, "quay.io/example/taxi");
    assert_eq!(config.repositories.docker_config_json, PathBuf::from("/tmp/docker.json"));
    assert_eq!(config.scm.access_token, "secret-token");
    assert_eq!(config.scm.gitops_repo.provider, ScmProvider::GitHub);
    assert_eq!(config.scm.gitops_repo.full_name(), "example/taxi-gitops");
    assert_eq!(config.workspace, PathBuf::from("."));
    assert_eq!(config.workflow.ci_namespace, "cicd");
    assert_eq!(config.workflow.application, None);
}

#[test]
fn missing_variables_are_named_in_the_error() {
    let dir = TempDir::new().unwrap();
    let mut vars = local_vars();
    vars.remove("IMAGE_REPO");
    vars.remove("BUS_REPO_URL");

    let err = load(&vars, Some(&empty_file(&dir)), None).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("IMAGE_REPO, BUS_REPO_URL are not set"), "{message}");
    assert!(matches!(
        err.downcast_ref::<ConvergenceError>(),
        Some(ConvergenceError::ConfigurationError(_))
    ));
}

#[test]
fn every_required_variable_is_reported_when_environment_is_empty() {
    let dir = TempDir::new().unwrap();
    let err = load(&HashMap::new(), Some(&empty_file(&dir)), None).unwrap_err();
    let message = err.to_string();
    for name in REQUIRED_LOCAL_VARS {
        assert!(message.contains(name), "{name} missing from: {message}");
    }
}

#[test]
fn unknown_ci_value_is_rejected() {
    let mut vars = local_vars();
    vars.insert("CI", "jenkins".to_string());
    let lookup = |key: &str| -> Result<Option<String>> { Ok(vars.get(key).cloned()) };

    let err = detect_ci_mode(&lookup).unwrap_err();
    assert!(err.to_string().contains("cannot run locally against OpenShift CI"));
}

#[test]
fn prow_mode_derives_repositories_from_server_version() {
    let dir = TempDir::new().unwrap();
    let vars = HashMap::from([
        ("CI", "prow".to_string()),
        ("PRNO", "1248".to_string()),
        ("KAM_QUAY_DOCKER_CONF_SECRET_FILE", "/secrets/quay.json".to_string()),
        ("GITHUB_TOKEN", "gh-token".to_string()),
    ]);

    let config = load(&vars, Some(&empty_file(&dir)), Some("48")).unwrap();

    assert_eq!(config.ci, CiMode::Prow);
    assert_eq!(
        config.repositories.gitops_repo_url,
        "https://github.com/kam-bot/taxi-124848"
    );
    assert_eq!(config.repositories.service_repo_url, "https://github.com/kam-bot/taxi");
    assert_eq!(config.repositories.image_repo, "quay.io/kam-bot/taxi");
    assert_eq!(config.repositories.bus_repo_url, "https://github.com/kam-bot/bus");
    assert_eq!(
        config.repositories.docker_config_json,
        PathBuf::from("/secrets/quay.json")
    );
    assert_eq!(config.scm.access_token, "gh-token");
    assert_eq!(config.scm.gitops_repo.name, "taxi-124848");
}

#[test]
fn prow_mode_names_its_own_source_variables() {
    let dir = TempDir::new().unwrap();
    let vars = HashMap::from([("CI", "prow".to_string()), ("PRNO", "7".to_string())]);

    let err = load(&vars, Some(&empty_file(&dir)), Some("48")).unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("KAM_QUAY_DOCKER_CONF_SECRET_FILE, GITHUB_TOKEN are not set"),
        "{message}"
    );
    assert!(!message.contains("DOCKERCONFIGJSON_PATH"), "{message}");
    assert!(!message.contains("GIT_ACCESS_TOKEN"), "{message}");
}

#[test]
fn prow_mode_without_server_version_fails() {
    let dir = TempDir::new().unwrap();
    let vars = HashMap::from([("CI", "prow".to_string()), ("GITHUB_TOKEN", "t".to_string())]);

    let err = load(&vars, Some(&empty_file(&dir)), None).unwrap_err();
    assert!(err.to_string().contains("server version not found"));
}

#[test]
fn empty_token_fails_validation() {
    let dir = TempDir::new().unwrap();
    let mut vars = local_vars();
    vars.insert("GIT_ACCESS_TOKEN", "  ".to_string());

    let err = load(&vars, Some(&empty_file(&dir)), None).unwrap_err();
    assert!(err.to_string().contains("set GIT_ACCESS_TOKEN"));
}

#[test]
fn file_overrides_defaults_and_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "workspace": "/from/file",
            "ci_namespace": "file-cicd",
            "pipeline_field_selector": "metadata.name=ci-dryrun",
            "application": { "name": "dev-app-taxi", "state": "Synced" },
            "waits": {
                "pipeline_start": { "interval": 5, "deadline": 120 }
            }
        }"#,
    );
    let mut vars = local_vars();
    vars.insert("GITOPS_E2E_WORKSPACE", "/from/env".to_string());

    let config = load(&vars, Some(&path), None).unwrap();

    assert_eq!(config.workspace, PathBuf::from("/from/env"));
    assert_eq!(config.workflow.ci_namespace, "file-cicd");
    assert_eq!(
        config.workflow.pipeline_field_selector.as_deref(),
        Some("metadata.name=ci-dryrun")
    );
    assert_eq!(
        config.workflow.application,
        Some(ApplicationTarget {
            name: "dev-app-taxi".to_string(),
            state: "Synced".to_string(),
        })
    );
    assert_eq!(
        config.waits.for_phase(Phase::PipelineStart),
        PollBudget::new(Duration::from_secs(5), Duration::from_secs(120))
    );
    assert_eq!(
        config.waits.for_phase(Phase::PipelineFinish).deadline,
        Duration::from_secs(20 * 60)
    );
}

#[test]
fn unknown_file_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "workspce": "/typo" }"#);

    let err = load(&local_vars(), Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("Failed parsing JSON config"));
}

#[test]
fn invalid_wait_budget_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{ "waits": { "rollout": { "interval": 30, "deadline": 10 } } }"#,
    );

    let err = load(&local_vars(), Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("waits.rollout"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");

    let err = load(&local_vars(), Some(&missing), None).unwrap_err();
    assert!(err.to_string().contains("Failed reading config"));
}

#[test]
fn default_config_file_is_read_from_home() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let config_dir = temp_home.path().join(".gitops-e2e");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.json"), r#"{ "ci_namespace": "home-cicd" }"#).unwrap();

    let _env = EnvGuard::new(&[
        ("HOME", Some(home.as_str())),
        ("CI", None),
        ("GITOPS_E2E_CI_NAMESPACE", None),
        ("GITOPS_E2E_WORKSPACE", None),
        ("GITOPS_E2E_SCM_API_URL", None),
        ("SERVICE_REPO_URL", Some("https://github.com/example/taxi")),
        ("GITOPS_REPO_URL", Some("https://gitlab.com/group/sub/taxi-gitops.git")),
        ("IMAGE_REPO", Some("quay.io/example/taxi")),
        ("DOCKERCONFIGJSON_PATH", Some("/tmp/docker.json")),
        ("GIT_ACCESS_TOKEN", Some("env-token")),
        ("BUS_REPO_URL", Some("https://github.com/example/bus")),
    ]);

    let config = Config::load_with(None, &env_string, None).unwrap();
    assert_eq!(config.workflow.ci_namespace, "home-cicd");
    assert_eq!(config.scm.gitops_repo.provider, ScmProvider::GitLab);
    assert_eq!(config.scm.gitops_repo.owner, "group/sub");
}

#[test]
fn env_string_distinguishes_unset_variables() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[("GITOPS_E2E_SAMPLE", None)]);
    assert_eq!(env_string("GITOPS_E2E_SAMPLE").unwrap(), None);

    let _env = EnvGuard::new(&[("GITOPS_E2E_SAMPLE", Some("value"))]);
    assert_eq!(env_string("GITOPS_E2E_SAMPLE").unwrap().as_deref(), Some("value"));
}

#[test]
fn builder_applies_closures() {
    let config = ConfigBuilder::new()
        .with_repositories(|repos| {
            repos.service_repo_url = Some("https://github.com/a/svc".into());
            repos.gitops_repo_url = Some("https://github.com/a/gitops".into());
            repos.bus_repo_url = Some("https://github.com/a/bus".into());
            repos.image_repo = Some("quay.io/a/svc".into());
            repos.docker_config_json = Some(PathBuf::from("/d.json"));
            repos.access_token = Some("tok".into());
        })
        .with_scm_api_url("http://127.0.0.1:9999")
        .with_waits(|waits| {
            waits.rollout = PollBudget::new(Duration::from_secs(2), Duration::from_secs(4))
        })
        .build()
        .unwrap();

    assert_eq!(config.scm.api_url.as_deref(), Some("http://127.0.0.1:9999"));
    assert_eq!(config.waits.rollout.deadline, Duration::from_secs(4));
    assert!(validate(&config).is_ok());
    assert!(!format!("{:?}", config.scm).contains("tok\""));
}
