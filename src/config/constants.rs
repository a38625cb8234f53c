pub const ENV_SERVICE_REPO_URL: &str = "SERVICE_REPO_URL";
pub const ENV_GITOPS_REPO_URL: &str = "GITOPS_REPO_URL";
pub const ENV_IMAGE_REPO: &str = "IMAGE_REPO";
pub const ENV_DOCKERCONFIGJSON_PATH: &str = "DOCKERCONFIGJSON_PATH";
pub const ENV_GIT_ACCESS_TOKEN: &str = "GIT_ACCESS_TOKEN";
pub const ENV_BUS_REPO_URL: &str = "BUS_REPO_URL";
pub const ENV_CI: &str = "CI";
pub const ENV_PRNO: &str = "PRNO";
pub const ENV_QUAY_DOCKER_CONF: &str = "KAM_QUAY_DOCKER_CONF_SECRET_FILE";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_WORKSPACE: &str = "GITOPS_E2E_WORKSPACE";
pub const ENV_SCM_API_URL: &str = "GITOPS_E2E_SCM_API_URL";
pub const ENV_CI_NAMESPACE: &str = "GITOPS_E2E_CI_NAMESPACE";

/// Variables that must be present when not running under CI.
pub const REQUIRED_LOCAL_VARS: [&str; 6] = [
    ENV_SERVICE_REPO_URL,
    ENV_GITOPS_REPO_URL,
    ENV_IMAGE_REPO,
    ENV_DOCKERCONFIGJSON_PATH,
    ENV_GIT_ACCESS_TOKEN,
    ENV_BUS_REPO_URL,
];

/// Sources of the same inputs under prow, in the same order.
pub const REQUIRED_PROW_VARS: [&str; 6] = [
    ENV_SERVICE_REPO_URL,
    ENV_GITOPS_REPO_URL,
    ENV_IMAGE_REPO,
    ENV_QUAY_DOCKER_CONF,
    ENV_GITHUB_TOKEN,
    ENV_BUS_REPO_URL,
];

pub const PROW_SERVICE_REPO_URL: &str = "https://github.com/kam-bot/taxi";
pub const PROW_GITOPS_REPO_PREFIX: &str = "https://github.com/kam-bot/taxi-";
pub const PROW_IMAGE_REPO: &str = "quay.io/kam-bot/taxi";
pub const PROW_BUS_REPO_URL: &str = "https://github.com/kam-bot/bus";

pub const GITOPS_NAMESPACE: &str = "openshift-gitops";
pub const CI_NAMESPACE: &str = "cicd";
pub const OPERATOR_DEPLOYMENTS: [&str; 6] = [
    "openshift-gitops-server",
    "openshift-gitops-repo-server",
    "openshift-gitops-redis",
    "openshift-gitops-applicationset-controller",
    "kam",
    "cluster",
];

pub const PULL_REQUEST_TITLE: &str = "Add new service";
pub const PULL_REQUEST_HEAD: &str = "addNewService";
pub const PULL_REQUEST_BASE: &str = "main";
pub const REPOSITORY_DESCRIPTION: &str = "repocreate";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_ROLLOUT_DEADLINE_SECS: u64 = 10 * 60;
pub const DEFAULT_SYNC_DEADLINE_SECS: u64 = 10 * 60;
pub const DEFAULT_PIPELINE_START_DEADLINE_SECS: u64 = 30 * 60;
pub const DEFAULT_PIPELINE_FINISH_DEADLINE_SECS: u64 = 20 * 60;

pub const CONFIG_DIR: &str = ".gitops-e2e";
pub const CONFIG_FILE: &str = "config.json";
