//! Cluster preparation: wait for the GitOps operator, then log the `argocd`
//! CLI in against its API server. `kam` resource generation lives here too.

mod generate;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use tracing::info;

use crate::config::Config;
use crate::exec::{CommandExecutor, DynExecutor, Invocation};
use crate::poll::{ConvergenceReport, PollBudget, PollSpec, converge_all};
use crate::predicates::{ARGOCD, DeploymentRollout, OC};

pub use generate::generate_resources;

const SERVER_ROUTE: &str = "openshift-gitops-server";
const ADMIN_SECRET: &str = "openshift-gitops-cluster";
const ADMIN_USER: &str = "admin";

/// Wait for every deployment in `namespace` concurrently. Fails listing the
/// deployments that did not roll out.
pub async fn wait_for_operator(
    executor: &DynExecutor,
    namespace: &str,
    deployments: &[String],
    budget: PollBudget,
) -> Result<Vec<ConvergenceReport>> {
    let specs = deployments
        .iter()
        .map(|name| budget.spec(DeploymentRollout::new(executor.clone(), namespace, name)))
        .collect::<Result<Vec<PollSpec<DeploymentRollout>>, _>>()?;

    let reports = converge_all(&specs).await;

    let stalled = reports
        .iter()
        .filter(|report| !report.is_ready())
        .map(|report| format!("{} ({})", report.target, report.outcome))
        .collect::<Vec<_>>();
    if !stalled.is_empty() {
        bail!("GitOps operator is not ready: {}", stalled.join(", "));
    }

    info!(namespace, deployments = deployments.len(), "GitOps operator is ready");
    Ok(reports)
}

pub async fn argocd_server_host(executor: &dyn CommandExecutor, namespace: &str) -> Result<String> {
    let jsonpath =
        format!("jsonpath={{.items[?(@.metadata.name==\"{SERVER_ROUTE}\")].spec.host}}");
    let stdout = run_oc(
        executor,
        Invocation::new(OC, ["get", "routes", "-n", namespace, "-o", jsonpath.as_str()]),
    )
    .await?;

    let host = trim_output(&stdout);
    if host.is_empty() {
        bail!("route {SERVER_ROUTE} not found in namespace {namespace}");
    }
    Ok(host.to_string())
}

pub async fn argocd_admin_password(
    executor: &dyn CommandExecutor,
    namespace: &str,
) -> Result<String> {
    let stdout = run_oc(
        executor,
        Invocation::new(
            OC,
            [
                "get",
                "secret",
                ADMIN_SECRET,
                "-n",
                namespace,
                "-o",
                r"jsonpath={.data.admin\.password}",
            ],
        ),
    )
    .await?;

    let encoded = trim_output(&stdout);
    let decoded = STANDARD
        .decode(encoded)
        .with_context(|| format!("secret {ADMIN_SECRET} holds an invalid admin password"))?;
    String::from_utf8(decoded).context("admin password is not valid UTF-8")
}

pub async fn login_to_argocd(
    executor: &dyn CommandExecutor,
    host: &str,
    password: &str,
) -> Result<()> {
    let output = Invocation::new(
        ARGOCD,
        [
            "login",
            "--username",
            ADMIN_USER,
            "--password",
            password,
            host,
            "--grpc-web",
            "--insecure",
        ],
    )
    .run(executor)
    .await?;

    if !output.is_success() {
        bail!("argocd login to {host} failed: {}", output.failure_summary());
    }
    info!(host, "logged in to Argo CD");
    Ok(())
}

/// Wait for the operator, then log in. Returns the API server host.
pub async fn bootstrap(executor: &DynExecutor, config: &Config) -> Result<String> {
    let namespace = config.workflow.gitops_namespace.as_str();
    wait_for_operator(
        executor,
        namespace,
        &config.workflow.operator_deployments,
        config.waits.rollout,
    )
    .await?;

    let host = argocd_server_host(executor.as_ref(), namespace).await?;
    let password = argocd_admin_password(executor.as_ref(), namespace).await?;
    login_to_argocd(executor.as_ref(), &host, &password).await?;
    Ok(host)
}

/// `<major><minor>` of the OpenShift API server, e.g. `48` for 4.8.x.
pub async fn openshift_server_version(executor: &dyn CommandExecutor) -> Result<String> {
    let stdout = run_oc(executor, Invocation::new(OC, ["version"])).await?;
    parse_server_version(&stdout)
}

pub fn parse_server_version(output: &str) -> Result<String> {
    let pattern = Regex::new(r"Server\s+Version:\s+(\d.{2})").expect("Invalid version regex");
    let captured = pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| anyhow!("OpenShift API server version not found in `oc version` output"))?;

    Ok(captured.as_str().trim_matches('"').replace('.', ""))
}

async fn run_oc(executor: &dyn CommandExecutor, invocation: Invocation) -> Result<String> {
    let output = invocation.run(executor).await?;
    if !output.is_success() {
        bail!("`{invocation}` failed: {}", output.failure_summary());
    }
    Ok(output.stdout)
}

/// jsonpath output may come back quoted.
fn trim_output(raw: &str) -> &str {
    raw.trim().trim_matches('\'')
}

#[cfg(test)]
mod tests;
