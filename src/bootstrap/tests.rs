use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::exec::scripted::ScriptedExecutor;
use crate::exec::{CommandOutput, ExecError};

const ROLLED_OUT: &str = "deployment \"x\" successfully rolled out";

fn budget() -> PollBudget {
    PollBudget::new(Duration::from_secs(1), Duration::from_secs(10))
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn operator_wait_runs_deployments_concurrently() {
    let scripted = Arc::new(
        ScriptedExecutor::new()
            .on(
                "deployment kam ",
                vec![
                    Ok(CommandOutput::failure(1, "Waiting for deployment spec update")),
                    Ok(CommandOutput::failure(1, "Waiting for deployment spec update")),
                    Ok(CommandOutput::success(ROLLED_OUT)),
                ],
            )
            .on("rollout status", vec![Ok(CommandOutput::success(ROLLED_OUT))]),
    );
    let executor: DynExecutor = scripted.clone();
    let started = tokio::time::Instant::now();

    let reports = wait_for_operator(
        &executor,
        "openshift-gitops",
        &names(&["openshift-gitops-server", "kam", "cluster"]),
        budget(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|report| report.is_ready()));
    // Slowest deployment needs three evaluations; the others do not add to it.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    assert_eq!(scripted.count_matching("deployment kam "), 3);
    assert!(
        scripted
            .calls()
            .iter()
            .all(|call| call.contains("-n openshift-gitops --watch=false"))
    );
}

#[tokio::test(start_paused = true)]
async fn operator_wait_names_stalled_deployments() {
    let executor: DynExecutor = Arc::new(
        ScriptedExecutor::new()
            .on("deployment cluster ", vec![Ok(CommandOutput::success("Waiting for rollout"))])
            .on("rollout status", vec![Ok(CommandOutput::success(ROLLED_OUT))]),
    );

    let err = wait_for_operator(&executor, "openshift-gitops", &names(&["kam", "cluster"]), budget())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("deployment openshift-gitops/cluster (timed out)"), "{message}");
    assert!(!message.contains("openshift-gitops/kam"));
}

#[tokio::test]
async fn server_host_is_read_from_route_and_unquoted() {
    let executor = ScriptedExecutor::new().on(
        "get routes",
        vec![Ok(CommandOutput::success("'openshift-gitops-server-openshift-gitops.apps.example.com'"))],
    );

    let host = argocd_server_host(&executor, "openshift-gitops").await.unwrap();
    assert_eq!(host, "openshift-gitops-server-openshift-gitops.apps.example.com");
    assert_eq!(
        executor.calls(),
        vec![
            "oc get routes -n openshift-gitops -o jsonpath={.items[?(@.metadata.name==\"openshift-gitops-server\")].spec.host}"
        ]
    );
}

#[tokio::test]
async fn missing_route_is_an_error() {
    let executor = ScriptedExecutor::new().on("get routes", vec![Ok(CommandOutput::success(""))]);
    let err = argocd_server_host(&executor, "openshift-gitops").await.unwrap_err();
    assert!(err.to_string().contains("route openshift-gitops-server not found"));
}

#[tokio::test]
async fn admin_password_is_base64_decoded() {
    // base64("s3cr3t-pw")
    let executor = ScriptedExecutor::new()
        .on("get secret", vec![Ok(CommandOutput::success("'czNjcjN0LXB3'"))]);

    let password = argocd_admin_password(&executor, "openshift-gitops").await.unwrap();
    assert_eq!(password, "s3cr3t-pw");
    assert!(executor.calls()[0].contains(r"jsonpath={.data.admin\.password}"));
    assert!(executor.calls()[0].contains("secret openshift-gitops-cluster"));
}

#[tokio::test]
async fn corrupt_password_is_reported() {
    let executor = ScriptedExecutor::new()
        .on("get secret", vec![Ok(CommandOutput::success("not base64!!"))]);
    let err = argocd_admin_password(&executor, "openshift-gitops").await.unwrap_err();
    assert!(err.to_string().contains("invalid admin password"));
}

#[tokio::test]
async fn login_passes_grpc_web_flags() {
    let executor = ScriptedExecutor::new().on("argocd login", vec![Ok(CommandOutput::success(""))]);
    login_to_argocd(&executor, "argocd.example.com", "pw").await.unwrap();
    assert_eq!(
        executor.calls(),
        vec!["argocd login --username admin --password pw argocd.example.com --grpc-web --insecure"]
    );
}

#[tokio::test]
async fn login_failure_does_not_leak_password() {
    let executor = ScriptedExecutor::new().on(
        "argocd login",
        vec![Ok(CommandOutput::failure(20, "rpc error: Unauthenticated"))],
    );
    let err = login_to_argocd(&executor, "argocd.example.com", "pw-123").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Unauthenticated"));
    assert!(!message.contains("pw-123"));
}

#[tokio::test]
async fn missing_oc_binary_surfaces_not_found() {
    let executor = ScriptedExecutor::new().on(
        "oc version",
        vec![Err(ExecError::NotFound {
            program: "oc".to_string(),
        })],
    );
    let err = openshift_server_version(&executor).await.unwrap_err();
    assert!(err.to_string().contains("Command not found: oc"));
}

#[test]
fn server_version_strips_the_dot() {
    let output = "Client Version: 4.9.0\nServer Version: 4.8.12\nKubernetes Version: v1.21.1\n";
    assert_eq!(parse_server_version(output).unwrap(), "48");
}

#[test]
fn server_version_missing_is_an_error() {
    let output = "Client Version: 4.9.0\n";
    assert!(parse_server_version(output).is_err());
}

fn kam_config(workspace: &std::path::Path) -> Config {
    Config::builder()
        .with_repositories(|repos| {
            repos.service_repo_url = Some("https://github.com/example/taxi".into());
            repos.gitops_repo_url = Some("https://github.com/example/taxi-gitops".into());
            repos.bus_repo_url = Some("https://github.com/example/bus".into());
            repos.image_repo = Some("quay.io/example/taxi".into());
            repos.docker_config_json = Some(std::path::PathBuf::from("/tmp/docker.json"));
            repos.access_token = Some("ghp_secret".into());
        })
        .with_workspace(workspace)
        .build()
        .unwrap()
}

#[tokio::test]
async fn generate_passes_every_repository_setting_to_kam() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("bootstrapresources");
    std::fs::create_dir_all(&output).unwrap();
    let executor = ScriptedExecutor::new().on("kam ", vec![Ok(CommandOutput::success(""))]);

    let generated = generate_resources(&executor, &kam_config(dir.path())).await.unwrap();

    assert_eq!(generated, output);
    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    let out = output.display().to_string();
    assert_eq!(
        calls[0],
        format!(
            "kam bootstrap --service-repo-url https://github.com/example/taxi \
             --gitops-repo-url https://github.com/example/taxi-gitops \
             --image-repo quay.io/example/taxi --dockercfgjson /tmp/docker.json \
             --git-host-access-token ghp_secret --output {out} --overwrite"
        )
    );
    assert_eq!(
        calls[1],
        format!(
            "kam service add --env-name new-env --app-name app-bus --service-name bus \
             --git-repo-url https://github.com/example/bus --pipelines-folder {out}"
        )
    );
}

#[tokio::test]
async fn failed_kam_bootstrap_stops_before_service_add() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::new().on(
        "kam bootstrap",
        vec![Ok(CommandOutput::failure(1, "invalid image repo"))],
    );

    let err = generate_resources(&executor, &kam_config(dir.path()))
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("kam bootstrap failed"));
    assert!(err.contains("invalid image repo"));
    assert!(!err.contains("ghp_secret"));
    assert_eq!(executor.count_matching("service add"), 0);
}

#[tokio::test]
async fn generate_requires_the_output_tree() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::new().on("kam ", vec![Ok(CommandOutput::success(""))]);

    let err = generate_resources(&executor, &kam_config(dir.path()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("was not created"));
}
