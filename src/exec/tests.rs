use super::scripted::ScriptedExecutor;
use super::{CommandExecutor, CommandOutput, ExecError, Invocation, ProcessExecutor};

#[test]
fn invocation_renders_command_line() {
    let invocation = Invocation::new("oc", ["get", "pipelinerun"]).arg("-n").arg("cicd");
    assert_eq!(invocation.to_string(), "oc get pipelinerun -n cicd");
}

#[test]
fn failure_summary_prefers_stderr() {
    let output = CommandOutput {
        stdout: "partial".to_string(),
        stderr: "error: forbidden\n".to_string(),
        exit_code: Some(1),
    };
    assert_eq!(output.failure_summary(), "exit code 1: error: forbidden");

    let signalled = CommandOutput {
        stdout: "partial".to_string(),
        stderr: String::new(),
        exit_code: None,
    };
    assert_eq!(signalled.failure_summary(), "terminated by signal: partial");
}

#[tokio::test]
async fn process_executor_captures_output() {
    let executor = ProcessExecutor::new();
    let output = executor
        .run("sh", &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()])
        .await
        .expect("sh should spawn");

    assert_eq!(output.stdout.trim(), "out");
    assert_eq!(output.stderr.trim(), "err");
    assert_eq!(output.exit_code, Some(3));
    assert!(!output.is_success());
}

#[tokio::test]
async fn process_executor_reports_missing_binary() {
    let executor = ProcessExecutor::new();
    let err = executor
        .run("definitely-not-a-real-binary-xyz", &[])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecError::NotFound {
            program: "definitely-not-a-real-binary-xyz".to_string()
        }
    );
}

#[test]
fn process_executor_caches_resolution() {
    let executor = ProcessExecutor::new();
    let first = executor.resolve("sh").expect("sh should resolve");
    let second = executor.resolve("sh").expect("sh should resolve");
    assert_eq!(first, second);
}

#[tokio::test]
async fn scripted_executor_replays_then_repeats_last_reply() {
    let executor = ScriptedExecutor::new().on(
        "rollout status",
        vec![
            Ok(CommandOutput::success("Waiting for rollout")),
            Ok(CommandOutput::success("successfully rolled out")),
        ],
    );
    let args = vec!["rollout".to_string(), "status".to_string()];

    let first = executor.run("oc", &args).await.unwrap();
    let second = executor.run("oc", &args).await.unwrap();
    let third = executor.run("oc", &args).await.unwrap();

    assert_eq!(first.stdout, "Waiting for rollout");
    assert_eq!(second.stdout, "successfully rolled out");
    assert_eq!(third.stdout, "successfully rolled out");
    assert_eq!(executor.count_matching("oc rollout status"), 3);
}

#[test]
fn logged_arguments_hide_secrets() {
    let args = [
        "login",
        "--username",
        "admin",
        "--password",
        "hunter2",
        "-c",
        "http.extraHeader=AUTHORIZATION: basic abc",
    ]
    .map(String::from);

    let shown = super::process::redacted(&args).join(" ");
    assert!(!shown.contains("hunter2"));
    assert!(!shown.contains("basic abc"));
    assert!(shown.contains("--password <redacted>"));
    assert!(shown.contains("--username admin"));

    let kam = ["bootstrap", "--git-host-access-token", "ghp_123", "--output", "out"].map(String::from);
    let shown = super::process::redacted(&kam).join(" ");
    assert!(!shown.contains("ghp_123"));
    assert!(shown.contains("--output out"));
}
