use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::info;

use crate::bootstrap;
use crate::config::{Config, PULL_REQUEST_HEAD};
use crate::exec::{DynExecutor, ProcessExecutor};
use crate::poll::PollBudget;
use crate::predicates::{ExternalTarget, GateReport, PipelineRunSelector, await_target};
use crate::resources::{GitPublisher, ResourcePublisher, checkout_dir};
use crate::scm::{ScmClient, client_for};
use crate::workflow::{Collaborators, Sequencer, WorkflowOutcome};

use super::args::{Cli, Command, RunArgs, WaitArgs, WaitTarget};
use super::report;

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let executor: DynExecutor = Arc::new(ProcessExecutor::new());
    let config = Config::load(cli.config.as_deref(), executor.as_ref()).await?;

    match cli.command {
        Command::Run(args) => run_workflow(args, config, executor).await,
        Command::Bootstrap => {
            let host = bootstrap::bootstrap(&executor, &config).await?;
            report::print_bootstrap(&host);
            Ok(())
        }
        Command::Generate => {
            let output = bootstrap::generate_resources(executor.as_ref(), &config).await?;
            report::print_generated(&output);
            Ok(())
        }
        Command::Wait(args) => wait(args, &config, &executor).await,
        Command::Cleanup => cleanup(&config).await,
    }
}

fn scm_client(config: &Config) -> Result<Arc<dyn ScmClient>> {
    let client = client_for(
        &config.scm.gitops_repo,
        &config.scm.access_token,
        config.scm.api_url.as_deref(),
    )?;
    Ok(Arc::from(client))
}

async fn run_workflow(args: RunArgs, config: Config, executor: DynExecutor) -> Result<()> {
    if !args.skip_bootstrap {
        bootstrap::bootstrap(&executor, &config).await?;
    }

    let repo = &config.scm.gitops_repo;
    let publisher: Arc<dyn ResourcePublisher> = Arc::new(
        GitPublisher::new(
            executor.clone(),
            checkout_dir(&config.workspace),
            repo,
            &config.workflow.pull_request.base,
        )
        .with_token(repo.provider, &config.scm.access_token),
    );
    let collaborators = Collaborators {
        scm: scm_client(&config)?,
        executor,
        publisher,
    };

    let sequencer = Sequencer::builder()
        .with_standard_stages(&config.workflow, &collaborators)
        .build()?;
    info!(
        repo = %repo,
        branch = PULL_REQUEST_HEAD,
        stages = sequencer.stage_kinds().len(),
        "starting workflow"
    );

    let run = sequencer.run(config).await;
    report::print_run(&run);

    if let WorkflowOutcome::Aborted { stage, reason } = run.outcome {
        bail!("workflow aborted at {stage}: {reason}");
    }
    Ok(())
}

/// Map a CLI wait target onto the engine's target type.
pub(crate) fn external_target(target: &WaitTarget, config: &Config) -> ExternalTarget {
    match target {
        WaitTarget::Deployment { name, namespace } => ExternalTarget::deployment(namespace, name),
        WaitTarget::Application { name, state } => ExternalTarget::application(name, state),
        WaitTarget::Pipeline {
            namespace,
            field_selector,
        } => {
            let namespace = namespace
                .clone()
                .unwrap_or_else(|| config.workflow.ci_namespace.clone());
            let selector = field_selector
                .as_ref()
                .or(config.workflow.pipeline_field_selector.as_ref());
            let base = PipelineRunSelector::new(namespace);
            ExternalTarget::pipeline_runs(match selector {
                Some(selector) => base.with_field_selector(selector),
                None => base,
            })
        }
    }
}

async fn wait(args: WaitArgs, config: &Config, executor: &DynExecutor) -> Result<()> {
    let target = external_target(&args.target, config);
    let waits = config.waits;
    let budget_for = |phase| {
        let configured = waits.for_phase(phase);
        PollBudget::new(
            args.interval.map(Duration::from_secs).unwrap_or(configured.interval),
            args.deadline.map(Duration::from_secs).unwrap_or(configured.deadline),
        )
    };

    let gate = await_target(&target, executor, budget_for).await?;
    report::print_gate(&gate);
    ensure_ready(gate)
}

fn ensure_ready(gate: GateReport) -> Result<()> {
    match gate.phases.into_iter().last() {
        Some((_, report)) => {
            report.into_result()?;
            Ok(())
        }
        None => Ok(()),
    }
}

async fn cleanup(config: &Config) -> Result<()> {
    let repo = &config.scm.gitops_repo;
    let deletion = scm_client(config)?.delete_repository(repo).await?;
    report::print_cleanup(repo, deletion);
    Ok(())
}
