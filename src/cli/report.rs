use std::path::Path;

use colored::*;

use crate::poll::{Convergence, ConvergenceReport};
use crate::predicates::GateReport;
use crate::scm::{Deletion, RepoRef};
use crate::workflow::{StageStatus, WorkflowOutcome, WorkflowRun};

pub(crate) fn print_run(run: &WorkflowRun) {
    println!();
    println!("{}", "Workflow summary".bold());
    for result in &run.results {
        let status = match &result.status {
            StageStatus::Success => "ok".green(),
            StageStatus::TimedOut => "timed out".yellow(),
            StageStatus::Failed(_) => "failed".red(),
        };
        println!(
            "  {:<16} {:<10} {}",
            result.stage.to_string(),
            status,
            format!("{:.1}s", result.elapsed.as_secs_f64()).dimmed()
        );
    }

    match &run.outcome {
        WorkflowOutcome::Succeeded => println!("{}", "✅ Workflow succeeded".bold().green()),
        WorkflowOutcome::Aborted { stage, reason } => {
            eprintln!("{}", format!("❌ Workflow aborted at {stage}").bold().red());
            eprintln!("   {reason}");
        }
    }
}

pub(crate) fn print_gate(gate: &GateReport) {
    println!("{}", gate.target.bold());
    for (phase, report) in &gate.phases {
        println!("  {:<18} {}", phase.to_string(), describe(report));
    }
}

fn describe(report: &ConvergenceReport) -> String {
    let detail = format!(
        "after {} evaluation(s) in {:.1}s",
        report.evaluations,
        report.elapsed.as_secs_f64()
    );
    match &report.outcome {
        Convergence::Ready => format!("{} {}", "ready".green(), detail.dimmed()),
        Convergence::TimedOut => format!(
            "{} {}",
            format!("timed out after {}s", report.deadline.as_secs()).yellow(),
            detail.dimmed()
        ),
        Convergence::Failed(reason) => format!("{} {}", "failed".red(), reason),
    }
}

pub(crate) fn print_bootstrap(host: &str) {
    println!("{} {}", "✅ Argo CD ready at".green(), host.bold());
}

pub(crate) fn print_generated(output: &Path) {
    println!("{} {}", "📦 Resources generated in".green(), output.display().to_string().bold());
}

pub(crate) fn print_cleanup(repo: &RepoRef, deletion: Deletion) {
    match deletion {
        Deletion::Deleted => println!("{} {}", "🧹 Deleted".green(), repo.to_string().bold()),
        Deletion::AlreadyAbsent => {
            println!("{} {}", "Nothing to delete:".yellow(), repo.to_string().bold())
        }
    }
}
