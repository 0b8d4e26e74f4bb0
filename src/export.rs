//! Schedule reporting and export.
//!
//! Boundary formatting consumed by the CLI: the human-readable execution
//! plan, JSON/CSV exports, per-part split summaries, and the template-data
//! structure handed to the external rendering step that turns schedules into
//! deployment manifests.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{MachineAssignment, MachineRole, PartialSchedule, Schedule};
use crate::scheduler::SplitBalance;

/// Humanizes a machine name for job titles: hyphens become spaces and each
/// word is title-cased (`"gold-lin"` → `"Gold Lin"`).
pub fn humanize_machine_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders the human-readable execution plan.
pub fn summary_table(schedule: &Schedule) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "CRANK SCHEDULER - EXECUTION PLAN");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Total Estimated Time: {:.1} minutes",
        schedule.total_estimated_time()
    );
    let _ = writeln!(out, "Number of Stages: {}", schedule.stages.len());
    let _ = writeln!(out);

    let utilization = schedule.machine_utilization();
    if !utilization.is_empty() {
        let _ = writeln!(out, "MACHINE UTILIZATION:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        let mut names: Vec<&String> = utilization.keys().collect();
        names.sort();
        for name in names {
            let _ = writeln!(out, "{name:20} {:6.1}%", utilization[name]);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "STAGE BREAKDOWN:");
    let _ = writeln!(out, "{}", "-".repeat(50));

    for stage in &schedule.stages {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Stage {} (Duration: {:.1} min)",
            stage.id,
            stage.estimated_duration()
        );
        let _ = writeln!(out, "  Queue | Scenario                    | Runtime (min) | Machines");
        let _ = writeln!(out, "  ------|-----------------------------|---------------|---------");
        for assignment in stage.assignments() {
            let _ = writeln!(
                out,
                "  {:5} | {:27} | {:13.1} | {}",
                assignment.queue_id,
                assignment.display_name(),
                assignment.estimated_runtime,
                assignment.machine_names().join(", ")
            );
        }
    }

    out
}

/// Renders per-part totals, recurrence expressions, and balance statistics
/// for a split schedule.
pub fn split_summary(parts: &[PartialSchedule], expressions: &[String]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "SCHEDULE SPLIT SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Parts: {}", parts.len());

    for (index, part) in parts.iter().enumerate() {
        let expression = expressions.get(index).map(String::as_str).unwrap_or("-");
        let _ = writeln!(
            out,
            "{:10}  schedule: {:15}  runtime: {:7.1} min  stages: {}",
            part.name,
            expression,
            part.total_estimated_time(),
            part.stages.len()
        );
    }

    let balance = SplitBalance::calculate(parts);
    let _ = writeln!(out);
    let _ = writeln!(out, "Runtime balance:");
    let _ = writeln!(out, "  Average: {:.1} minutes", balance.average);
    let _ = writeln!(out, "  Range: {:.1} - {:.1} minutes", balance.min, balance.max);
    let _ = writeln!(
        out,
        "  Balance ratio: {:.1}% (lower is better)",
        balance.balance_ratio_pct
    );

    out
}

#[derive(Debug, Serialize)]
struct JsonAssignment<'a> {
    scenario: &'a str,
    queue_id: usize,
    machines: HashMap<&'static str, &'a str>,
    estimated_runtime: f64,
}

#[derive(Debug, Serialize)]
struct JsonStage<'a> {
    stage_id: usize,
    estimated_duration: f64,
    assignments: Vec<JsonAssignment<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonSchedule<'a> {
    total_estimated_time: f64,
    stages: Vec<JsonStage<'a>>,
}

/// Exports a schedule as pretty-printed JSON.
pub fn to_json(schedule: &Schedule) -> serde_json::Result<String> {
    let stages = schedule
        .stages
        .iter()
        .map(|stage| JsonStage {
            stage_id: stage.id,
            estimated_duration: stage.estimated_duration(),
            assignments: stage
                .assignments()
                .iter()
                .map(|a| JsonAssignment {
                    scenario: &a.scenario.name,
                    queue_id: a.queue_id,
                    machines: a
                        .scenario
                        .required_roles()
                        .iter()
                        .filter_map(|&role| a.machine_for(role).map(|m| (role.label(), m)))
                        .collect(),
                    estimated_runtime: a.estimated_runtime,
                })
                .collect(),
        })
        .collect();

    serde_json::to_string_pretty(&JsonSchedule {
        total_estimated_time: schedule.total_estimated_time(),
        stages,
    })
}

/// Exports a schedule as flat CSV rows.
pub fn to_csv(schedule: &Schedule) -> String {
    let mut out = String::from(
        "stage_id,queue_id,scenario,sut_machine,load_machine,db_machine,estimated_runtime,stage_duration\n",
    );

    for stage in &schedule.stages {
        for assignment in stage.assignments() {
            let machine = |role| assignment.machine_for(role).unwrap_or("");
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{:.1},{:.1}",
                stage.id,
                assignment.queue_id,
                assignment.scenario.name,
                machine(MachineRole::Sut),
                machine(MachineRole::Load),
                machine(MachineRole::Db),
                assignment.estimated_runtime,
                stage.estimated_duration()
            );
        }
    }

    out
}

/// One job entry handed to the external template renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateJob {
    /// Derived job name: `"<scenario name> <humanized target machine>"`.
    pub name: String,
    /// Template reference from the scenario.
    pub template: String,
    /// Selected profiles across the assignment's roles, in role order.
    pub profiles: Vec<String>,
}

/// One group of jobs that execute concurrently (one per stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateGroup {
    pub jobs: Vec<TemplateJob>,
}

/// The consumer-facing structure for one partial schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateData {
    /// Recurrence expression for this partial schedule.
    pub schedule: String,
    /// Configured queue names.
    pub queues: Vec<String>,
    /// Stage groups in stage order.
    pub groups: Vec<TemplateGroup>,
}

/// Builds template data for a partial schedule.
///
/// Assignments whose scenario has no template are skipped with a warning;
/// stages that end up with no jobs are omitted.
pub fn template_data(
    partial: &PartialSchedule,
    expression: &str,
    queues: &[String],
) -> TemplateData {
    let mut groups = Vec::new();

    for stage in &partial.stages {
        let jobs: Vec<TemplateJob> = stage
            .assignments()
            .iter()
            .filter_map(template_job)
            .collect();
        if !jobs.is_empty() {
            groups.push(TemplateGroup { jobs });
        }
    }

    TemplateData {
        schedule: expression.to_string(),
        queues: queues.to_vec(),
        groups,
    }
}

fn template_job(assignment: &MachineAssignment) -> Option<TemplateJob> {
    let Some(template) = assignment.scenario.template.clone() else {
        warn!(
            scenario = %assignment.scenario.name,
            "no template defined for scenario; job skipped"
        );
        return None;
    };

    let humanized = humanize_machine_name(&assignment.target_machine);
    let name = if humanized.is_empty() {
        assignment.scenario.name.clone()
    } else {
        format!("{} {}", assignment.scenario.name, humanized)
    };

    let profiles = assignment
        .scenario
        .required_roles()
        .iter()
        .filter_map(|&role| assignment.profile_for(role))
        .map(str::to_string)
        .collect();

    Some(TemplateJob {
        name,
        template,
        profiles,
    })
}
