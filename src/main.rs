//! crank-scheduler CLI.
//!
//! Loads a combined lab configuration, validates it, packs the schedule,
//! splits it into balanced parts, and renders reports or template data for
//! the external manifest-rendering step.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crank_scheduler::config::LabConfig;
use crank_scheduler::export;
use crank_scheduler::models::{MachineRole, Schedule, ScenarioRun};
use crank_scheduler::scheduler::CrankScheduler;
use crank_scheduler::splitter::{ScheduleSplitter, SplitConfig};
use crank_scheduler::validation;

#[derive(Debug, Parser)]
#[command(
    name = "crank-scheduler",
    version,
    about = "Schedule benchmark scenarios across a lab machine pool"
)]
struct Cli {
    /// Path to the combined configuration file (machines + scenarios + metadata).
    #[arg(short, long)]
    config: PathBuf,

    /// List all scenario runs and feasibility analysis without scheduling.
    #[arg(long)]
    list_jobs: bool,

    /// List scenario runs grouped by target machine without scheduling.
    #[arg(long)]
    list_jobs_by_machine: bool,

    /// Override the number of partial schedules to produce.
    #[arg(long)]
    target_parts: Option<usize>,

    /// Override the hour offset between partial schedule recurrences.
    #[arg(long)]
    offset_hours: Option<u32>,

    /// Write per-part template data JSON files into this directory.
    #[arg(long)]
    data_output: Option<PathBuf>,

    /// Write the execution plan to this file instead of stdout.
    #[arg(long)]
    summary_output: Option<PathBuf>,

    /// Emit the schedule as JSON instead of the table report.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = LabConfig::from_path(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    if cli.target_parts.is_some() || cli.offset_hours.is_some() {
        let mut split = config.metadata.split.unwrap_or_default();
        if let Some(target_count) = cli.target_parts {
            split.target_count = target_count;
        }
        if let Some(offset_hours) = cli.offset_hours {
            split.offset_hours = offset_hours;
        }
        config.metadata.split = Some(split);
    }

    if let Err(errors) = validation::validate_input(
        &config.machines,
        &config.scenarios,
        &config.metadata.queues,
    ) {
        for error in &errors {
            eprintln!("  {} {}", "-".red(), error.message);
        }
        bail!("configuration failed validation with {} error(s)", errors.len());
    }

    if cli.list_jobs {
        print!("{}", list_jobs(&config));
        return Ok(());
    }
    if cli.list_jobs_by_machine {
        print!("{}", list_jobs_by_machine(&config));
        return Ok(());
    }

    info(&format!(
        "creating schedule for {} scenarios on {} machines",
        config.scenarios.len(),
        config.machines.len()
    ));

    let scheduler = CrankScheduler::new(
        &config.machines,
        &config.scenarios,
        config.max_queues(),
        config.metadata.enforce_machine_groups,
    );
    let outcome = scheduler.create_schedule();

    if !outcome.is_complete() {
        let names: Vec<String> = outcome
            .unscheduled
            .iter()
            .map(ScenarioRun::display_name)
            .collect();
        eprintln!(
            "{} could not schedule {} run(s): {}",
            "Warning:".yellow().bold(),
            names.len(),
            names.join(", ")
        );
    }

    if cli.json {
        println!("{}", export::to_json(&outcome.schedule)?);
        return Ok(());
    }

    let splitter = ScheduleSplitter::new(config.metadata.split);
    let parts = splitter.split_schedule(&outcome.schedule);
    let expressions = splitter.schedule_expressions(&config.metadata.schedule, parts.len());
    info(&format!("schedule split into {} part(s)", parts.len()));

    let mut report = export::summary_table(&outcome.schedule);
    if parts.len() > 1 {
        report.push('\n');
        report.push_str(&export::split_summary(&parts, &expressions));
        for (part, expression) in parts.iter().zip(&expressions) {
            report.push_str(&format!(
                "\n{}\nEXECUTION PLAN FOR {} (schedule: {})\n{}\n",
                "=".repeat(80),
                part.name.to_uppercase(),
                expression,
                "=".repeat(80),
            ));
            report.push_str(&export::summary_table(&Schedule::from_stages(
                part.stages.clone(),
            )));
        }
    }

    match &cli.summary_output {
        Some(path) => {
            fs::write(path, &report)
                .with_context(|| format!("writing summary to {}", path.display()))?;
            success(&format!("execution plan written to {}", path.display()));
        }
        None => print!("{report}"),
    }

    if let Some(directory) = &cli.data_output {
        fs::create_dir_all(directory)
            .with_context(|| format!("creating output directory {}", directory.display()))?;
        for (part, expression) in parts.iter().zip(&expressions) {
            let data = export::template_data(part, expression, &config.metadata.queues);
            let path = directory.join(format!("{}_data.json", part.name));
            fs::write(&path, serde_json::to_string_pretty(&data)?)
                .with_context(|| format!("writing template data to {}", path.display()))?;
            success(&format!("template data written to {}", path.display()));
        }
    }

    Ok(())
}

fn info(message: &str) {
    println!("{} {message}", "Info:".blue().bold());
}

fn success(message: &str) {
    println!("{} {message}", "Success:".green().bold());
}

/// Expanded run listing with feasibility analysis, without scheduling.
fn list_jobs(config: &LabConfig) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let runs = ScenarioRun::expand(&config.scenarios);

    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "SCHEDULED JOBS LIST");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Total scenarios: {}", config.scenarios.len());
    let _ = writeln!(out, "Total jobs: {}", runs.len());
    let _ = writeln!(out, "Available machines: {}", config.machines.len());
    let _ = writeln!(out);

    for scenario in &config.scenarios {
        let roles: Vec<&str> = scenario.required_roles().iter().map(|r| r.label()).collect();
        let _ = writeln!(out, "Scenario: {}", scenario.name);
        let _ = writeln!(out, "  Jobs: {}", scenario.target_machines.len());
        let _ = writeln!(out, "  Target machines: {}", scenario.target_machines.join(", "));
        let _ = writeln!(out, "  Machine roles needed: {}", roles.join(", "));
        for target in &scenario.target_machines {
            let run = ScenarioRun::new(scenario, target);
            let _ = writeln!(
                out,
                "    -> {} ({:.1} min)",
                run.display_name(),
                run.estimated_runtime
            );
        }
        let _ = writeln!(out);
    }

    // Pool coverage and concurrency limits.
    let count_role = |role| {
        config
            .machines
            .iter()
            .filter(|m| m.can_serve(role))
            .count()
    };
    let sut = count_role(MachineRole::Sut);
    let load = count_role(MachineRole::Load);
    let db = count_role(MachineRole::Db);

    let demanded = |role: MachineRole| {
        config
            .scenarios
            .iter()
            .filter(|s| s.required_roles().contains(&role))
            .flat_map(|s| s.target_machines.iter())
            .count()
    };
    let dual_jobs = demanded(MachineRole::Load);
    let triple_jobs = demanded(MachineRole::Db);

    let _ = writeln!(out, "{}", "=".repeat(40));
    let _ = writeln!(out, "JOB REQUIREMENTS ANALYSIS");
    let _ = writeln!(out, "{}", "=".repeat(40));
    let _ = writeln!(out, "SUT machines: {sut}, LOAD machines: {load}, DB machines: {db}");
    let _ = writeln!(out, "Maximum concurrent dual-machine jobs: {}", sut.min(load));
    let _ = writeln!(
        out,
        "Maximum concurrent triple-machine jobs: {}",
        sut.min(load).min(db)
    );
    if dual_jobs > 0 && load == 0 {
        let _ = writeln!(out, "WARNING: jobs require load machines, but none are available");
    }
    if triple_jobs > 0 && db == 0 {
        let _ = writeln!(out, "WARNING: jobs require database machines, but none are available");
    }

    out
}

/// Run listing grouped by target machine, without scheduling.
fn list_jobs_by_machine(config: &LabConfig) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "JOBS BY MACHINE");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let mut runs_by_machine: BTreeMap<&str, Vec<ScenarioRun>> = BTreeMap::new();
    for scenario in &config.scenarios {
        for target in &scenario.target_machines {
            runs_by_machine
                .entry(target.as_str())
                .or_default()
                .push(ScenarioRun::new(scenario, target));
        }
    }

    let sut_machines: Vec<_> = config
        .machines
        .iter()
        .filter(|m| m.can_serve(MachineRole::Sut))
        .collect();
    let total_jobs: usize = runs_by_machine.values().map(Vec::len).sum();

    let _ = writeln!(out, "Total machines: {}", config.machines.len());
    let _ = writeln!(out, "SUT machines: {}", sut_machines.len());
    let _ = writeln!(out, "Total jobs: {total_jobs}");
    let _ = writeln!(out);

    for machine in sut_machines {
        let mut runs = runs_by_machine.remove(machine.name.as_str()).unwrap_or_default();
        runs.sort_by(|a, b| a.scenario.name.cmp(&b.scenario.name));
        let total_runtime: f64 = runs.iter().map(|r| r.estimated_runtime).sum();

        let _ = writeln!(out, "Machine: {}", machine.name);
        let _ = writeln!(out, "  Jobs: {}", runs.len());
        let _ = writeln!(out, "  Total runtime: {total_runtime:.1} minutes");
        if !machine.preferred_partners.is_empty() {
            let _ = writeln!(
                out,
                "  Preferred partners: {}",
                machine.preferred_partners.join(", ")
            );
        }
        if runs.is_empty() {
            let _ = writeln!(out, "  -> No jobs assigned");
        }
        for run in &runs {
            let _ = writeln!(
                out,
                "    -> {} ({:.1} min)",
                run.display_name(),
                run.estimated_runtime
            );
        }
        let _ = writeln!(out);
    }

    out
}
