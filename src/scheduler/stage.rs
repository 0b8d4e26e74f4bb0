//! Greedy stage-packing scheduler.
//!
//! # Algorithm
//!
//! 1. Expand every scenario into one run per target machine and resolve
//!    runtime estimates.
//! 2. Sort runs by runtime descending (longest-processing-time heuristic:
//!    long jobs placed first keep stragglers from driving the stage count).
//! 3. Repeatedly pack one stage: scan the remaining runs in order, allocate
//!    machines against the machines already committed in this stage, and
//!    stop the stage once every queue slot holds an assignment.
//! 4. Terminate when no runs remain, or a full pass places nothing (a
//!    combinatorial deadlock — completed stages are still returned).
//!
//! There is no backtracking: a finalized stage is never rebalanced against
//! later stages.
//!
//! # Complexity
//! O(runs × machines) per stage; terminates by monotonic removal of runs.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::MachineAllocator;
use crate::models::{Machine, MachineAssignment, Scenario, ScenarioRun, Schedule, Stage};

/// Result of a scheduling pass.
///
/// The schedule holds every stage that was packed. `unscheduled` is
/// non-empty when the scheduler deadlocked: those runs could not be placed
/// in any stage and callers must decide what to do with them.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// The packed schedule.
    pub schedule: Schedule,
    /// Runs left over after a deadlocked pass.
    pub unscheduled: Vec<ScenarioRun>,
}

impl ScheduleOutcome {
    /// Whether every run was placed.
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }
}

/// Packs scenario runs into sequential stages of concurrent assignments.
pub struct CrankScheduler {
    scenarios: Vec<Scenario>,
    allocator: MachineAllocator,
    max_queues: usize,
}

impl CrankScheduler {
    /// Creates a scheduler.
    ///
    /// `max_queues` bounds the number of assignments per stage (one queue
    /// holds at most one concurrent assignment).
    pub fn new(
        machines: &[Machine],
        scenarios: &[Scenario],
        max_queues: usize,
        enforce_machine_groups: bool,
    ) -> Self {
        Self {
            scenarios: scenarios.to_vec(),
            allocator: MachineAllocator::new(machines, enforce_machine_groups),
            max_queues,
        }
    }

    /// Builds the schedule.
    pub fn create_schedule(&self) -> ScheduleOutcome {
        let mut remaining = ScenarioRun::expand(&self.scenarios);
        // Longest-first; stable, so equal runtimes keep expansion order.
        remaining.sort_by(|a, b| b.estimated_runtime.total_cmp(&a.estimated_runtime));
        info!(runs = remaining.len(), "expanded scenario runs");

        let mut stages: Vec<Stage> = Vec::new();
        while !remaining.is_empty() {
            let (stage, placed) = self.pack_stage(stages.len(), &remaining);
            if placed.is_empty() {
                warn!(
                    unscheduled = remaining.len(),
                    "scheduling deadlock: a full pass placed no assignments"
                );
                break;
            }

            debug!(
                stage = stage.id,
                assignments = stage.len(),
                duration = stage.estimated_duration(),
                "packed stage"
            );
            for &index in placed.iter().rev() {
                remaining.remove(index);
            }
            stages.push(stage);
        }

        let schedule = Schedule::from_stages(stages);
        info!(
            stages = schedule.stages.len(),
            total_minutes = schedule.total_estimated_time(),
            "schedule complete"
        );
        ScheduleOutcome {
            schedule,
            unscheduled: remaining,
        }
    }

    /// Packs a single stage from the remaining runs.
    ///
    /// Returns the stage and the indices (into `runs`, ascending) of the
    /// runs that were placed.
    fn pack_stage(&self, id: usize, runs: &[ScenarioRun]) -> (Stage, Vec<usize>) {
        let mut stage = Stage::new(id);
        let mut committed: HashSet<String> = HashSet::new();
        let mut queue_loads = vec![0usize; self.max_queues];
        let mut placed = Vec::new();

        for (index, run) in runs.iter().enumerate() {
            // One assignment per queue at most.
            if stage.len() >= self.max_queues {
                break;
            }

            let Some(binding) = self.allocator.allocate(run, &committed) else {
                continue;
            };

            // Least-loaded queue; ties resolve to the lowest index.
            let queue_id = (0..self.max_queues)
                .min_by_key(|&q| queue_loads[q])
                .unwrap_or(0);
            let machine_names: Vec<String> = binding.machines.values().cloned().collect();

            let assignment = MachineAssignment {
                scenario: run.scenario.clone(),
                target_machine: run.target_machine.clone(),
                estimated_runtime: run.estimated_runtime,
                machines: binding.machines,
                profiles: binding.profiles,
                queue_id,
            };

            if stage.try_add(assignment) {
                committed.extend(machine_names);
                queue_loads[queue_id] += 1;
                placed.push(index);
            }
        }

        (stage, placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capability, MachineRole, ScenarioKind};

    fn sut_machine(name: &str) -> Machine {
        let capability =
            Capability::new(MachineRole::Sut, 1, vec![format!("{name}-sut")], None).unwrap();
        Machine::new(name).with_capability(MachineRole::Sut, capability)
    }

    fn load_machine(name: &str) -> Machine {
        let capability =
            Capability::new(MachineRole::Load, 1, vec![format!("{name}-load")], None).unwrap();
        Machine::new(name).with_capability(MachineRole::Load, capability)
    }

    fn single(name: &str, target: &str, runtime: f64) -> Scenario {
        Scenario::new(name, ScenarioKind::Single, vec![target.to_string()])
            .unwrap()
            .with_runtime(runtime)
    }

    fn dual(name: &str, target: &str) -> Scenario {
        Scenario::new(name, ScenarioKind::Dual, vec![target.to_string()]).unwrap()
    }

    fn three_singles() -> (Vec<Machine>, Vec<Scenario>) {
        let machines = vec![sut_machine("m1"), sut_machine("m2"), sut_machine("m3")];
        let scenarios = vec![
            single("a", "m1", 10.0),
            single("b", "m2", 20.0),
            single("c", "m3", 30.0),
        ];
        (machines, scenarios)
    }

    #[test]
    fn test_three_singles_fit_one_stage_with_three_queues() {
        let (machines, scenarios) = three_singles();
        let outcome = CrankScheduler::new(&machines, &scenarios, 3, true).create_schedule();

        assert!(outcome.is_complete());
        let schedule = &outcome.schedule;
        assert_eq!(schedule.stages.len(), 1);
        assert!((schedule.stages[0].estimated_duration() - 30.0).abs() < 1e-10);
        assert!((schedule.total_estimated_time() - 30.0).abs() < 1e-10);

        // One assignment per queue, least-loaded order: 0, 1, 2.
        let queues: Vec<usize> = schedule.stages[0]
            .assignments()
            .iter()
            .map(|a| a.queue_id)
            .collect();
        assert_eq!(queues, vec![0, 1, 2]);
    }

    #[test]
    fn test_three_singles_serialize_with_one_queue() {
        let (machines, scenarios) = three_singles();
        let outcome = CrankScheduler::new(&machines, &scenarios, 1, true).create_schedule();

        assert!(outcome.is_complete());
        let durations: Vec<f64> = outcome
            .schedule
            .stages
            .iter()
            .map(Stage::estimated_duration)
            .collect();
        // Longest-first: 30, 20, 10.
        assert_eq!(durations.len(), 3);
        assert!((durations[0] - 30.0).abs() < 1e-10);
        assert!((durations[1] - 20.0).abs() < 1e-10);
        assert!((durations[2] - 10.0).abs() < 1e-10);
        assert!((outcome.schedule.total_estimated_time() - 60.0).abs() < 1e-10);
    }

    #[test]
    fn test_lpt_places_longest_run_first() {
        let (machines, scenarios) = three_singles();
        let outcome = CrankScheduler::new(&machines, &scenarios, 1, true).create_schedule();

        let first = &outcome.schedule.stages[0].assignments()[0];
        assert_eq!(first.scenario.name, "c");
    }

    #[test]
    fn test_same_target_machine_forces_sequential_stages() {
        let machines = vec![sut_machine("m1")];
        let scenarios = vec![single("a", "m1", 10.0), single("b", "m1", 20.0)];
        let outcome = CrankScheduler::new(&machines, &scenarios, 4, true).create_schedule();

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.stages.len(), 2);
        // Every stage holds exactly one run on m1.
        for stage in &outcome.schedule.stages {
            assert_eq!(stage.len(), 1);
            assert_eq!(stage.assignments()[0].machine_for(MachineRole::Sut), Some("m1"));
        }
    }

    #[test]
    fn test_contended_load_machine_spills_to_next_stage() {
        let machines = vec![sut_machine("s1"), sut_machine("s2"), load_machine("l1")];
        let scenarios = vec![dual("a", "s1"), dual("b", "s2")];
        let outcome = CrankScheduler::new(&machines, &scenarios, 4, true).create_schedule();

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.stages.len(), 2);
        assert_eq!(outcome.schedule.stages[0].len(), 1);
        assert_eq!(outcome.schedule.stages[1].len(), 1);
    }

    #[test]
    fn test_multi_target_scenario_expands_per_target() {
        let machines = vec![sut_machine("m1"), sut_machine("m2")];
        let scenario =
            Scenario::new("multi", ScenarioKind::Single, vec!["m1".into(), "m2".into()])
                .unwrap()
                .with_runtime(15.0);
        let outcome = CrankScheduler::new(&machines, &[scenario], 2, true).create_schedule();

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.assignment_count(), 2);
        assert_eq!(outcome.schedule.stages.len(), 1);
    }

    #[test]
    fn test_deadlock_reports_unscheduled_runs() {
        // DUAL needs a LOAD machine, none exists: zero progress on the
        // first pass for that run.
        let machines = vec![sut_machine("m1"), sut_machine("m2")];
        let scenarios = vec![single("ok", "m1", 10.0), dual("stuck", "m2")];
        let outcome = CrankScheduler::new(&machines, &scenarios, 4, true).create_schedule();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.unscheduled.len(), 1);
        assert_eq!(outcome.unscheduled[0].scenario.name, "stuck");
        // The feasible run was still scheduled.
        assert_eq!(outcome.schedule.assignment_count(), 1);
    }

    #[test]
    fn test_sut_target_without_capability_never_schedules() {
        // Target exists but has LOAD capability only. The SUT role is
        // never substituted, so the run deadlocks immediately.
        let machines = vec![load_machine("l1")];
        let scenarios = vec![dual("s", "l1")];
        let outcome = CrankScheduler::new(&machines, &scenarios, 2, true).create_schedule();

        assert!(!outcome.is_complete());
        assert!(outcome.schedule.stages.is_empty());
        assert_eq!(outcome.unscheduled.len(), 1);
    }

    #[test]
    fn test_queue_capacity_bounds_stage_size() {
        let machines = vec![
            sut_machine("m1"),
            sut_machine("m2"),
            sut_machine("m3"),
            sut_machine("m4"),
        ];
        let scenarios = vec![
            single("a", "m1", 10.0),
            single("b", "m2", 10.0),
            single("c", "m3", 10.0),
            single("d", "m4", 10.0),
        ];
        let outcome = CrankScheduler::new(&machines, &scenarios, 2, true).create_schedule();

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.stages.len(), 2);
        assert_eq!(outcome.schedule.stages[0].len(), 2);
        assert_eq!(outcome.schedule.stages[1].len(), 2);
    }

    #[test]
    fn test_empty_scenarios_yield_empty_schedule() {
        let machines = vec![sut_machine("m1")];
        let outcome = CrankScheduler::new(&machines, &[], 2, true).create_schedule();
        assert!(outcome.is_complete());
        assert!(outcome.schedule.stages.is_empty());
    }

    #[test]
    fn test_no_machine_repeats_within_a_stage() {
        let machines = vec![
            sut_machine("s1"),
            sut_machine("s2"),
            load_machine("l1"),
            load_machine("l2"),
        ];
        let scenarios = vec![dual("a", "s1"), dual("b", "s2")];
        let outcome = CrankScheduler::new(&machines, &scenarios, 4, true).create_schedule();

        assert!(outcome.is_complete());
        for stage in &outcome.schedule.stages {
            let mut seen = HashSet::new();
            for assignment in stage.assignments() {
                for name in assignment.machine_names() {
                    assert!(seen.insert(name.to_string()), "machine {name} repeated");
                }
            }
        }
    }
}
