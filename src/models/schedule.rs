//! Assignment, stage, and schedule models.
//!
//! A `MachineAssignment` binds one scenario run to concrete machines and
//! profiles. A `Stage` is a set of assignments that execute concurrently; a
//! `Schedule` is the ordered stage sequence. `PartialSchedule` is a named
//! repartitioning of a schedule's stages produced by the splitter.
//!
//! # Invariants
//!
//! A machine name appears in at most one assignment within a stage. This is
//! enforced at construction: [`Stage::try_add`] refuses an assignment that
//! reuses a committed machine.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{MachineRole, Scenario};

/// The result of allocating machines to one scenario run.
///
/// Created by the stage scheduler via the allocator; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineAssignment {
    /// The scenario this assignment executes.
    pub scenario: Scenario,
    /// The specific target machine the run was expanded for.
    pub target_machine: String,
    /// Resolved runtime estimate in minutes.
    pub estimated_runtime: f64,
    /// Machine name serving each required role.
    pub machines: HashMap<MachineRole, String>,
    /// Selected profile for each required role.
    pub profiles: HashMap<MachineRole, String>,
    /// Load-balancing queue slot within the stage (0-based).
    pub queue_id: usize,
}

impl MachineAssignment {
    /// Names of all machines bound to this assignment, in role order.
    pub fn machine_names(&self) -> Vec<&str> {
        self.scenario
            .required_roles()
            .iter()
            .filter_map(|role| self.machines.get(role))
            .map(String::as_str)
            .collect()
    }

    /// The machine bound to a role, if any.
    pub fn machine_for(&self, role: MachineRole) -> Option<&str> {
        self.machines.get(&role).map(String::as_str)
    }

    /// The profile selected for a role, if any.
    pub fn profile_for(&self, role: MachineRole) -> Option<&str> {
        self.profiles.get(&role).map(String::as_str)
    }

    /// Display name, e.g. `"plaintext-gold-lin"`.
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.scenario.name, self.target_machine)
    }
}

/// A set of assignments that execute concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stage position in the schedule (0-based).
    pub id: usize,
    assignments: Vec<MachineAssignment>,
    estimated_duration: f64,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            assignments: Vec::new(),
            estimated_duration: 0.0,
        }
    }

    /// Adds an assignment unless one of its machines is already committed.
    ///
    /// Returns `false` (and leaves the stage unchanged) on a machine
    /// conflict. On success the stage duration is extended to cover the
    /// assignment's runtime.
    pub fn try_add(&mut self, assignment: MachineAssignment) -> bool {
        let used = self.used_machines();
        if assignment.machine_names().iter().any(|m| used.contains(*m)) {
            return false;
        }
        self.estimated_duration = self.estimated_duration.max(assignment.estimated_runtime);
        self.assignments.push(assignment);
        true
    }

    /// The assignments in this stage, in insertion order.
    pub fn assignments(&self) -> &[MachineAssignment] {
        &self.assignments
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the stage has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Stage duration: the longest assignment runtime (0 when empty).
    pub fn estimated_duration(&self) -> f64 {
        self.estimated_duration
    }

    /// All machine names committed in this stage.
    pub fn used_machines(&self) -> HashSet<&str> {
        self.assignments
            .iter()
            .flat_map(|a| a.machine_names())
            .collect()
    }
}

/// A complete schedule: stages run sequentially, assignments within a stage
/// run concurrently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Ordered stages.
    pub stages: Vec<Stage>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schedule from stages.
    pub fn from_stages(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Total estimated time: the sum of stage durations (minutes).
    pub fn total_estimated_time(&self) -> f64 {
        self.stages.iter().map(Stage::estimated_duration).sum()
    }

    /// Total number of assignments across all stages.
    pub fn assignment_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    /// Utilization percentage per machine.
    ///
    /// A machine's utilization is the summed duration of the stages it
    /// appears in, divided by the schedule's total time. Empty when the
    /// total time is zero.
    pub fn machine_utilization(&self) -> HashMap<String, f64> {
        let total = self.total_estimated_time();
        if total == 0.0 {
            return HashMap::new();
        }

        let mut usage: HashMap<String, f64> = HashMap::new();
        for stage in &self.stages {
            let duration = stage.estimated_duration();
            for name in stage.used_machines() {
                *usage.entry(name.to_string()).or_insert(0.0) += duration;
            }
        }

        usage
            .into_iter()
            .map(|(name, busy)| (name, busy / total * 100.0))
            .collect()
    }
}

/// A named subset of a schedule's stages with its own derived runtime.
///
/// Produced only by the splitter. Stage identity is preserved via `Stage::id`;
/// stage order within a partial schedule is not significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialSchedule {
    /// Partial schedule name (`"full"` or `"part_NN"`).
    pub name: String,
    /// Stages assigned to this partial schedule.
    pub stages: Vec<Stage>,
}

impl PartialSchedule {
    /// Creates an empty partial schedule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Creates a partial schedule wrapping the given stages.
    pub fn from_stages(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Appends a stage.
    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Total runtime: the sum of stage durations, independent of order.
    pub fn total_estimated_time(&self) -> f64 {
        self.stages.iter().map(Stage::estimated_duration).sum()
    }
}
