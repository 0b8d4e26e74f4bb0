//! Scheduling domain models.
//!
//! Core data types for lab scheduling: machines with per-role capabilities,
//! scenarios expanding into per-target runs, and the assignment/stage/schedule
//! hierarchy the scheduler produces. All types are immutable after
//! construction; structural invariants (non-empty profile lists, non-empty
//! target lists, machine uniqueness within a stage) are enforced when values
//! are built, not re-checked downstream.

mod machine;
mod scenario;
mod schedule;

use thiserror::Error;

pub use machine::{Capability, Machine, MachineRole};
pub use scenario::{Scenario, ScenarioKind, ScenarioRun};
pub use schedule::{MachineAssignment, PartialSchedule, Schedule, Stage};

/// Structural errors raised while constructing domain values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A capability was declared with no profiles.
    #[error("capability for role '{role}' has no profiles")]
    EmptyProfiles { role: MachineRole },

    /// A capability's default profile is not in its profile list.
    #[error("default profile '{profile}' not among available profiles for role '{role}'")]
    UnknownDefaultProfile { role: MachineRole, profile: String },

    /// A scenario was declared with no target machines.
    #[error("scenario '{0}' must have at least one target machine")]
    NoTargetMachines(String),
}
