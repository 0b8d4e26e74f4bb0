//! Machine allocation and greedy stage packing.
//!
//! `MachineAllocator` binds a single scenario run to concrete machines under
//! capability, priority, group, and partner constraints. `CrankScheduler`
//! drives it with a longest-processing-time greedy loop that packs runs into
//! sequential stages of concurrent assignments. `ScheduleKpi` summarizes the
//! result.
//!
//! The engine is single-threaded and deterministic: equal-priority allocator
//! candidates resolve by machine name, and equal-runtime runs keep their
//! expansion order.

mod allocator;
mod kpi;
mod stage;

pub use allocator::{MachineAllocator, RoleBinding};
pub use kpi::{ScheduleKpi, SplitBalance};
pub use stage::{CrankScheduler, ScheduleOutcome};
