//! Stage-based scenario scheduling for benchmark lab machine pools.
//!
//! Assigns test scenarios to a fixed pool of physical machines across
//! discrete execution stages, honoring per-machine role capabilities,
//! priority rankings, grouping constraints, and partner preferences, then
//! splits the resulting stage sequence into balanced partial schedules with
//! time-offset recurrence expressions.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Machine`, `Capability`, `Scenario`,
//!   `ScenarioRun`, `MachineAssignment`, `Stage`, `Schedule`, `PartialSchedule`
//! - **`scheduler`**: Machine allocation and greedy stage packing
//! - **`splitter`**: Balanced bin-packing split into partial schedules
//! - **`recurrence`**: Cron hour-offset generation for split schedules
//! - **`validation`**: Input integrity checks (duplicate names, role coverage)
//! - **`config`**: Combined JSON configuration loading
//! - **`export`**: Execution-plan reports and template-data generation
//!
//! # Pipeline
//!
//! Configuration → validation → `CrankScheduler` (drives `MachineAllocator`)
//! → `Schedule` → `ScheduleSplitter` → partial schedules, each paired with a
//! generated recurrence expression → reports / template data.

pub mod config;
pub mod export;
pub mod models;
pub mod recurrence;
pub mod scheduler;
pub mod splitter;
pub mod validation;
