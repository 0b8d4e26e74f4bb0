//! Balanced schedule splitting.
//!
//! Partitions a schedule's stages into a target number of partial schedules
//! with minimized runtime variance, using the classic greedy longest-first
//! bin-balancing heuristic: stages sorted by duration descending, each
//! assigned to the bin with the smallest running total. Not optimal, but the
//! worst bin exceeds the ideal average by at most one stage duration.
//!
//! Each partial schedule is paired (by the caller) with a recurrence
//! expression from [`crate::recurrence`] so the parts start offset in time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{PartialSchedule, Schedule};
use crate::recurrence;

/// Split settings: how many partial schedules, and the hour offset between
/// their recurrence expressions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Number of partial schedules to produce.
    pub target_count: usize,
    /// Hours between consecutive recurrence expressions.
    pub offset_hours: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target_count: 2,
            offset_hours: 6,
        }
    }
}

/// Splits a schedule into balanced partial schedules.
pub struct ScheduleSplitter {
    split: Option<SplitConfig>,
}

impl ScheduleSplitter {
    /// Creates a splitter. `None` disables splitting.
    pub fn new(split: Option<SplitConfig>) -> Self {
        Self { split }
    }

    /// Partitions the schedule's stages.
    ///
    /// Without split settings, or with a target of at most one, the whole
    /// schedule is returned as a single partial named `"full"` with stages
    /// in their original order.
    pub fn split_schedule(&self, schedule: &Schedule) -> Vec<PartialSchedule> {
        let target_count = match self.split {
            Some(SplitConfig { target_count, .. }) if target_count > 1 => target_count,
            _ => {
                return vec![PartialSchedule::from_stages("full", schedule.stages.clone())];
            }
        };

        // Largest first for better balance.
        let mut stages = schedule.stages.clone();
        stages.sort_by(|a, b| b.estimated_duration().total_cmp(&a.estimated_duration()));

        let mut bins: Vec<PartialSchedule> = (1..=target_count)
            .map(|i| PartialSchedule::new(format!("part_{i:02}")))
            .collect();
        let mut totals = vec![0.0f64; target_count];

        for stage in stages {
            // Smallest running total; ties resolve to the lowest bin index.
            let bin = totals
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            debug!(
                stage = stage.id,
                duration = stage.estimated_duration(),
                bin = %bins[bin].name,
                "assigned stage to bin"
            );
            totals[bin] += stage.estimated_duration();
            bins[bin].add_stage(stage);
        }

        bins
    }

    /// Generates one recurrence expression per partial schedule.
    ///
    /// Without split settings every expression is the base unchanged;
    /// otherwise consecutive expressions are offset by the configured hours.
    pub fn schedule_expressions(&self, base: &str, count: usize) -> Vec<String> {
        match self.split {
            None => vec![base.to_string(); count],
            Some(SplitConfig { offset_hours, .. }) => {
                recurrence::generate_offsets(base, count, offset_hours)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineAssignment, MachineRole, Scenario, ScenarioKind, Stage};
    use std::collections::HashMap;

    fn make_stage(id: usize, runtime: f64) -> Stage {
        let target = format!("m{id}");
        let scenario = Scenario::new(format!("s{id}"), ScenarioKind::Single, vec![target.clone()])
            .unwrap()
            .with_runtime(runtime);
        let mut machines = HashMap::new();
        machines.insert(MachineRole::Sut, target.clone());
        let assignment = MachineAssignment {
            scenario,
            target_machine: target,
            estimated_runtime: runtime,
            machines,
            profiles: HashMap::new(),
            queue_id: 0,
        };
        let mut stage = Stage::new(id);
        assert!(stage.try_add(assignment));
        stage
    }

    fn schedule_with(durations: &[f64]) -> Schedule {
        Schedule::from_stages(
            durations
                .iter()
                .enumerate()
                .map(|(id, &d)| make_stage(id, d))
                .collect(),
        )
    }

    #[test]
    fn test_no_config_returns_full_schedule() {
        let schedule = schedule_with(&[30.0, 20.0, 10.0]);
        let parts = ScheduleSplitter::new(None).split_schedule(&schedule);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "full");
        let ids: Vec<usize> = parts[0].stages.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!((parts[0].total_estimated_time() - schedule.total_estimated_time()).abs() < 1e-10);
    }

    #[test]
    fn test_target_one_returns_full_schedule() {
        let schedule = schedule_with(&[30.0, 20.0]);
        let splitter = ScheduleSplitter::new(Some(SplitConfig {
            target_count: 1,
            offset_hours: 6,
        }));

        let parts = splitter.split_schedule(&schedule);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "full");
    }

    #[test]
    fn test_split_balances_runtimes() {
        let schedule = schedule_with(&[30.0, 20.0, 10.0, 5.0]);
        let splitter = ScheduleSplitter::new(Some(SplitConfig {
            target_count: 2,
            offset_hours: 6,
        }));

        let parts = splitter.split_schedule(&schedule);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "part_01");
        assert_eq!(parts[1].name, "part_02");

        // 30+5 vs 20+10: greedy longest-first lands on a 35/30 split.
        assert!((parts[0].total_estimated_time() - 35.0).abs() < 1e-10);
        assert!((parts[1].total_estimated_time() - 30.0).abs() < 1e-10);

        // Every stage appears exactly once across the parts.
        let mut ids: Vec<usize> = parts
            .iter()
            .flat_map(|p| p.stages.iter().map(|s| s.id))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_split_bound_max_minus_min() {
        let schedule = schedule_with(&[45.0, 40.0, 30.0, 25.0, 20.0, 10.0, 5.0]);
        let splitter = ScheduleSplitter::new(Some(SplitConfig {
            target_count: 3,
            offset_hours: 4,
        }));

        let parts = splitter.split_schedule(&schedule);
        let runtimes: Vec<f64> = parts.iter().map(PartialSchedule::total_estimated_time).collect();
        let max = runtimes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = runtimes.iter().copied().fold(f64::INFINITY, f64::min);

        // Greedy bound: the spread never exceeds the largest stage duration.
        assert!(max - min <= 45.0 + 1e-10);
    }

    #[test]
    fn test_more_bins_than_stages_leaves_empty_parts() {
        let schedule = schedule_with(&[30.0]);
        let splitter = ScheduleSplitter::new(Some(SplitConfig {
            target_count: 3,
            offset_hours: 6,
        }));

        let parts = splitter.split_schedule(&schedule);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].stages.len(), 1);
        assert!(parts[1].stages.is_empty());
        assert!(parts[2].stages.is_empty());
    }

    #[test]
    fn test_expressions_without_config_repeat_base() {
        let splitter = ScheduleSplitter::new(None);
        let exprs = splitter.schedule_expressions("0 9 * * *", 3);
        assert_eq!(exprs, vec!["0 9 * * *"; 3]);
    }

    #[test]
    fn test_expressions_with_offsets() {
        let splitter = ScheduleSplitter::new(Some(SplitConfig {
            target_count: 2,
            offset_hours: 6,
        }));
        let exprs = splitter.schedule_expressions("0 9 * * *", 2);
        assert_eq!(exprs, vec!["0 9 * * *".to_string(), "0 15 * * *".to_string()]);
    }
}
