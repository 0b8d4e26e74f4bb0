//! Schedule quality metrics.
//!
//! Computes summary indicators from a packed schedule (totals, stage shape,
//! machine utilization, per-kind run counts) and balance statistics across
//! split partial schedules.

use std::collections::HashMap;

use crate::models::{PartialSchedule, Schedule, ScenarioKind, Stage};

/// Summary indicators for a packed schedule.
///
/// All time values are in minutes.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Sum of stage durations.
    pub total_estimated_time: f64,
    /// Number of stages.
    pub stage_count: usize,
    /// Number of assignments across all stages.
    pub assignment_count: usize,
    /// Mean stage duration (0 for an empty schedule).
    pub avg_stage_duration: f64,
    /// Assignments per scenario kind.
    pub runs_by_kind: HashMap<ScenarioKind, usize>,
    /// Utilization percentage per machine.
    pub utilization_by_machine: HashMap<String, f64>,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule.
    pub fn calculate(schedule: &Schedule) -> Self {
        let total_estimated_time = schedule.total_estimated_time();
        let stage_count = schedule.stages.len();
        let assignment_count = schedule.assignment_count();

        let avg_stage_duration = if stage_count == 0 {
            0.0
        } else {
            total_estimated_time / stage_count as f64
        };

        let mut runs_by_kind: HashMap<ScenarioKind, usize> = HashMap::new();
        for stage in &schedule.stages {
            for assignment in stage.assignments() {
                *runs_by_kind.entry(assignment.scenario.kind).or_insert(0) += 1;
            }
        }

        Self {
            total_estimated_time,
            stage_count,
            assignment_count,
            avg_stage_duration,
            runs_by_kind,
            utilization_by_machine: schedule.machine_utilization(),
        }
    }
}

/// Runtime balance statistics across partial schedules.
#[derive(Debug, Clone)]
pub struct SplitBalance {
    /// Mean partial runtime (minutes).
    pub average: f64,
    /// Shortest partial runtime.
    pub min: f64,
    /// Longest partial runtime.
    pub max: f64,
    /// (max - min) / average × 100; 0 when the average is 0. Lower is better.
    pub balance_ratio_pct: f64,
}

impl SplitBalance {
    /// Computes balance statistics. Returns all zeros for an empty slice.
    pub fn calculate(parts: &[PartialSchedule]) -> Self {
        if parts.is_empty() {
            return Self {
                average: 0.0,
                min: 0.0,
                max: 0.0,
                balance_ratio_pct: 0.0,
            };
        }

        let runtimes: Vec<f64> = parts.iter().map(PartialSchedule::total_estimated_time).collect();
        let sum: f64 = runtimes.iter().sum();
        let average = sum / runtimes.len() as f64;
        let min = runtimes.iter().copied().fold(f64::INFINITY, f64::min);
        let max = runtimes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let balance_ratio_pct = if average > 0.0 {
            (max - min) / average * 100.0
        } else {
            0.0
        };

        Self {
            average,
            min,
            max,
            balance_ratio_pct,
        }
    }

    /// Largest stage duration across the given parts.
    pub fn largest_stage(parts: &[PartialSchedule]) -> f64 {
        parts
            .iter()
            .flat_map(|p| p.stages.iter())
            .map(Stage::estimated_duration)
            .fold(0.0, f64::max)
    }
}
