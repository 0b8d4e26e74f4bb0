//! Cron hour-offset generation.
//!
//! Produces time-shifted variants of a five-field cron expression
//! (`minute hour day month weekday`) so split schedules start offset from
//! each other. Only the hour field is shifted; its syntactic shape is
//! preserved (`start/interval` keeps the interval, comma lists are re-sorted
//! after shifting).
//!
//! Malformed input is a passthrough, not an error: an expression without
//! exactly five fields, or an hour field that does not parse, is returned
//! unshifted. This can silently yield duplicate schedules for unparseable
//! hour patterns; callers wanting strict cron validity must enforce it
//! themselves.

use tracing::debug;

/// Generates `count` expressions: the base, then one per additional index
/// `i` with the hour field shifted by `i × offset_hours` (mod 24).
pub fn generate_offsets(base: &str, count: usize, offset_hours: u32) -> Vec<String> {
    (0..count)
        .map(|i| {
            if i == 0 {
                base.to_string()
            } else {
                offset_expression(base, i as u32 * offset_hours)
            }
        })
        .collect()
}

/// Shifts the hour field of a cron expression by `offset_hours` (mod 24).
pub fn offset_expression(expression: &str, offset_hours: u32) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = fields.as_slice() else {
        debug!(expression, "not a five-field cron expression; returned unshifted");
        return expression.to_string();
    };

    let shifted = shift_hour_field(hour, offset_hours);
    format!("{minute} {shifted} {day} {month} {weekday}")
}

/// Shifts one hour field, preserving its shape.
fn shift_hour_field(hour: &str, offset_hours: u32) -> String {
    // "start/interval": shift the start only.
    if let Some((start, interval)) = hour.split_once('/') {
        let Ok(start) = start.trim().parse::<u32>() else {
            return hour.to_string();
        };
        return format!("{}/{}", (start + offset_hours) % 24, interval);
    }

    // "h1,h2,...": shift every value, then re-sort ascending.
    if hour.contains(',') {
        let parsed: Result<Vec<u32>, _> =
            hour.split(',').map(|h| h.trim().parse::<u32>()).collect();
        let Ok(hours) = parsed else {
            return hour.to_string();
        };
        let mut shifted: Vec<u32> = hours.iter().map(|h| (h + offset_hours) % 24).collect();
        shifted.sort_unstable();
        return shifted
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
    }

    // Single integer hour.
    match hour.trim().parse::<u32>() {
        Ok(h) => ((h + offset_hours) % 24).to_string(),
        Err(_) => hour.to_string(),
    }
}
