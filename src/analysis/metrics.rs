use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::backend::types::{AuditEvent, Defect, DefectStatus};

/// Percentage of defects that were reopened at any point, either per
/// their audit trail or per their current status.
pub fn calculate_reopen_rate(defects: &[Defect], events: &[AuditEvent]) -> f64 {
    if defects.is_empty() {
        return 0.0;
    }

    let known_ids: HashSet<&str> = defects.iter().map(|d| d.id.as_str()).collect();

    let reopened_by_history = events
        .iter()
        .filter(|e| e.new_status() == Some(DefectStatus::Reopened))
        .map(|e| e.defect_id.as_str());

    let reopened_now = defects
        .iter()
        .filter(|d| d.status == DefectStatus::Reopened)
        .map(|d| d.id.as_str());

    let reopened: HashSet<&str> = reopened_by_history
        .chain(reopened_now)
        .filter(|id| known_ids.contains(id))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let rate = (reopened.len() as f64 / defects.len() as f64) * 100.0;
    rate
}

/// Mean hours from creation to resolution over defects with a positive
/// elapsed time.
pub fn calculate_mean_time_to_fix(defects: &[Defect], events: &[AuditEvent]) -> f64 {
    let resolutions = first_resolution_events(events);

    let fix_hours: Vec<f64> = defects
        .iter()
        .filter_map(|defect| {
            let resolved_at = resolutions
                .get(defect.id.as_str())
                .copied()
                .or_else(|| fallback_resolution(defect))?;

            let elapsed = resolved_at.signed_duration_since(defect.created_at);
            #[allow(clippy::cast_precision_loss)]
            let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
            (hours > 0.0).then_some(hours)
        })
        .collect();

    compute_mean(&fix_hours)
}

/// First event per defect, in returned order, that moves it to RESOLVED
/// or CLOSED and carries a usable timestamp.
fn first_resolution_events(events: &[AuditEvent]) -> HashMap<&str, DateTime<Utc>> {
    events.iter().fold(HashMap::new(), |mut acc, event| {
        let resolves = event.new_status().is_some_and(|s| s.is_resolution());
        if let (true, Some(at)) = (resolves, event.created_at) {
            acc.entry(event.defect_id.as_str()).or_insert(at);
        }
        acc
    })
}

fn fallback_resolution(defect: &Defect) -> Option<DateTime<Utc>> {
    if defect.status.is_resolution() {
        defect.updated_at
    } else {
        None
    }
}

#[allow(clippy::cast_precision_loss)]
fn compute_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
