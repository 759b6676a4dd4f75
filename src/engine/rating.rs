use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DispatchError;
use crate::models::{CourierId, RegionId};
use crate::store::DispatchStore;

const HOUR_SECS: f64 = 3600.0;
const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub earnings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Earnings and punctuality rating over the courier's completed deliveries.
pub fn summarize(store: &dyn DispatchStore, courier_id: CourierId) -> Result<Summary, DispatchError> {
    let mut earnings = 0;
    let mut by_region: BTreeMap<RegionId, Vec<(DateTime<Utc>, DateTime<Utc>)>> = BTreeMap::new();

    for assignment in store.completed_assignments(courier_id) {
        let (Some(complete_time), Some(cost)) = (assignment.complete_time(), assignment.cost())
        else {
            continue;
        };
        let order = store
            .order(assignment.order_id)
            .ok_or(DispatchError::UnknownOrder(assignment.order_id))?;

        earnings += cost;
        by_region
            .entry(order.region)
            .or_default()
            .push((assignment.assign_time, complete_time));
    }

    let fastest = by_region
        .into_values()
        .map(average_delivery_secs)
        .min_by(f64::total_cmp);

    Ok(Summary {
        earnings,
        rating: fastest.map(rating_from_secs),
    })
}

/// Mean seconds per delivery within one region. Deliveries sharing an
/// assign time form one run and are timed from the previous completion.
fn average_delivery_secs(mut deliveries: Vec<(DateTime<Utc>, DateTime<Utc>)>) -> f64 {
    deliveries.sort();

    let mut total_secs = 0.0;
    let mut previous: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for &(assign_time, complete_time) in &deliveries {
        let started = match previous {
            Some((run_assigned, run_completed)) if run_assigned == assign_time => run_completed,
            _ => assign_time,
        };
        total_secs += seconds_between(started, complete_time);
        previous = Some((assign_time, complete_time));
    }

    total_secs / deliveries.len() as f64
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn rating_from_secs(secs: f64) -> f64 {
    let t = secs.clamp(0.0, HOUR_SECS);
    (HOUR_SECS - t) / HOUR_SECS * MAX_RATING
}
