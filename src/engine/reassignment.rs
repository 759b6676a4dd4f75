use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::DispatchError;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::models::time_window::any_overlap;
use crate::models::{CourierId, OrderId};
use crate::store::DispatchStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    Overweight,
    Region,
    Schedule,
}

impl EvictionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionReason::Overweight => "overweight",
            EvictionReason::Region => "region",
            EvictionReason::Schedule => "schedule",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eviction {
    pub order_id: OrderId,
    pub reason: EvictionReason,
}

/// Drops every active assignment the courier's current profile can no longer
/// serve. Must run after each change to vehicle class, regions or hours.
///
/// Active orders are re-admitted heaviest first, each checked for weight,
/// then region, then schedule. Once one would overflow the capacity it is
/// evicted along with every lighter order after it.
pub fn sweep(
    store: &dyn DispatchStore,
    courier_id: CourierId,
) -> Result<Vec<Eviction>, DispatchError> {
    let courier = store
        .courier(courier_id)
        .ok_or(DispatchError::UnknownCourier(courier_id))?;

    let mut held = Vec::new();
    for assignment in store.active_assignments(courier_id) {
        let order = store
            .order(assignment.order_id)
            .ok_or(DispatchError::UnknownOrder(assignment.order_id))?;
        held.push((assignment, order));
    }
    held.sort_by(|(_, a), (_, b)| b.weight.total_cmp(&a.weight).then(a.id.cmp(&b.id)));

    let max_weight = courier.max_weight();
    let mut load = 0.0;
    let mut overflowed = false;
    let mut evictions = Vec::new();

    for (assignment, order) in held {
        overflowed = overflowed || load + order.weight > max_weight;

        // Weight is admitted before the region and schedule checks, so an
        // order evicted by those still occupies capacity.
        let reason = if overflowed {
            Some(EvictionReason::Overweight)
        } else {
            load += order.weight;
            misfit(&courier, &order)
        };

        if let Some(reason) = reason {
            store.delete_assignment(assignment.id)?;
            info!(courier_id, order_id = order.id, %reason, "order evicted");
            evictions.push(Eviction {
                order_id: order.id,
                reason,
            });
        }
    }

    Ok(evictions)
}

fn misfit(courier: &Courier, order: &Order) -> Option<EvictionReason> {
    if !courier.covers(order.region) {
        return Some(EvictionReason::Region);
    }

    // With no window pairs to compare there is nothing to contradict.
    let comparable = !order.delivery_hours.is_empty() && !courier.working_hours.is_empty();
    if comparable && !any_overlap(&order.delivery_hours, &courier.working_hours) {
        return Some(EvictionReason::Schedule);
    }

    None
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{sweep, EvictionReason};
    use crate::engine::assignment::free_weight;
    use crate::models::assignment::Assignment;
    use crate::models::courier::{Courier, CourierPatch, VehicleClass};
    use crate::models::order::Order;
    use crate::models::time_window::parse_windows;
    use crate::store::{DispatchStore, InMemoryStore};

    fn order(id: i64, weight: f64, region: i64, hours: &[&str]) -> Order {
        Order::new(id, weight, region, parse_windows(hours).unwrap())
    }

    fn setup(vehicle: VehicleClass, orders: Vec<Order>) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.upsert_courier(Courier::new(
            1,
            vehicle,
            [1, 2],
            parse_windows(&["09:00-18:00"]).unwrap(),
        ));
        let now = Utc::now();
        for order in orders {
            store
                .insert_assignment(Assignment::new(1, order.id, now))
                .unwrap();
            store.upsert_order(order);
        }
        store
    }

    fn patch(store: &InMemoryStore, patch: CourierPatch) {
        let mut courier = store.courier(1).unwrap();
        courier.apply(patch);
        store.upsert_courier(courier);
    }

    fn active_ids(store: &InMemoryStore) -> Vec<i64> {
        let mut ids: Vec<i64> = store
            .active_assignments(1)
            .iter()
            .map(|assignment| assignment.order_id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn unchanged_profile_keeps_everything() {
        let store = setup(
            VehicleClass::Bike,
            vec![
                order(1, 6.0, 1, &["10:00-11:00"]),
                order(2, 5.0, 2, &["17:00-19:00"]),
            ],
        );

        assert!(sweep(&store, 1).unwrap().is_empty());
        assert_eq!(active_ids(&store), vec![1, 2]);
    }

    #[test]
    fn downgrade_evicts_from_first_overflow_on() {
        let store = setup(
            VehicleClass::Car,
            vec![
                order(1, 7.0, 1, &["10:00-11:00"]),
                order(2, 4.0, 1, &["10:00-11:00"]),
                order(3, 2.0, 1, &["10:00-11:00"]),
            ],
        );
        patch(
            &store,
            CourierPatch {
                vehicle: Some(VehicleClass::Foot),
                ..CourierPatch::default()
            },
        );

        let evicted = sweep(&store, 1).unwrap();

        assert_eq!(
            evicted.iter().map(|e| e.order_id).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(evicted
            .iter()
            .all(|e| e.reason == EvictionReason::Overweight));
        assert_eq!(active_ids(&store), vec![1]);
        assert_eq!(free_weight(&store, 1).unwrap(), 3.0);
    }

    #[test]
    fn removed_region_is_evicted() {
        let store = setup(
            VehicleClass::Bike,
            vec![
                order(1, 3.0, 1, &["10:00-11:00"]),
                order(2, 3.0, 2, &["10:00-11:00"]),
            ],
        );
        patch(
            &store,
            CourierPatch {
                regions: Some(vec![1]),
                ..CourierPatch::default()
            },
        );

        let evicted = sweep(&store, 1).unwrap();

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].order_id, 2);
        assert_eq!(evicted[0].reason, EvictionReason::Region);
        assert_eq!(active_ids(&store), vec![1]);
    }

    #[test]
    fn region_evicted_order_still_uses_capacity() {
        let store = setup(
            VehicleClass::Bike,
            vec![
                order(1, 8.0, 2, &["10:00-11:00"]),
                order(2, 5.0, 1, &["10:00-11:00"]),
                order(3, 4.0, 1, &["10:00-11:00"]),
            ],
        );
        patch(
            &store,
            CourierPatch {
                vehicle: Some(VehicleClass::Foot),
                regions: Some(vec![1]),
                ..CourierPatch::default()
            },
        );

        let evicted = sweep(&store, 1).unwrap();

        assert_eq!(
            evicted
                .iter()
                .map(|e| (e.order_id, e.reason))
                .collect::<Vec<_>>(),
            vec![
                (1, EvictionReason::Region),
                (2, EvictionReason::Overweight),
                (3, EvictionReason::Overweight),
            ]
        );
        assert!(active_ids(&store).is_empty());
    }

    #[test]
    fn order_kept_while_any_window_pair_overlaps() {
        let store = setup(
            VehicleClass::Bike,
            vec![
                order(1, 1.0, 1, &["08:00-09:30", "19:00-20:00"]),
                order(2, 1.0, 1, &["19:00-20:00"]),
                order(3, 1.0, 1, &[]),
            ],
        );
        patch(
            &store,
            CourierPatch {
                working_hours: Some(parse_windows(&["09:00-12:00"]).unwrap()),
                ..CourierPatch::default()
            },
        );

        let evicted = sweep(&store, 1).unwrap();

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].order_id, 2);
        assert_eq!(evicted[0].reason, EvictionReason::Schedule);
        assert_eq!(active_ids(&store), vec![1, 3]);
    }

    #[test]
    fn sweep_is_idempotent() {
        let store = setup(
            VehicleClass::Car,
            vec![
                order(1, 9.0, 1, &["10:00-11:00"]),
                order(2, 3.0, 2, &["10:00-11:00"]),
                order(3, 2.0, 1, &["06:00-07:00"]),
            ],
        );
        patch(
            &store,
            CourierPatch {
                vehicle: Some(VehicleClass::Foot),
                regions: Some(vec![1]),
                working_hours: Some(parse_windows(&["09:00-12:00"]).unwrap()),
            },
        );

        let first = sweep(&store, 1).unwrap();
        let second = sweep(&store, 1).unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(active_ids(&store), vec![1]);
    }

    #[test]
    fn completed_assignments_are_untouched() {
        let store = setup(VehicleClass::Car, vec![order(1, 30.0, 1, &["10:00-11:00"])]);
        let courier = store.courier(1).unwrap();
        let mut done = store.active_assignments(1).remove(0);
        let assigned_at = done.assign_time;
        done.complete(&courier, assigned_at).unwrap();
        store.update_assignment(done).unwrap();

        patch(
            &store,
            CourierPatch {
                vehicle: Some(VehicleClass::Foot),
                regions: Some(vec![9]),
                ..CourierPatch::default()
            },
        );

        assert!(sweep(&store, 1).unwrap().is_empty());
        assert_eq!(store.completed_assignments(1).len(), 1);
    }
}
