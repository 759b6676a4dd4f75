use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::models::assignment::Assignment;
use crate::models::order::Order;
use crate::models::{CourierId, OrderId};
use crate::store::DispatchStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedOrder {
    pub id: OrderId,
}

/// Result of one batch: the orders handed out and their shared timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub orders: Vec<AssignedOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_time: Option<DateTime<Utc>>,
}

impl BatchOutcome {
    fn empty() -> Self {
        Self {
            orders: Vec::new(),
            assign_time: None,
        }
    }

    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|order| order.id).collect()
    }
}

/// Capacity left after the courier's active assignments, never negative.
pub fn free_weight(store: &dyn DispatchStore, courier_id: CourierId) -> Result<f64, DispatchError> {
    let courier = store
        .courier(courier_id)
        .ok_or(DispatchError::UnknownCourier(courier_id))?;

    let mut carried = 0.0;
    for assignment in store.active_assignments(courier_id) {
        let order = store
            .order(assignment.order_id)
            .ok_or(DispatchError::UnknownOrder(assignment.order_id))?;
        carried += order.weight;
    }

    Ok((courier.max_weight() - carried).max(0.0))
}

/// Fills the courier up to capacity from `candidates` (sorted lightest first),
/// taking the heaviest remaining order that still fits. New orders join the
/// courier's running batch when one exists.
pub fn assign(
    store: &dyn DispatchStore,
    courier_id: CourierId,
    mut candidates: Vec<Order>,
    now: DateTime<Utc>,
) -> Result<BatchOutcome, DispatchError> {
    let mut remaining = free_weight(store, courier_id)?;

    let assign_time = store
        .active_assignments(courier_id)
        .iter()
        .map(|assignment| assignment.assign_time)
        .min()
        .unwrap_or(now);

    let mut assigned = Vec::new();
    while remaining > 0.0 {
        let Some(order) = candidates.pop() else {
            break;
        };

        if order.weight > remaining {
            continue;
        }

        match store.insert_assignment(Assignment::new(courier_id, order.id, assign_time)) {
            Ok(()) => {
                remaining -= order.weight;
                assigned.push(AssignedOrder { id: order.id });
            }
            Err(DispatchError::OrderAlreadyAssigned(order_id)) => {
                debug!(courier_id, order_id, "order taken by another courier; skipping");
            }
            Err(err) => return Err(err),
        }
    }

    if assigned.is_empty() {
        return Ok(BatchOutcome::empty());
    }

    info!(
        courier_id,
        orders = assigned.len(),
        free_weight = remaining,
        "batch assigned"
    );

    Ok(BatchOutcome {
        orders: assigned,
        assign_time: Some(assign_time),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{assign, free_weight};
    use crate::engine::matching::candidates;
    use crate::error::DispatchError;
    use crate::models::assignment::Assignment;
    use crate::models::courier::{Courier, VehicleClass};
    use crate::models::order::Order;
    use crate::models::time_window::parse_windows;
    use crate::store::{DispatchStore, InMemoryStore};

    fn order(id: i64, weight: f64) -> Order {
        Order::new(id, weight, 1, parse_windows(&["09:00-12:00"]).unwrap())
    }

    fn store_with(vehicle: VehicleClass, orders: &[Order]) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.upsert_courier(Courier::new(
            1,
            vehicle,
            [1],
            parse_windows(&["09:00-18:00"]).unwrap(),
        ));
        for order in orders {
            store.upsert_order(order.clone());
        }
        store
    }

    #[test]
    fn heaviest_fitting_orders_go_first() {
        let store = store_with(
            VehicleClass::Foot,
            &[order(1, 6.0), order(2, 5.0), order(3, 3.0), order(4, 1.0)],
        );
        let now = Utc.with_ymd_and_hms(2021, 1, 10, 9, 0, 0).unwrap();

        let found = candidates(&store, 1).unwrap();
        let outcome = assign(&store, 1, found, now).unwrap();

        // 6 fits, 5 does not, 3 fits, 1 fills the last slot
        assert_eq!(outcome.order_ids(), vec![1, 3, 4]);
        assert_eq!(outcome.assign_time, Some(now));
        assert_eq!(free_weight(&store, 1).unwrap(), 0.0);
    }

    #[test]
    fn nothing_fits_yields_empty_outcome() {
        let store = store_with(VehicleClass::Foot, &[order(1, 9.0), order(2, 4.0)]);
        store
            .insert_assignment(Assignment::new(1, 1, Utc::now()))
            .unwrap();

        let found = candidates(&store, 1).unwrap();
        let outcome = assign(&store, 1, found, Utc::now()).unwrap();

        assert!(outcome.orders.is_empty());
        assert_eq!(outcome.assign_time, None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("assign_time").is_none());
    }

    #[test]
    fn running_batch_timestamp_is_reused() {
        let store = store_with(
            VehicleClass::Bike,
            &[order(1, 2.0), order(2, 3.0), order(3, 4.0)],
        );
        let earliest = Utc.with_ymd_and_hms(2021, 1, 10, 9, 0, 0).unwrap();
        store
            .insert_assignment(Assignment::new(1, 1, earliest + Duration::hours(1)))
            .unwrap();
        store
            .insert_assignment(Assignment::new(1, 2, earliest))
            .unwrap();

        let found = candidates(&store, 1).unwrap();
        let outcome = assign(&store, 1, found, earliest + Duration::hours(3)).unwrap();

        assert_eq!(outcome.order_ids(), vec![3]);
        assert_eq!(outcome.assign_time, Some(earliest));
    }

    #[test]
    fn unknown_courier_is_rejected() {
        let store = InMemoryStore::new();
        assert_eq!(
            assign(&store, 5, Vec::new(), Utc::now()).unwrap_err(),
            DispatchError::UnknownCourier(5)
        );
    }

    #[test]
    fn order_taken_meanwhile_is_skipped() {
        let store = store_with(VehicleClass::Foot, &[order(1, 4.0), order(2, 3.0)]);
        let found = candidates(&store, 1).unwrap();

        store
            .insert_assignment(Assignment::new(99, 1, Utc::now()))
            .unwrap();
        let outcome = assign(&store, 1, found, Utc::now()).unwrap();

        assert_eq!(outcome.order_ids(), vec![2]);
        assert_eq!(free_weight(&store, 1).unwrap(), 7.0);
    }
}
