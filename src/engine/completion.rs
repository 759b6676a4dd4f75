use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::DispatchError;
use crate::models::{CourierId, OrderId};
use crate::store::DispatchStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub order_id: OrderId,
    #[serde(skip)]
    pub cost: i64,
}

pub fn complete(
    store: &dyn DispatchStore,
    courier_id: CourierId,
    order_id: OrderId,
    complete_time: DateTime<Utc>,
) -> Result<Completion, DispatchError> {
    let courier = store
        .courier(courier_id)
        .ok_or(DispatchError::UnknownCourier(courier_id))?;

    let history = store.assignments_for(courier_id, order_id);
    let mut assignment = match history.iter().find(|assignment| assignment.is_active()) {
        Some(active) => active.clone(),
        None if history.is_empty() => {
            return Err(DispatchError::AssignmentNotFound {
                courier_id,
                order_id,
            });
        }
        None => {
            return Err(DispatchError::AlreadyCompleted {
                courier_id,
                order_id,
            });
        }
    };

    let cost = assignment.complete(&courier, complete_time)?;
    store.update_assignment(assignment)?;

    info!(courier_id, order_id, cost, "order completed");
    Ok(Completion { order_id, cost })
}
