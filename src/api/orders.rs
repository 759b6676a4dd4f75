use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::engine::assignment::{assign, free_weight, BatchOutcome};
use crate::engine::completion::{complete, Completion};
use crate::engine::matching::candidates;
use crate::error::DispatchError;
use crate::models::order::Order;
use crate::models::time_window::parse_windows;
use crate::models::{CourierId, OrderId, RegionId};
use crate::observability::metrics::Metrics;
use crate::state::{AppState, AssignmentEvent};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub order_id: OrderId,
    pub weight: f64,
    pub region: RegionId,
    pub delivery_hours: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub courier_id: CourierId,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub courier_id: CourierId,
    pub order_id: OrderId,
    pub complete_time: DateTime<Utc>,
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> Result<Order, DispatchError> {
    let order = Order::new(
        payload.order_id,
        payload.weight,
        payload.region,
        parse_windows(&payload.delivery_hours)?,
    );

    state.store.upsert_order(order.clone());
    info!(order_id = order.id, weight = order.weight, region = order.region, "order registered");
    Ok(order)
}

/// Matches the courier against open orders and hands out as many as fit.
pub async fn assign_orders(
    state: &AppState,
    payload: AssignRequest,
) -> Result<BatchOutcome, DispatchError> {
    let courier_id = payload.courier_id;
    let start = Instant::now();
    let _guard = state.lock_courier(courier_id).await;

    let result = candidates(state.store.as_ref(), courier_id)
        .and_then(|found| assign(state.store.as_ref(), courier_id, found, Utc::now()));

    state
        .metrics
        .assign_requests_total
        .with_label_values(&[Metrics::outcome(&result)])
        .inc();
    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["assign"])
        .observe(start.elapsed().as_secs_f64());

    let outcome = result.inspect_err(|err| {
        warn!(courier_id, error = %err, "assign request rejected");
    })?;

    if let Some(assign_time) = outcome.assign_time {
        state
            .metrics
            .orders_assigned_total
            .inc_by(outcome.orders.len() as u64);
        state.publish(AssignmentEvent::Assigned {
            courier_id,
            order_ids: outcome.order_ids(),
            assign_time,
        });
    }
    state.record_free_weight(courier_id, free_weight(state.store.as_ref(), courier_id)?);

    Ok(outcome)
}

pub async fn complete_order(
    state: &AppState,
    payload: CompleteRequest,
) -> Result<Completion, DispatchError> {
    let CompleteRequest {
        courier_id,
        order_id,
        complete_time,
    } = payload;
    let start = Instant::now();
    let _guard = state.lock_courier(courier_id).await;

    let result = complete(state.store.as_ref(), courier_id, order_id, complete_time);

    state
        .metrics
        .completions_total
        .with_label_values(&[Metrics::outcome(&result)])
        .inc();
    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["complete"])
        .observe(start.elapsed().as_secs_f64());

    let completion = result.inspect_err(|err| {
        warn!(courier_id, order_id, error = %err, "completion rejected");
    })?;

    state.publish(AssignmentEvent::Completed {
        courier_id,
        order_id,
        cost: completion.cost,
    });
    state.record_free_weight(courier_id, free_weight(state.store.as_ref(), courier_id)?);

    Ok(completion)
}
