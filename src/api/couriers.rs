use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::assignment::free_weight;
use crate::engine::rating::{summarize, Summary};
use crate::engine::reassignment::sweep;
use crate::error::DispatchError;
use crate::models::courier::{Courier, CourierPatch, VehicleClass};
use crate::models::time_window::parse_windows;
use crate::models::{CourierId, RegionId};
use crate::state::{AppState, AssignmentEvent};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCourierRequest {
    pub courier_id: CourierId,
    pub courier_type: VehicleClass,
    pub regions: Vec<RegionId>,
    pub working_hours: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCourierRequest {
    pub courier_type: Option<VehicleClass>,
    pub regions: Option<Vec<RegionId>>,
    pub working_hours: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierView {
    pub courier_id: CourierId,
    pub courier_type: VehicleClass,
    pub regions: Vec<RegionId>,
    pub working_hours: Vec<String>,
}

impl From<&Courier> for CourierView {
    fn from(courier: &Courier) -> Self {
        Self {
            courier_id: courier.id,
            courier_type: courier.vehicle,
            regions: courier.regions.iter().copied().collect(),
            working_hours: courier
                .working_hours
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierProfile {
    #[serde(flatten)]
    pub courier: CourierView,
    #[serde(flatten)]
    pub summary: Summary,
}

pub async fn create_courier(
    state: &AppState,
    payload: CreateCourierRequest,
) -> Result<CourierView, DispatchError> {
    let working_hours = parse_windows(&payload.working_hours)?;
    let courier = Courier::new(
        payload.courier_id,
        payload.courier_type,
        payload.regions,
        working_hours,
    );

    let _guard = state.lock_courier(courier.id).await;
    // re-registering an id replaces the profile, so held orders are re-checked
    let previous = state.store.courier(courier.id);
    commit_profile(state, &courier, previous)?;

    info!(courier_id = courier.id, courier_type = ?courier.vehicle, "courier registered");
    Ok(CourierView::from(&courier))
}

/// Applies a partial profile change and drops whatever the courier can no
/// longer carry before returning the new profile.
pub async fn update_courier(
    state: &AppState,
    courier_id: CourierId,
    payload: UpdateCourierRequest,
) -> Result<CourierView, DispatchError> {
    let start = Instant::now();
    let working_hours = payload
        .working_hours
        .as_deref()
        .map(parse_windows)
        .transpose()?;

    let _guard = state.lock_courier(courier_id).await;

    let previous = state.store.courier(courier_id).ok_or_else(|| {
        warn!(courier_id, "update for unknown courier");
        DispatchError::UnknownCourier(courier_id)
    })?;

    let mut courier = previous.clone();
    let changed = courier.apply(CourierPatch {
        vehicle: payload.courier_type,
        regions: payload.regions,
        working_hours,
    });

    let evicted = commit_profile(state, &courier, Some(previous))?;
    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["update_courier"])
        .observe(start.elapsed().as_secs_f64());

    info!(courier_id, changed, evicted, "courier profile updated");
    Ok(CourierView::from(&courier))
}

/// Stores the new profile and sweeps the courier's held orders. When the
/// sweep cannot run, the previous profile is put back.
fn commit_profile(
    state: &AppState,
    courier: &Courier,
    previous: Option<Courier>,
) -> Result<usize, DispatchError> {
    let courier_id = courier.id;
    state.store.upsert_courier(courier.clone());

    let evictions = match sweep(state.store.as_ref(), courier_id) {
        Ok(evictions) => evictions,
        Err(err) => {
            warn!(courier_id, error = %err, "sweep failed; profile change rolled back");
            if let Some(previous) = previous {
                state.store.upsert_courier(previous);
            }
            return Err(err);
        }
    };

    for eviction in &evictions {
        state
            .metrics
            .evictions_total
            .with_label_values(&[eviction.reason.as_str()])
            .inc();
        state.publish(AssignmentEvent::Evicted {
            courier_id,
            order_id: eviction.order_id,
            reason: eviction.reason,
        });
    }

    state.record_free_weight(courier_id, free_weight(state.store.as_ref(), courier_id)?);
    Ok(evictions.len())
}

pub async fn courier_profile(
    state: &AppState,
    courier_id: CourierId,
) -> Result<CourierProfile, DispatchError> {
    let _guard = state.lock_courier(courier_id).await;

    let courier = state
        .store
        .courier(courier_id)
        .ok_or(DispatchError::UnknownCourier(courier_id))?;
    let summary = summarize(state.store.as_ref(), courier_id)?;

    Ok(CourierProfile {
        courier: CourierView::from(&courier),
        summary,
    })
}
