use crate::error::DispatchError;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::models::time_window::any_overlap;
use crate::models::CourierId;
use crate::store::DispatchStore;

/// Unassigned orders the courier may carry, lightest first.
pub fn candidates(
    store: &dyn DispatchStore,
    courier_id: CourierId,
) -> Result<Vec<Order>, DispatchError> {
    let courier = store
        .courier(courier_id)
        .ok_or(DispatchError::UnknownCourier(courier_id))?;

    if courier.working_hours.is_empty() {
        return Err(DispatchError::NoWorkingHours(courier_id));
    }

    let mut eligible: Vec<Order> = store
        .orders()
        .into_iter()
        .filter(|order| is_eligible(&courier, order))
        .filter(|order| !store.has_active_assignment(order.id))
        .collect();

    eligible.sort_by(|a, b| a.weight.total_cmp(&b.weight).then(a.id.cmp(&b.id)));
    Ok(eligible)
}

fn is_eligible(courier: &Courier, order: &Order) -> bool {
    order.weight < courier.max_weight()
        && courier.covers(order.region)
        && any_overlap(&order.delivery_hours, &courier.working_hours)
}
