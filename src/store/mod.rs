pub mod memory;

use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::assignment::Assignment;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::models::{CourierId, OrderId};

pub use memory::InMemoryStore;

/// Persistence boundary the engine works against.
///
/// Implementations must make `insert_assignment` atomic with respect to the
/// one-active-assignment-per-order rule, since orders are shared between
/// couriers that are locked independently.
pub trait DispatchStore: Send + Sync {
    fn courier(&self, id: CourierId) -> Option<Courier>;

    fn upsert_courier(&self, courier: Courier);

    fn order(&self, id: OrderId) -> Option<Order>;

    fn upsert_order(&self, order: Order);

    fn orders(&self) -> Vec<Order>;

    fn has_active_assignment(&self, order_id: OrderId) -> bool;

    /// Every assignment of the courier, completed ones included.
    fn courier_assignments(&self, courier_id: CourierId) -> Vec<Assignment>;

    fn insert_assignment(&self, assignment: Assignment) -> Result<(), DispatchError>;

    fn update_assignment(&self, assignment: Assignment) -> Result<(), DispatchError>;

    /// Removes an active assignment. Completed assignments are permanent.
    fn delete_assignment(&self, id: Uuid) -> Result<Assignment, DispatchError>;

    fn active_assignments(&self, courier_id: CourierId) -> Vec<Assignment> {
        let mut active: Vec<Assignment> = self
            .courier_assignments(courier_id)
            .into_iter()
            .filter(Assignment::is_active)
            .collect();
        active.sort_by_key(|assignment| assignment.assign_time);
        active
    }

    fn completed_assignments(&self, courier_id: CourierId) -> Vec<Assignment> {
        self.courier_assignments(courier_id)
            .into_iter()
            .filter(|assignment| !assignment.is_active())
            .collect()
    }

    fn assignments_for(&self, courier_id: CourierId, order_id: OrderId) -> Vec<Assignment> {
        self.courier_assignments(courier_id)
            .into_iter()
            .filter(|assignment| assignment.order_id == order_id)
            .collect()
    }
}
