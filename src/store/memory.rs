use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::assignment::Assignment;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::models::{CourierId, OrderId};
use crate::store::DispatchStore;

#[derive(Default)]
pub struct InMemoryStore {
    couriers: DashMap<CourierId, Courier>,
    orders: DashMap<OrderId, Order>,
    assignments: DashMap<Uuid, Assignment>,
    // order id -> id of its active assignment
    active_by_order: DashMap<OrderId, Uuid>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}

impl DispatchStore for InMemoryStore {
    fn courier(&self, id: CourierId) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    fn upsert_courier(&self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    fn upsert_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    fn orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn has_active_assignment(&self, order_id: OrderId) -> bool {
        self.active_by_order.contains_key(&order_id)
    }

    fn courier_assignments(&self, courier_id: CourierId) -> Vec<Assignment> {
        self.assignments
            .iter()
            .filter(|entry| entry.value().courier_id == courier_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn insert_assignment(&self, assignment: Assignment) -> Result<(), DispatchError> {
        if !assignment.is_active() {
            self.assignments.insert(assignment.id, assignment);
            return Ok(());
        }

        match self.active_by_order.entry(assignment.order_id) {
            Entry::Occupied(_) => Err(DispatchError::OrderAlreadyAssigned(assignment.order_id)),
            Entry::Vacant(slot) => {
                slot.insert(assignment.id);
                self.assignments.insert(assignment.id, assignment);
                Ok(())
            }
        }
    }

    fn update_assignment(&self, assignment: Assignment) -> Result<(), DispatchError> {
        let (id, order_id, active) = (assignment.id, assignment.order_id, assignment.is_active());

        {
            let mut stored = self.assignments.get_mut(&id).ok_or_else(|| {
                DispatchError::AssignmentNotFound {
                    courier_id: assignment.courier_id,
                    order_id,
                }
            })?;
            *stored = assignment;
        }

        if !active {
            self.active_by_order
                .remove_if(&order_id, |_, active_id| *active_id == id);
        }
        Ok(())
    }

    fn delete_assignment(&self, id: Uuid) -> Result<Assignment, DispatchError> {
        let removed = self
            .assignments
            .remove_if(&id, |_, assignment| assignment.is_active());

        match removed {
            Some((_, assignment)) => {
                self.active_by_order
                    .remove_if(&assignment.order_id, |_, active_id| *active_id == id);
                Ok(assignment)
            }
            None => match self.assignments.get(&id) {
                Some(completed) => Err(DispatchError::AlreadyCompleted {
                    courier_id: completed.courier_id,
                    order_id: completed.order_id,
                }),
                None => Err(DispatchError::Internal(format!("assignment {id} not found"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::InMemoryStore;
    use crate::error::DispatchError;
    use crate::models::assignment::Assignment;
    use crate::models::courier::{Courier, VehicleClass};
    use crate::store::DispatchStore;

    #[test]
    fn second_active_assignment_for_order_is_refused() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        store.insert_assignment(Assignment::new(1, 10, now)).unwrap();
        let second = store.insert_assignment(Assignment::new(2, 10, now));

        assert_eq!(second, Err(DispatchError::OrderAlreadyAssigned(10)));
        assert!(store.has_active_assignment(10));
        assert_eq!(store.assignment_count(), 1);
    }

    #[test]
    fn completing_releases_the_order() {
        let store = InMemoryStore::new();
        let courier = Courier::new(1, VehicleClass::Foot, [1], Vec::new());
        let now = Utc::now();

        let mut assignment = Assignment::new(1, 10, now);
        store.insert_assignment(assignment.clone()).unwrap();

        assignment.complete(&courier, now + Duration::minutes(5)).unwrap();
        store.update_assignment(assignment).unwrap();

        assert!(!store.has_active_assignment(10));
        assert_eq!(store.completed_assignments(1).len(), 1);
        assert!(store.active_assignments(1).is_empty());
    }

    #[test]
    fn completed_assignments_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let courier = Courier::new(1, VehicleClass::Foot, [1], Vec::new());
        let now = Utc::now();

        let mut assignment = Assignment::new(1, 10, now);
        assignment.complete(&courier, now).unwrap();
        let id = assignment.id;
        store.insert_assignment(assignment).unwrap();

        assert!(matches!(
            store.delete_assignment(id),
            Err(DispatchError::AlreadyCompleted { .. })
        ));
        assert_eq!(store.assignment_count(), 1);
    }

    #[test]
    fn deleting_active_assignment_frees_order() {
        let store = InMemoryStore::new();
        let assignment = Assignment::new(1, 10, Utc::now());
        let id = assignment.id;
        store.insert_assignment(assignment).unwrap();

        let removed = store.delete_assignment(id).unwrap();

        assert_eq!(removed.order_id, 10);
        assert!(!store.has_active_assignment(10));
        assert_eq!(store.assignment_count(), 0);
    }
}
