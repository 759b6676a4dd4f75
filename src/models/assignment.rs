use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::courier::Courier;
use crate::models::{CourierId, OrderId};

/// Flat price of a delivery before the vehicle coefficient is applied.
pub const BASE_PAYOUT: i64 = 500;

/// Link between a courier and an order it carries.
///
/// `complete_time` and `cost` are set together, once, by [`Assignment::complete`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: Uuid,
    pub courier_id: CourierId,
    pub order_id: OrderId,
    pub assign_time: DateTime<Utc>,
    complete_time: Option<DateTime<Utc>>,
    cost: Option<i64>,
}

impl Assignment {
    pub fn new(courier_id: CourierId, order_id: OrderId, assign_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            courier_id,
            order_id,
            assign_time,
            complete_time: None,
            cost: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.complete_time.is_none()
    }

    pub fn complete_time(&self) -> Option<DateTime<Utc>> {
        self.complete_time
    }

    pub fn cost(&self) -> Option<i64> {
        self.cost
    }

    /// Marks the assignment delivered and fixes its price from the courier's
    /// current vehicle class.
    pub fn complete(
        &mut self,
        courier: &Courier,
        complete_time: DateTime<Utc>,
    ) -> Result<i64, DispatchError> {
        if !self.is_active() {
            return Err(DispatchError::AlreadyCompleted {
                courier_id: self.courier_id,
                order_id: self.order_id,
            });
        }
        if complete_time < self.assign_time {
            return Err(DispatchError::CompletedBeforeAssigned {
                courier_id: self.courier_id,
                order_id: self.order_id,
            });
        }

        let cost = BASE_PAYOUT * courier.vehicle.payout_coefficient();
        self.complete_time = Some(complete_time);
        self.cost = Some(cost);
        Ok(cost)
    }
}
