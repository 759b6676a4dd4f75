use thiserror::Error;

use crate::models::{CourierId, OrderId};

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("courier {0} not found")]
    UnknownCourier(CourierId),

    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error("courier {0} has no working hours")]
    NoWorkingHours(CourierId),

    #[error("no assignment of order {order_id} to courier {courier_id}")]
    AssignmentNotFound {
        courier_id: CourierId,
        order_id: OrderId,
    },

    #[error("order {order_id} was already completed by courier {courier_id}")]
    AlreadyCompleted {
        courier_id: CourierId,
        order_id: OrderId,
    },

    #[error("order {order_id} cannot be completed before it was assigned to courier {courier_id}")]
    CompletedBeforeAssigned {
        courier_id: CourierId,
        order_id: OrderId,
    },

    #[error("order {0} already has an active assignment")]
    OrderAlreadyAssigned(OrderId),

    #[error("invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}
