use serde::{Deserialize, Serialize};

use crate::models::time_window::TimeWindow;
use crate::models::{OrderId, RegionId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub weight: f64,
    pub region: RegionId,
    pub delivery_hours: Vec<TimeWindow>,
}

impl Order {
    pub fn new(id: OrderId, weight: f64, region: RegionId, delivery_hours: Vec<TimeWindow>) -> Self {
        Self {
            id,
            weight,
            region,
            delivery_hours,
        }
    }
}
