use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::time_window::TimeWindow;
use crate::models::{CourierId, RegionId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Foot,
    Bike,
    Car,
}

impl VehicleClass {
    pub fn max_weight(self) -> f64 {
        match self {
            VehicleClass::Foot => 10.0,
            VehicleClass::Bike => 15.0,
            VehicleClass::Car => 50.0,
        }
    }

    pub fn payout_coefficient(self) -> i64 {
        match self {
            VehicleClass::Foot => 2,
            VehicleClass::Bike => 5,
            VehicleClass::Car => 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub id: CourierId,
    pub vehicle: VehicleClass,
    pub regions: BTreeSet<RegionId>,
    pub working_hours: Vec<TimeWindow>,
}

impl Courier {
    pub fn new(
        id: CourierId,
        vehicle: VehicleClass,
        regions: impl IntoIterator<Item = RegionId>,
        working_hours: Vec<TimeWindow>,
    ) -> Self {
        Self {
            id,
            vehicle,
            regions: regions.into_iter().collect(),
            working_hours,
        }
    }

    pub fn max_weight(&self) -> f64 {
        self.vehicle.max_weight()
    }

    pub fn covers(&self, region: RegionId) -> bool {
        self.regions.contains(&region)
    }

    /// Applies the present fields of `patch`; returns whether anything changed.
    pub fn apply(&mut self, patch: CourierPatch) -> bool {
        let mut changed = false;

        if let Some(vehicle) = patch.vehicle {
            changed |= self.vehicle != vehicle;
            self.vehicle = vehicle;
        }
        if let Some(regions) = patch.regions {
            let regions: BTreeSet<RegionId> = regions.into_iter().collect();
            changed |= self.regions != regions;
            self.regions = regions;
        }
        if let Some(working_hours) = patch.working_hours {
            changed |= self.working_hours != working_hours;
            self.working_hours = working_hours;
        }

        changed
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourierPatch {
    pub vehicle: Option<VehicleClass>,
    pub regions: Option<Vec<RegionId>>,
    pub working_hours: Option<Vec<TimeWindow>>,
}
