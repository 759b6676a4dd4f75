pub mod couriers;
pub mod orders;
