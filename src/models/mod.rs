pub mod assignment;
pub mod courier;
pub mod order;
pub mod time_window;

pub type CourierId = i64;
pub type OrderId = i64;
pub type RegionId = i64;
