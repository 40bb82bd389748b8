pub mod soft;

pub use soft::{BusError, SoftwareBus, DEFAULT_HALF_PERIOD_US, MAX_HALF_PERIOD_US};
