pub mod clock;
pub mod driver;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{Driver, DriverState, TickOutcome};
