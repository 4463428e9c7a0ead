pub mod ancillary;
pub mod inventory;
pub mod pricing;
pub mod schedule;
pub mod search;

pub use ancillary::{AddOnSelection, FlightOfferings};
pub use inventory::{SeatAvailability, SeatInventory, SeatSummary};
pub use pricing::{FareCalculator, PricingConfig, PricingEngine, PricingError, Quote};
pub use schedule::FlightSchedule;
pub use search::{FlightDetail, FlightSearch};
