pub mod eticket;
pub mod orchestrator;
pub mod reference;
pub mod request;
pub mod side_effects;
pub mod status;
pub mod validation;

pub use eticket::ETicket;
pub use orchestrator::{
    BookingConfirmation, BookingOrchestrator, BookingRecord, OrchestratorConfig, PriceQuote, Viewer,
};
pub use request::{CancellationRequest, CreateBookingRequest, StatusUpdateRequest};
pub use side_effects::{SideEffect, SideEffectQueue, SideEffectRunner};
pub use status::{Actor, TransitionError};
