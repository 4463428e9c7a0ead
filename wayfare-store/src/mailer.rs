use async_trait::async_trait;
use tracing::info;
use wayfare_core::notify::Mailer;
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CancellationRejectedEvent,
    CancellationRequestedEvent,
};
use wayfare_shared::pii::mask_email;

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_booking_confirmation(&self, email: &str, event: &BookingConfirmedEvent) -> bool {
        info!(
            to = %mask_email(email),
            reference = %event.booking_reference,
            final_amount = event.final_amount,
            flights = ?event.flight_numbers,
            "Booking confirmation email"
        );
        true
    }

    async fn send_cancellation_request(&self, email: &str, event: &CancellationRequestedEvent) -> bool {
        info!(
            to = %mask_email(email),
            reference = %event.booking_reference,
            reason = event.reason.as_deref().unwrap_or(""),
            "Cancellation request email"
        );
        true
    }

    async fn send_cancellation_confirmed(&self, email: &str, event: &BookingCancelledEvent) -> bool {
        info!(
            to = %mask_email(email),
            reference = %event.booking_reference,
            released_seats = event.released_seats,
            refunded = event.refunded,
            "Cancellation confirmed email"
        );
        true
    }

    async fn send_cancellation_rejected(&self, email: &str, event: &CancellationRejectedEvent) -> bool {
        info!(
            to = %mask_email(email),
            reference = %event.booking_reference,
            "Cancellation rejected email"
        );
        true
    }
}
