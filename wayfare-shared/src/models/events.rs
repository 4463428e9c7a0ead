use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Payload handed to the mailer once a booking has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub contact_name: String,
    pub final_amount: i64,
    pub flight_numbers: Vec<String>,
    pub passenger_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CancellationRequestedEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub released_seats: usize,
    pub refunded: bool,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CancellationRejectedEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub rejected_at: DateTime<Utc>,
}
