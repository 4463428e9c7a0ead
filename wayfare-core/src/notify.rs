//! Best-effort collaborators invoked after a booking commits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CancellationRejectedEvent,
    CancellationRequestedEvent,
};

use crate::repository::RepoResult;

/// Outbound email. Every call reports delivery with a bool and never errors.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_booking_confirmation(&self, email: &str, event: &BookingConfirmedEvent) -> bool;

    async fn send_cancellation_request(&self, email: &str, event: &CancellationRequestedEvent) -> bool;

    async fn send_cancellation_confirmed(&self, email: &str, event: &BookingCancelledEvent) -> bool;

    async fn send_cancellation_rejected(&self, email: &str, event: &CancellationRejectedEvent) -> bool;
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// User profile writes that piggyback on a booking.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn update_citizen_id(&self, user_id: Uuid, citizen_id: &str) -> RepoResult<()>;

    async fn create_contact(&self, contact: &NewContact) -> RepoResult<()>;
}
