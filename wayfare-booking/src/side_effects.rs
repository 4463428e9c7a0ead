//! Post-commit work that must never fail a booking: profile updates, contact records, email.
//!
//! Orchestrator methods enqueue onto a bounded in-process channel after their transaction
//! commits. A worker task drains it through [`SideEffectRunner`]; failures are logged and dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;
use wayfare_core::notify::{Mailer, NewContact, ProfileStore};
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CancellationRejectedEvent,
    CancellationRequestedEvent,
};
use wayfare_shared::Masked;

#[derive(Debug, Clone)]
pub enum SideEffect {
    UpdateCitizenId {
        user_id: Uuid,
        citizen_id: Masked<String>,
    },
    CreateContact(NewContact),
    BookingConfirmation {
        email: Masked<String>,
        event: BookingConfirmedEvent,
    },
    CancellationRequested {
        email: Masked<String>,
        event: CancellationRequestedEvent,
    },
    CancellationConfirmed {
        email: Masked<String>,
        event: BookingCancelledEvent,
    },
    CancellationRejected {
        email: Masked<String>,
        event: CancellationRejectedEvent,
    },
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::UpdateCitizenId { .. } => "update_citizen_id",
            SideEffect::CreateContact(_) => "create_contact",
            SideEffect::BookingConfirmation { .. } => "booking_confirmation_email",
            SideEffect::CancellationRequested { .. } => "cancellation_request_email",
            SideEffect::CancellationConfirmed { .. } => "cancellation_confirmed_email",
            SideEffect::CancellationRejected { .. } => "cancellation_rejected_email",
        }
    }
}

#[derive(Clone)]
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffectQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SideEffect>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Never blocks the request path. A full or closed queue drops the effect with a warning.
    pub fn enqueue(&self, effect: SideEffect) {
        let kind = effect.kind();
        match self.tx.try_send(effect) {
            Ok(()) => debug!(kind, "Side effect queued"),
            Err(mpsc::error::TrySendError::Full(_)) => warn!(kind, "Side effect queue full, dropping"),
            Err(mpsc::error::TrySendError::Closed(_)) => warn!(kind, "Side effect queue closed, dropping"),
        }
    }
}

#[derive(Clone)]
pub struct SideEffectRunner {
    mailer: Arc<dyn Mailer>,
    profiles: Arc<dyn ProfileStore>,
}

impl SideEffectRunner {
    pub fn new(mailer: Arc<dyn Mailer>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { mailer, profiles }
    }

    /// Runs one effect. Returns whether it succeeded; the caller only logs it.
    pub async fn run(&self, effect: SideEffect) -> bool {
        let kind = effect.kind();
        let ok = match effect {
            SideEffect::UpdateCitizenId { user_id, citizen_id } => {
                match self.profiles.update_citizen_id(user_id, citizen_id.expose()).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(%user_id, error = %e, "Failed to update citizen id");
                        false
                    }
                }
            }
            SideEffect::CreateContact(contact) => match self.profiles.create_contact(&contact).await {
                Ok(()) => true,
                Err(e) => {
                    error!(booking_id = %contact.booking_id, error = %e, "Failed to create contact");
                    false
                }
            },
            SideEffect::BookingConfirmation { email, event } => {
                self.mailer.send_booking_confirmation(email.expose(), &event).await
            }
            SideEffect::CancellationRequested { email, event } => {
                self.mailer.send_cancellation_request(email.expose(), &event).await
            }
            SideEffect::CancellationConfirmed { email, event } => {
                self.mailer.send_cancellation_confirmed(email.expose(), &event).await
            }
            SideEffect::CancellationRejected { email, event } => {
                self.mailer.send_cancellation_rejected(email.expose(), &event).await
            }
        };
        if !ok {
            warn!(kind, "Side effect did not complete");
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wayfare_store::mailer::LogMailer;
    use wayfare_store::memory::InMemoryStore;

    fn contact() -> NewContact {
        NewContact {
            id: Uuid::new_v4(),
            user_id: None,
            booking_id: Uuid::new_v4(),
            first_name: "Hoa".into(),
            last_name: "Le".into(),
            email: "hoa@example.com".into(),
            phone: "0912345678".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (queue, mut rx) = SideEffectQueue::new(1);
        queue.enqueue(SideEffect::CreateContact(contact()));
        queue.enqueue(SideEffect::CreateContact(contact()));

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_runner_writes_profile_data() {
        let store = Arc::new(InMemoryStore::new());
        let runner = SideEffectRunner::new(Arc::new(LogMailer::default()), store.clone());
        let user_id = Uuid::new_v4();

        assert!(runner.run(SideEffect::CreateContact(contact())).await);
        assert!(
            runner
                .run(SideEffect::UpdateCitizenId {
                    user_id,
                    citizen_id: Masked::new("079090001234".into()),
                })
                .await
        );

        assert_eq!(store.contacts().await.len(), 1);
        assert_eq!(store.citizen_id(user_id).await.as_deref(), Some("079090001234"));
    }
}
