//! Booking status state machine.
//!
//! ```text
//! pending ──► confirmed ──► completed
//!    │            │
//!    ├────────────┴──► pending_cancellation ──► cancelled
//!    │                          │
//!    │                          └──► cancellation_rejected ──► completed | cancelled
//!    └──► cancelled (admin)
//! ```

use wayfare_core::booking::{BookingStatus, PaymentStatus};
use wayfare_core::CoreError;

/// Who is asking for the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cancellation has already been requested for this booking")]
    AlreadyRequested,

    #[error("Booking is {0} and can no longer change")]
    Terminal(BookingStatus),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl From<TransitionError> for CoreError {
    fn from(err: TransitionError) -> Self {
        CoreError::BadRequest(err.to_string())
    }
}

pub fn check_transition(from: BookingStatus, to: BookingStatus, actor: Actor) -> Result<(), TransitionError> {
    use BookingStatus::*;

    if from == PendingCancellation && to == PendingCancellation {
        return Err(TransitionError::AlreadyRequested);
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }

    let allowed = match actor {
        Actor::Customer => matches!((from, to), (Pending | Confirmed, PendingCancellation)),
        Actor::Admin => matches!(
            (from, to),
            (Pending, Confirmed)
                | (Confirmed | CancellationRejected, Completed)
                | (Pending | Confirmed | PendingCancellation | CancellationRejected, Cancelled)
                | (PendingCancellation, CancellationRejected)
        ),
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition { from, to })
    }
}

/// Payment status after a transition: a paid booking that gets cancelled is refunded.
pub fn settle_payment(to: BookingStatus, current: PaymentStatus) -> PaymentStatus {
    match (to, current) {
        (BookingStatus::Cancelled, PaymentStatus::Paid) => PaymentStatus::Refunded,
        _ => current,
    }
}

/// Passenger records are frozen once the booking is over.
pub fn passengers_editable(status: BookingStatus) -> bool {
    !status.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_customer_can_only_request_cancellation() {
        assert!(check_transition(Pending, PendingCancellation, Actor::Customer).is_ok());
        assert!(check_transition(Confirmed, PendingCancellation, Actor::Customer).is_ok());
        assert_eq!(
            check_transition(Pending, Cancelled, Actor::Customer),
            Err(TransitionError::InvalidTransition { from: Pending, to: Cancelled })
        );
        assert!(check_transition(CancellationRejected, PendingCancellation, Actor::Customer).is_err());
    }

    #[test]
    fn test_second_cancellation_request_is_rejected() {
        for actor in [Actor::Customer, Actor::Admin] {
            assert_eq!(
                check_transition(PendingCancellation, PendingCancellation, actor),
                Err(TransitionError::AlreadyRequested)
            );
        }
    }

    #[test]
    fn test_admin_paths() {
        assert!(check_transition(Pending, Confirmed, Actor::Admin).is_ok());
        assert!(check_transition(Confirmed, Completed, Actor::Admin).is_ok());
        assert!(check_transition(PendingCancellation, Cancelled, Actor::Admin).is_ok());
        assert!(check_transition(PendingCancellation, CancellationRejected, Actor::Admin).is_ok());
        assert!(check_transition(CancellationRejected, Completed, Actor::Admin).is_ok());
        assert!(check_transition(Pending, Completed, Actor::Admin).is_err());
        assert!(check_transition(Confirmed, CancellationRejected, Actor::Admin).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [Cancelled, Completed] {
            for to in BookingStatus::ALL {
                assert!(check_transition(from, *to, Actor::Admin).is_err());
            }
            assert!(!passengers_editable(from));
        }
        assert!(passengers_editable(CancellationRejected));
    }

    #[test]
    fn test_refund_on_cancel() {
        assert_eq!(settle_payment(Cancelled, PaymentStatus::Paid), PaymentStatus::Refunded);
        assert_eq!(settle_payment(Cancelled, PaymentStatus::Pending), PaymentStatus::Pending);
        assert_eq!(settle_payment(Confirmed, PaymentStatus::Paid), PaymentStatus::Paid);
    }
}
