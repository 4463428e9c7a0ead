//! JSON bodies accepted by the booking endpoints.
//!
//! Enumerated fields arrive as plain strings so bad values are reported through the
//! validation detail list instead of a generic deserialisation failure.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use wayfare_catalog::AddOnSelection;
use wayfare_core::booking::{BookingStatus, PaymentStatus};
use wayfare_core::{CoreError, CoreResult};
use wayfare_shared::Masked;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Option<Uuid>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryLeg>,
    #[serde(default)]
    pub passengers: Vec<PassengerInput>,
    pub contact_info: Option<ContactInput>,
    pub promotion_code: Option<String>,
    pub class_type: Option<String>,
    pub service_package_id: Option<Uuid>,
    #[serde(default)]
    pub baggage_options: Vec<AddOnSelection>,
    #[serde(default)]
    pub meal_options: Vec<AddOnSelection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItineraryLeg {
    pub flight_id: Uuid,
    pub class_type: Option<String>,
    pub service_package_id: Option<Uuid>,
    #[serde(default)]
    pub baggage_options: Vec<AddOnSelection>,
    #[serde(default)]
    pub meal_options: Vec<AddOnSelection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PassengerInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub passenger_type: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub citizen_id: Option<Masked<String>>,
    pub passport_number: Option<Masked<String>>,
    pub travel_class: Option<String>,
    /// Chosen seat on a single-flight booking.
    pub seat_number: Option<String>,
    /// Chosen seat per itinerary leg, in leg order.
    #[serde(default)]
    pub seat_numbers: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancellationRequest {
    pub reason: Option<String>,
}

/// `PATCH /admin/bookings/{id}/status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<BookingStatus>,
    /// `reject_cancellation` is the only action.
    pub action: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub reason: Option<String>,
}

impl StatusUpdateRequest {
    pub fn target_status(&self) -> CoreResult<BookingStatus> {
        match self.action.as_deref().map(str::trim) {
            Some("reject_cancellation") => Ok(BookingStatus::CancellationRejected),
            Some(other) => Err(CoreError::BadRequest(format!("Unknown action '{}'", other))),
            None => self
                .status
                .ok_or_else(|| CoreError::BadRequest("status or action is required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_action_wins_over_status() {
        let req: StatusUpdateRequest = serde_json::from_value(serde_json::json!({
            "action": "reject_cancellation",
            "status": "cancelled"
        }))
        .unwrap();
        assert_eq!(req.target_status().unwrap(), BookingStatus::CancellationRejected);

        let empty = StatusUpdateRequest::default();
        assert!(empty.target_status().is_err());
    }

    #[test]
    fn test_booking_body_shape() {
        let req: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "flight_id": "6f1c2f8e-3f3a-4b71-9a0e-6a3c2a1f0d11",
            "passengers": [{
                "first_name": "Lan",
                "last_name": "Nguyen",
                "passenger_type": "adult",
                "date_of_birth": "1990-04-12",
                "citizen_id": "079090001234"
            }],
            "contact_info": {"first_name": "Lan", "last_name": "Nguyen", "email": "lan@example.com", "phone": "0901234567"},
            "baggage_options": [{"service_id": "0b7e4a52-54a4-4f0e-8f0c-0d6f7d1a9c22"}]
        }))
        .unwrap();
        assert_eq!(req.passengers.len(), 1);
        assert_eq!(req.baggage_options[0].quantity, 1);
        assert_eq!(format!("{:?}", req.passengers[0].citizen_id), "Some(********)");
    }
}
