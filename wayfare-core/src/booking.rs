use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_shared::Masked;

use crate::catalog::AncillaryKind;
use crate::flight::CabinClass;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    PendingCancellation,
    Cancelled,
    CancellationRejected,
}

text_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    PendingCancellation => "pending_cancellation",
    Cancelled => "cancelled",
    CancellationRejected => "cancellation_rejected",
});

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
    MultiCity,
}

text_enum!(TripType {
    OneWay => "one_way",
    RoundTrip => "round_trip",
    MultiCity => "multi_city",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PassengerType {
    Adult,
    Child,
    Infant,
}

text_enum!(PassengerType {
    Adult => "adult",
    Child => "child",
    Infant => "infant",
});

impl PassengerType {
    /// Infants travel on an adult's lap.
    pub fn occupies_seat(&self) -> bool {
        !matches!(self, PassengerType::Infant)
    }
}

// ============================================================================
// Amounts
// ============================================================================

/// Itemised amounts persisted on every booking.
///
/// `base_amount` excludes the package multiplier; the multiplier's effect is `service_package_fees`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AmountBreakdown {
    pub base_amount: i64,
    pub baggage_fees: i64,
    pub meal_fees: i64,
    pub service_package_fees: i64,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub tax_amount: i64,
    pub final_amount: i64,
}

impl AmountBreakdown {
    pub fn reconciles(&self) -> bool {
        self.subtotal
            == self.base_amount + self.baggage_fees + self.meal_fees + self.service_package_fees
            && self.final_amount
                == self.base_amount + self.baggage_fees + self.meal_fees
                    + self.service_package_fees
                    - self.discount_amount
                    + self.tax_amount
    }
}

// ============================================================================
// Booking rows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    pub user_id: Option<Uuid>,
    pub contact: ContactInfo,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub trip_type: TripType,
    #[serde(flatten)]
    pub amounts: AmountBreakdown,
    pub total_amount: i64,
    pub promotion_code: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub booking_reference: String,
    pub user_id: Option<Uuid>,
    pub contact: ContactInfo,
    pub trip_type: TripType,
    pub amounts: AmountBreakdown,
    pub promotion_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status write performed inside a booking transaction.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub passenger_type: PassengerType,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub citizen_id: Option<Masked<String>>,
    pub passport_number: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPassenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub passenger_type: PassengerType,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub citizen_id: Option<Masked<String>>,
    pub passport_number: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
}

/// Owner-editable identity fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PassengerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub citizen_id: Option<Masked<String>>,
    pub passport_number: Option<Masked<String>>,
}

impl PassengerUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.nationality.is_none()
            && self.citizen_id.is_none()
            && self.passport_number.is_none()
    }

    pub fn apply(&self, passenger: &mut Passenger) {
        if let Some(v) = &self.first_name {
            passenger.first_name = v.trim().to_string();
        }
        if let Some(v) = &self.last_name {
            passenger.last_name = v.trim().to_string();
        }
        if let Some(v) = self.date_of_birth {
            passenger.date_of_birth = Some(v);
        }
        if let Some(v) = &self.gender {
            passenger.gender = Some(v.clone());
        }
        if let Some(v) = &self.nationality {
            passenger.nationality = Some(v.clone());
        }
        if let Some(v) = &self.citizen_id {
            passenger.citizen_id = Some(v.clone());
        }
        if let Some(v) = &self.passport_number {
            passenger.passport_number = Some(v.clone());
        }
    }
}

/// One passenger on one leg. Lap infants have no seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetail {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub seat_id: Option<Uuid>,
    pub cabin_class: CabinClass,
    pub service_package_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Detail row joined with what a booking read-out shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetailView {
    #[serde(flatten)]
    pub detail: BookingDetail,
    pub flight_number: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub seat_number: Option<String>,
    pub passenger_name: String,
    pub passenger_type: PassengerType,
}

/// Normalised add-on line: one row per booking, leg, service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSelection {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub kind: AncillaryKind,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

/// Package chosen for one leg of a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageSelection {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub service_package_id: Uuid,
    pub price_multiplier: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingStats {
    pub total_bookings: i64,
    pub by_status: Vec<StatusCount>,
    pub confirmed_revenue: i64,
    pub total_passengers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_reconciliation() {
        let b = AmountBreakdown {
            base_amount: 1_600_000,
            baggage_fees: 200_000,
            meal_fees: 50_000,
            service_package_fees: 240_000,
            subtotal: 2_090_000,
            discount_amount: 90_000,
            tax_amount: 0,
            final_amount: 2_000_000,
        };
        assert!(b.reconciles());

        let broken = AmountBreakdown {
            final_amount: 1,
            ..b
        };
        assert!(!broken.reconciles());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(BookingStatus::PendingCancellation.as_str(), "pending_cancellation");
        assert_eq!(
            "cancellation_rejected".parse::<BookingStatus>(),
            Ok(BookingStatus::CancellationRejected)
        );
        assert_eq!(
            serde_json::to_value(BookingStatus::PendingCancellation).unwrap(),
            "pending_cancellation"
        );
    }

    #[test]
    fn infants_do_not_take_seats() {
        assert!(PassengerType::Adult.occupies_seat());
        assert!(PassengerType::Child.occupies_seat());
        assert!(!PassengerType::Infant.occupies_seat());
    }
}
