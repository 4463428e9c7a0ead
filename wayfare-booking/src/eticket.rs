//! Printable ticket view of a booking, keyed by its reference.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use wayfare_core::booking::{BookingStatus, PassengerType, PaymentStatus};
use wayfare_core::flight::CabinClass;
use wayfare_core::{CoreError, CoreResult};
use wayfare_shared::pii::mask_email;

use crate::orchestrator::BookingRecord;

#[derive(Debug, Clone, Serialize)]
pub struct TicketSegment {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub passenger_name: String,
    pub passenger_type: PassengerType,
    pub cabin_class: CabinClass,
    pub seat_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketPassenger {
    pub name: String,
    pub passenger_type: PassengerType,
    /// Last four characters of the travel document.
    pub document: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ETicket {
    pub booking_reference: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub contact_name: String,
    pub contact_email: String,
    pub passengers: Vec<TicketPassenger>,
    pub segments: Vec<TicketSegment>,
    pub final_amount: i64,
    pub issued_at: DateTime<Utc>,
}

impl ETicket {
    pub fn from_record(record: &BookingRecord, issued_at: DateTime<Utc>) -> CoreResult<Self> {
        let booking = &record.booking;
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::BadRequest(format!(
                "Booking {} is cancelled and has no valid ticket",
                booking.booking_reference
            )));
        }

        let passengers = record
            .passengers
            .iter()
            .map(|p| TicketPassenger {
                name: format!("{} {}", p.first_name, p.last_name),
                passenger_type: p.passenger_type,
                document: p
                    .passport_number
                    .as_ref()
                    .or(p.citizen_id.as_ref())
                    .map(|d| d.partial(4)),
            })
            .collect();

        let mut segments: Vec<TicketSegment> = record
            .details
            .iter()
            .map(|d| TicketSegment {
                flight_id: d.detail.flight_id,
                flight_number: d.flight_number.clone(),
                departure_airport_code: d.departure_airport_code.clone(),
                arrival_airport_code: d.arrival_airport_code.clone(),
                departure_time: d.departure_time,
                arrival_time: d.arrival_time,
                passenger_name: d.passenger_name.clone(),
                passenger_type: d.passenger_type,
                cabin_class: d.detail.cabin_class,
                seat_number: d.seat_number.clone(),
            })
            .collect();
        segments.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.passenger_name.cmp(&b.passenger_name))
        });

        Ok(Self {
            booking_reference: booking.booking_reference.clone(),
            status: booking.status,
            payment_status: booking.payment_status,
            contact_name: booking.contact.full_name(),
            contact_email: mask_email(&booking.contact.email),
            passengers,
            segments,
            final_amount: booking.amounts.final_amount,
            issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::booking::{AmountBreakdown, Booking, ContactInfo, Passenger, TripType};
    use wayfare_shared::Masked;

    fn record(status: BookingStatus) -> BookingRecord {
        let now = Utc::now();
        let booking_id = Uuid::new_v4();
        BookingRecord {
            booking: Booking {
                id: booking_id,
                booking_reference: "K7QX2M".into(),
                user_id: None,
                contact: ContactInfo {
                    first_name: "Lan".into(),
                    last_name: "Nguyen".into(),
                    email: "lan@example.com".into(),
                    phone: "0901234567".into(),
                },
                status,
                payment_status: PaymentStatus::Paid,
                trip_type: TripType::OneWay,
                amounts: AmountBreakdown {
                    base_amount: 1_200_000,
                    subtotal: 1_200_000,
                    final_amount: 1_200_000,
                    ..Default::default()
                },
                total_amount: 1_200_000,
                promotion_code: None,
                cancellation_reason: None,
                cancellation_requested_at: None,
                created_at: now,
                updated_at: now,
            },
            passengers: vec![Passenger {
                id: Uuid::new_v4(),
                booking_id,
                first_name: "Lan".into(),
                last_name: "Nguyen".into(),
                passenger_type: PassengerType::Adult,
                date_of_birth: None,
                gender: None,
                nationality: None,
                citizen_id: Some(Masked::new("079090001234".into())),
                passport_number: None,
                created_at: now,
            }],
            details: Vec::new(),
            services: Vec::new(),
            packages: Vec::new(),
        }
    }

    #[test]
    fn test_ticket_masks_documents() {
        let ticket = ETicket::from_record(&record(BookingStatus::Confirmed), Utc::now()).unwrap();
        let document = ticket.passengers[0].document.as_deref().unwrap();
        assert!(document.ends_with("1234"));
        assert!(!document.contains("0790"));
        assert_ne!(ticket.contact_email, "lan@example.com");
    }

    #[test]
    fn test_cancelled_booking_has_no_ticket() {
        assert!(ETicket::from_record(&record(BookingStatus::Cancelled), Utc::now()).is_err());
    }
}
