use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FieldError;

const BUSINESS_LETTERS: [char; 4] = ['A', 'C', 'D', 'F'];
const ECONOMY_LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    Business,
}

text_enum!(CabinClass {
    Economy => "economy",
    Business => "business",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    Scheduled,
    Delayed,
    Cancelled,
    Completed,
}

text_enum!(FlightStatus {
    Scheduled => "scheduled",
    Delayed => "delayed",
    Cancelled => "cancelled",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightType {
    Domestic,
    International,
}

text_enum!(FlightType {
    Domestic => "domestic",
    International => "international",
});

/// Economy/business reference row. Seats point at it by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TravelClass {
    pub id: Uuid,
    pub code: CabinClass,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline_id: Uuid,
    pub aircraft_id: Uuid,
    pub departure_airport_id: Uuid,
    pub arrival_airport_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub economy_price: Option<i64>,
    pub business_price: Option<i64>,
    pub flight_type: FlightType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn duration_minutes(&self) -> i64 {
        (self.arrival_time - self.departure_time).num_minutes()
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }

    /// Raw class price column; fallbacks are applied by the pricing engine.
    pub fn class_price(&self, cabin: CabinClass) -> Option<i64> {
        match cabin {
            CabinClass::Economy => self.economy_price,
            CabinClass::Business => self.business_price,
        }
        .filter(|p| *p > 0)
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, FlightStatus::Cancelled | FlightStatus::Completed)
            && !self.has_departed(now)
    }
}

/// A flight joined with the reference data every read path needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub airline_code: String,
    pub airline_name: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub aircraft_model: String,
    pub business_seats: i32,
    pub economy_seats: i32,
}

impl FlightView {
    /// Seat total configured on the aircraft for one cabin.
    pub fn configured_seats(&self, cabin: CabinClass) -> i64 {
        let seats = match cabin {
            CabinClass::Economy => self.economy_seats,
            CabinClass::Business => self.business_seats,
        };
        i64::from(seats.max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightSeat {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub class_id: Uuid,
    pub seat_number: String,
    pub price: i64,
    pub is_available: bool,
}

/// Seat map row for the flight detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatMapEntry {
    pub seat_id: Uuid,
    pub seat_number: String,
    pub class_code: CabinClass,
    pub price: i64,
    pub is_available: bool,
}

/// Seat row to insert when a flight is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeat {
    pub class_id: Uuid,
    pub seat_number: String,
    pub price: i64,
}

/// Two-digit row numbers keep string order equal to cabin order.
pub const MAX_SEAT_ROWS: i32 = 99;

/// Rows needed for a cabin layout, or `None` for negative counts.
pub fn seat_rows(business: i32, economy: i32) -> Option<i32> {
    if business < 0 || economy < 0 {
        return None;
    }
    let rows = |count: i32, per_row: usize| {
        let per_row = per_row as i32;
        count / per_row + i32::from(count % per_row != 0)
    };
    rows(business, BUSINESS_LETTERS.len()).checked_add(rows(economy, ECONOMY_LETTERS.len()))
}

/// Seat rows for a new flight: business rows first (A C D F), then economy rows (A-F).
/// Numbers are zero-padded ("01A") so string order follows cabin order.
pub fn seed_seats(
    business: (&TravelClass, i32, i64),
    economy: (&TravelClass, i32, i64),
) -> Vec<NewSeat> {
    let mut seats = Vec::new();
    let mut row = 0;
    for ((class, count, price), letters) in [
        (business, &BUSINESS_LETTERS[..]),
        (economy, &ECONOMY_LETTERS[..]),
    ] {
        let count = count.max(0) as usize;
        for i in 0..count {
            if i % letters.len() == 0 {
                row += 1;
            }
            seats.push(NewSeat {
                class_id: class.id,
                seat_number: format!("{:02}{}", row, letters[i % letters.len()]),
                price,
            });
        }
    }
    seats
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFlight {
    pub flight_number: String,
    pub airline_id: Uuid,
    pub aircraft_id: Uuid,
    pub departure_airport_id: Uuid,
    pub arrival_airport_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub economy_price: Option<i64>,
    pub business_price: Option<i64>,
    pub flight_type: FlightType,
}

impl NewFlight {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.flight_number.trim().is_empty() {
            errors.push(FieldError::new("flight_number", "flight_number is required"));
        }
        if self.departure_airport_id == self.arrival_airport_id {
            errors.push(FieldError::new("arrival_airport_id", "arrival airport must differ from departure"));
        }
        errors.extend(check_times(self.departure_time, self.arrival_time));
        for (field, price) in [("economy_price", self.economy_price), ("business_price", self.business_price)] {
            if matches!(price, Some(p) if p < 0) {
                errors.push(FieldError::new(field, format!("{} cannot be negative", field)));
            }
        }
        errors
    }
}

fn check_times(departure: DateTime<Utc>, arrival: DateTime<Utc>) -> Option<FieldError> {
    (arrival <= departure).then(|| FieldError::new("arrival_time", "arrival_time must be after departure_time"))
}

/// Partial update. Only `status` and the two times may change once a flight has bookings.
/// The aircraft is fixed at creation because it determines the seat rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightUpdate {
    pub flight_number: Option<String>,
    pub departure_airport_id: Option<Uuid>,
    pub arrival_airport_id: Option<Uuid>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub status: Option<FlightStatus>,
    pub economy_price: Option<i64>,
    pub business_price: Option<i64>,
    pub flight_type: Option<FlightType>,
}

impl FlightUpdate {
    pub fn touches_commercial_fields(&self) -> bool {
        self.flight_number.is_some()
            || self.departure_airport_id.is_some()
            || self.arrival_airport_id.is_some()
            || self.economy_price.is_some()
            || self.business_price.is_some()
            || self.flight_type.is_some()
    }

    pub fn apply(&self, flight: &mut Flight, now: DateTime<Utc>) {
        if let Some(v) = &self.flight_number {
            flight.flight_number = v.clone();
        }
        if let Some(v) = self.departure_airport_id {
            flight.departure_airport_id = v;
        }
        if let Some(v) = self.arrival_airport_id {
            flight.arrival_airport_id = v;
        }
        if let Some(v) = self.departure_time {
            flight.departure_time = v;
        }
        if let Some(v) = self.arrival_time {
            flight.arrival_time = v;
        }
        if let Some(v) = self.status {
            flight.status = v;
        }
        if let Some(v) = self.economy_price {
            flight.economy_price = Some(v);
        }
        if let Some(v) = self.business_price {
            flight.business_price = Some(v);
        }
        if let Some(v) = self.flight_type {
            flight.flight_type = v;
        }
        flight.updated_at = now;
    }

    /// Checks the update against the flight it will be applied to.
    pub fn validate_against(&self, flight: &Flight) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let departure = self.departure_time.unwrap_or(flight.departure_time);
        let arrival = self.arrival_time.unwrap_or(flight.arrival_time);
        errors.extend(check_times(departure, arrival));
        if matches!(&self.flight_number, Some(n) if n.trim().is_empty()) {
            errors.push(FieldError::new("flight_number", "flight_number cannot be blank"));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn class(code: CabinClass) -> TravelClass {
        TravelClass {
            id: Uuid::new_v4(),
            code,
            name: code.to_string(),
        }
    }

    fn flight(departure: DateTime<Utc>) -> Flight {
        Flight {
            id: Uuid::new_v4(),
            flight_number: "WF101".into(),
            airline_id: Uuid::new_v4(),
            aircraft_id: Uuid::new_v4(),
            departure_airport_id: Uuid::new_v4(),
            arrival_airport_id: Uuid::new_v4(),
            departure_time: departure,
            arrival_time: departure + Duration::minutes(125),
            status: FlightStatus::Scheduled,
            economy_price: Some(1_200_000),
            business_price: None,
            flight_type: FlightType::Domestic,
            created_at: departure,
            updated_at: departure,
        }
    }

    #[test]
    fn seed_layout() {
        let business = class(CabinClass::Business);
        let economy = class(CabinClass::Economy);
        let seats = seed_seats((&business, 6, 2_000_000), (&economy, 7, 1_000_000));

        let numbers: Vec<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["01A", "01C", "01D", "01F", "02A", "02C", "03A", "03B", "03C", "03D", "03E", "03F", "04A"]
        );
        assert!(seats[..6].iter().all(|s| s.class_id == business.id && s.price == 2_000_000));
        assert!(seats[6..].iter().all(|s| s.class_id == economy.id));

        let mut sorted = numbers.clone();
        sorted.sort();
        assert_eq!(sorted, numbers);
    }

    #[test]
    fn seat_rows_stay_two_digit() {
        assert_eq!(seat_rows(6, 7), Some(4));
        assert_eq!(seat_rows(0, 594), Some(MAX_SEAT_ROWS));
        assert_eq!(seat_rows(i32::MAX, i32::MAX).map(|r| r > MAX_SEAT_ROWS), Some(true));
        assert_eq!(seat_rows(-1, 10), None);

        let seats = seed_seats(
            (&class(CabinClass::Business), 8, 2_000_000),
            (&class(CabinClass::Economy), 582, 1_000_000),
        );
        assert_eq!(seats.last().map(|s| s.seat_number.as_str()), Some("99F"));
        let numbers: Vec<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        let mut sorted = numbers.clone();
        sorted.sort();
        assert_eq!(sorted, numbers);
    }

    #[test]
    fn duration_and_bookability() {
        let now = Utc::now();
        let mut f = flight(now + Duration::days(2));
        assert_eq!(f.duration_minutes(), 125);
        assert!(f.is_bookable(now));

        f.status = FlightStatus::Cancelled;
        assert!(!f.is_bookable(now));

        let departed = flight(now - Duration::hours(1));
        assert!(!departed.is_bookable(now));
    }

    #[test]
    fn class_price_ignores_unset_and_zero() {
        let mut f = flight(Utc::now());
        assert_eq!(f.class_price(CabinClass::Economy), Some(1_200_000));
        assert_eq!(f.class_price(CabinClass::Business), None);
        f.economy_price = Some(0);
        assert_eq!(f.class_price(CabinClass::Economy), None);
    }

    #[test]
    fn cabin_class_parses_case_insensitively() {
        assert_eq!("Business".parse::<CabinClass>(), Ok(CabinClass::Business));
        assert!("first".parse::<CabinClass>().is_err());
    }

    #[test]
    fn guarded_update_detection() {
        let times_only = FlightUpdate {
            departure_time: Some(Utc::now()),
            status: Some(FlightStatus::Delayed),
            ..Default::default()
        };
        assert!(!times_only.touches_commercial_fields());

        let price = FlightUpdate {
            economy_price: Some(1),
            ..Default::default()
        };
        assert!(price.touches_commercial_fields());
    }

    #[test]
    fn update_times_are_checked_against_current_flight() {
        let f = flight(Utc::now());
        let update = FlightUpdate {
            arrival_time: Some(f.departure_time - Duration::minutes(5)),
            ..Default::default()
        };
        assert_eq!(update.validate_against(&f).len(), 1);
    }
}
