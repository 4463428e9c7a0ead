use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use wayfare_shared::PageRequest;

use crate::flight::{CabinClass, FlightView};
use crate::FieldError;

/// `GET /flights/search` query string.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightSearchQuery {
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_date: NaiveDate,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    pub class_code: Option<CabinClass>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_departed: bool,
}

fn default_passengers() -> u32 {
    1
}

impl FlightSearchQuery {
    pub fn cabin(&self) -> CabinClass {
        self.class_code.unwrap_or_default()
    }

    pub fn page_request(&self, default_limit: u32, max_limit: u32) -> PageRequest {
        PageRequest::new(self.page, self.limit, default_limit, max_limit)
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let from = self.departure_airport_code.trim();
        let to = self.arrival_airport_code.trim();
        if from.is_empty() {
            errors.push(FieldError::new("departure_airport_code", "departure_airport_code is required"));
        }
        if to.is_empty() {
            errors.push(FieldError::new("arrival_airport_code", "arrival_airport_code is required"));
        }
        if !from.is_empty() && from.eq_ignore_ascii_case(to) {
            errors.push(FieldError::new("arrival_airport_code", "arrival airport must differ from departure"));
        }
        if self.passengers == 0 {
            errors.push(FieldError::new("passengers", "passengers must be at least 1"));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                errors.push(FieldError::new("min_price", "min_price cannot exceed max_price"));
            }
        }
        errors
    }
}

/// One search hit as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct FlightOption {
    #[serde(flatten)]
    pub flight: FlightView,
    pub class_code: CabinClass,
    pub duration_minutes: i64,
    /// Per-seat price for the searched class before packages and add-ons.
    pub starting_price: i64,
    pub available_seats: i64,
}

/// Drops options that cannot carry the party or fall outside the price band,
/// orders by departure then price, and cuts the requested page.
///
/// Returns the page and the total number of matches before paging.
pub fn select_options(
    options: Vec<FlightOption>,
    query: &FlightSearchQuery,
    page: PageRequest,
    now: DateTime<Utc>,
) -> (Vec<FlightOption>, u64) {
    let mut matches: Vec<FlightOption> = options
        .into_iter()
        .filter(|o| query.include_departed || !o.flight.flight.has_departed(now))
        .filter(|o| o.available_seats >= i64::from(query.passengers))
        .filter(|o| query.min_price.map_or(true, |min| o.starting_price >= min))
        .filter(|o| query.max_price.map_or(true, |max| o.starting_price <= max))
        .collect();

    matches.sort_by(|a, b| {
        a.flight
            .flight
            .departure_time
            .cmp(&b.flight.flight.departure_time)
            .then(a.starting_price.cmp(&b.starting_price))
    });

    let total = matches.len() as u64;
    let page_items = matches
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (page_items, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{Flight, FlightStatus, FlightType};
    use chrono::Duration;
    use uuid::Uuid;

    fn option(departs_in_hours: i64, price: i64, seats: i64) -> FlightOption {
        let now = Utc::now();
        let departure_time = now + Duration::hours(departs_in_hours);
        FlightOption {
            flight: FlightView {
                flight: Flight {
                    id: Uuid::new_v4(),
                    flight_number: "VN201".into(),
                    airline_id: Uuid::new_v4(),
                    aircraft_id: Uuid::new_v4(),
                    departure_airport_id: Uuid::new_v4(),
                    arrival_airport_id: Uuid::new_v4(),
                    departure_time,
                    arrival_time: departure_time + Duration::minutes(125),
                    status: FlightStatus::Scheduled,
                    economy_price: Some(price),
                    business_price: None,
                    flight_type: FlightType::Domestic,
                    created_at: now,
                    updated_at: now,
                },
                airline_code: "VN".into(),
                airline_name: "Vietnam Airlines".into(),
                departure_airport_code: "HAN".into(),
                arrival_airport_code: "SGN".into(),
                aircraft_model: "A321".into(),
                business_seats: 8,
                economy_seats: 180,
            },
            class_code: CabinClass::Economy,
            duration_minutes: 125,
            starting_price: price,
            available_seats: seats,
        }
    }

    fn query() -> FlightSearchQuery {
        serde_json::from_value(serde_json::json!({
            "departure_airport_code": "HAN",
            "arrival_airport_code": "SGN",
            "departure_date": "2026-11-02",
            "passengers": 2
        }))
        .unwrap()
    }

    #[test]
    fn filters_capacity_departed_and_price_band() {
        let mut q = query();
        q.max_price = Some(1_500_000);
        let options = vec![
            option(5, 1_200_000, 10),
            option(-2, 900_000, 10),
            option(6, 1_100_000, 1),
            option(7, 2_000_000, 10),
            option(3, 1_400_000, 2),
        ];

        let (page, total) = select_options(options, &q, PageRequest::default(), Utc::now());
        assert_eq!(total, 2);
        let prices: Vec<i64> = page.iter().map(|o| o.starting_price).collect();
        assert_eq!(prices, vec![1_400_000, 1_200_000]);
    }

    #[test]
    fn pages_after_counting() {
        let options = (1..=5).map(|h| option(h, 1_000_000, 9)).collect();
        let page = PageRequest::new(Some(2), Some(2), 20, 100);
        let (items, total) = select_options(options, &query(), page, Utc::now());
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn query_validation() {
        let mut q = query();
        q.arrival_airport_code = "han".into();
        q.passengers = 0;
        q.min_price = Some(10);
        q.max_price = Some(5);
        assert_eq!(q.validate().len(), 3);
        assert_eq!(query().cabin(), CabinClass::Economy);
    }
}
