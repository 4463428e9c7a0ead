//! Admin flight scheduling: creation with seat seeding and the guarded update path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use wayfare_core::flight::{
    seat_rows, seed_seats, CabinClass, Flight, FlightStatus, FlightUpdate, FlightView, NewFlight,
    MAX_SEAT_ROWS,
};
use wayfare_core::reference::Aircraft;
use wayfare_core::repository::{FlightRepository, ReferenceStore};
use wayfare_core::{CoreError, CoreResult};
use wayfare_shared::PageRequest;

use crate::inventory::SeatInventory;
use crate::pricing::PricingEngine;

#[derive(Clone)]
pub struct FlightSchedule {
    flights: Arc<dyn FlightRepository>,
    aircraft: Arc<dyn ReferenceStore<Aircraft>>,
    inventory: SeatInventory,
    engine: Arc<PricingEngine>,
}

impl FlightSchedule {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        aircraft: Arc<dyn ReferenceStore<Aircraft>>,
        engine: Arc<PricingEngine>,
    ) -> Self {
        Self {
            inventory: SeatInventory::new(flights.clone()),
            flights,
            aircraft,
            engine,
        }
    }

    async fn load(&self, id: Uuid) -> CoreResult<FlightView> {
        self.flights
            .get_flight(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Flight not found: {}", id)))
    }

    /// Creates the flight and one seat row per configured aircraft seat.
    pub async fn create_flight(&self, input: NewFlight, now: DateTime<Utc>) -> CoreResult<FlightView> {
        let errors = input.validate();
        if !errors.is_empty() {
            return Err(CoreError::validation(errors));
        }

        let aircraft = self
            .aircraft
            .get(input.aircraft_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Aircraft not found: {}", input.aircraft_id)))?;
        if aircraft.airline_id != input.airline_id {
            return Err(CoreError::BadRequest(
                "Aircraft does not belong to the flight's airline".to_string(),
            ));
        }
        if !seat_rows(aircraft.business_seats, aircraft.economy_seats)
            .is_some_and(|rows| rows <= MAX_SEAT_ROWS)
        {
            return Err(CoreError::BadRequest(format!(
                "Aircraft {} has an unsupported seat layout",
                aircraft.registration
            )));
        }

        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: input.flight_number.trim().to_ascii_uppercase(),
            airline_id: input.airline_id,
            aircraft_id: input.aircraft_id,
            departure_airport_id: input.departure_airport_id,
            arrival_airport_id: input.arrival_airport_id,
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            status: FlightStatus::Scheduled,
            economy_price: input.economy_price,
            business_price: input.business_price,
            flight_type: input.flight_type,
            created_at: now,
            updated_at: now,
        };

        let business = self.inventory.travel_class(CabinClass::Business).await?;
        let economy = self.inventory.travel_class(CabinClass::Economy).await?;
        let seats = seed_seats(
            (
                &business,
                aircraft.business_seats,
                self.engine.class_base_price(&flight, CabinClass::Business),
            ),
            (
                &economy,
                aircraft.economy_seats,
                self.engine.class_base_price(&flight, CabinClass::Economy),
            ),
        );

        self.flights.create_flight(&flight, &seats).await?;
        info!(flight_id = %flight.id, flight_number = %flight.flight_number, seats = seats.len(), "Flight created");
        self.load(flight.id).await
    }

    /// Once a flight has bookings only its status and times may change.
    pub async fn update_flight(&self, id: Uuid, update: FlightUpdate, now: DateTime<Utc>) -> CoreResult<FlightView> {
        let mut flight = self.load(id).await?.flight;

        if update.touches_commercial_fields() && self.flights.flight_has_bookings(id).await? {
            return Err(CoreError::BadRequest(
                "Flight already has bookings; only status and times can be changed".to_string(),
            ));
        }
        let errors = update.validate_against(&flight);
        if !errors.is_empty() {
            return Err(CoreError::validation(errors));
        }

        update.apply(&mut flight, now);
        self.flights.update_flight(&flight).await?;
        info!(flight_id = %id, status = %flight.status, "Flight updated");
        self.load(id).await
    }

    pub async fn list_flights(&self, page: PageRequest) -> CoreResult<(Vec<FlightView>, u64)> {
        Ok(self.flights.list_flights(page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wayfare_core::booking::BookingDetail;
    use wayfare_core::flight::FlightType;
    use wayfare_core::repository::BookingStore;
    use wayfare_core::reference::{AircraftInput, ReferenceEntity};
    use wayfare_store::memory::{FlightFixture, InMemoryStore};

    fn schedule(store: &Arc<InMemoryStore>) -> FlightSchedule {
        FlightSchedule::new(
            store.clone(),
            store.clone(),
            Arc::new(PricingEngine::new(Default::default())),
        )
    }

    #[tokio::test]
    async fn test_create_seeds_seats_from_aircraft() {
        let store = Arc::new(InMemoryStore::new());
        let existing = store.seed_flight(FlightFixture::default()).await;
        let now = Utc::now();

        let aircraft = Aircraft::create(
            Uuid::new_v4(),
            &AircraftInput {
                airline_id: existing.flight.airline_id,
                model: "A350-900".into(),
                registration: "vn-a891".into(),
                business_seats: 8,
                economy_seats: 12,
            },
            now,
        );
        ReferenceStore::<Aircraft>::insert(&*store, &aircraft).await.unwrap();

        let input = NewFlight {
            flight_number: "vn255".into(),
            airline_id: existing.flight.airline_id,
            aircraft_id: aircraft.id,
            departure_airport_id: existing.flight.departure_airport_id,
            arrival_airport_id: existing.flight.arrival_airport_id,
            departure_time: now + Duration::days(10),
            arrival_time: now + Duration::days(10) + Duration::hours(2),
            economy_price: Some(1_300_000),
            business_price: None,
            flight_type: FlightType::Domestic,
        };
        let created = schedule(&store).create_flight(input.clone(), now).await.unwrap();

        assert_eq!(created.flight.flight_number, "VN255");
        let seats = store.seats(created.flight.id).await;
        assert_eq!(seats.len(), 20);
        let business = store.travel_class(CabinClass::Business);
        let business_seats: Vec<_> = seats.iter().filter(|s| s.class_id == business.id).collect();
        assert_eq!(business_seats.len(), 8);
        assert!(business_seats.iter().all(|s| s.price == 2_000_000));

        let oversized = Aircraft {
            id: Uuid::new_v4(),
            registration: "VN-A999".into(),
            economy_seats: 1_000,
            ..aircraft
        };
        ReferenceStore::<Aircraft>::insert(&*store, &oversized).await.unwrap();
        let err = schedule(&store)
            .create_flight(NewFlight { aircraft_id: oversized.id, ..input }, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    async fn book_one_passenger(store: &InMemoryStore, flight: &FlightView) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_detail(&BookingDetail {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            flight_id: flight.flight.id,
            passenger_id: Uuid::new_v4(),
            seat_id: None,
            cabin_class: CabinClass::Economy,
            service_package_id: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_is_guarded_once_booked() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await;
        book_one_passenger(&store, &flight).await;
        let schedule = schedule(&store);

        let price_change = FlightUpdate {
            economy_price: Some(999_000),
            ..Default::default()
        };
        let err = schedule
            .update_flight(flight.flight.id, price_change, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        let delay = FlightUpdate {
            status: Some(FlightStatus::Delayed),
            departure_time: Some(flight.flight.departure_time + Duration::minutes(40)),
            arrival_time: Some(flight.flight.arrival_time + Duration::minutes(40)),
            ..Default::default()
        };
        let updated = schedule.update_flight(flight.flight.id, delay, Utc::now()).await.unwrap();
        assert_eq!(updated.flight.status, FlightStatus::Delayed);
    }
}
