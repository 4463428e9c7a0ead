//! Seat availability, claiming and release.
//!
//! Writes go through a [`SeatLedger`], which is always a booking transaction: a claim that
//! fails part-way is undone by the transaction rolling back.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use wayfare_core::flight::{CabinClass, FlightSeat, FlightView, TravelClass};
use wayfare_core::repository::{FlightRepository, RepoError, SeatClaim, SeatLedger};
use wayfare_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Travel class not found: {0}")]
    ClassNotFound(CabinClass),

    #[error("Not enough {cabin} seats available: requested {requested}, available {available}")]
    InsufficientSeats {
        cabin: CabinClass,
        requested: i64,
        available: i64,
    },

    #[error("Seat {0} does not exist on this flight")]
    SeatMissing(String),

    #[error("Seat {0} is already taken")]
    SeatTaken(String),

    #[error("Seat {seat} is not a {cabin} seat")]
    WrongClass { seat: String, cabin: CabinClass },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::FlightNotFound(_) | InventoryError::ClassNotFound(_) => {
                CoreError::NotFound(err.to_string())
            }
            InventoryError::Repo(e) => e.into(),
            other => CoreError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatAvailability {
    pub flight_id: Uuid,
    pub class_code: CabinClass,
    pub total_seats: i64,
    pub available_seats: i64,
    pub booked_seats: i64,
    pub requested: i64,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassSeatCount {
    pub class_code: CabinClass,
    pub total_seats: i64,
    pub available_seats: i64,
    pub booked_seats: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatSummary {
    pub flight_id: Uuid,
    pub classes: Vec<ClassSeatCount>,
    pub total_seats: i64,
    pub available_seats: i64,
    pub booked_seats: i64,
}

#[derive(Clone)]
pub struct SeatInventory {
    flights: Arc<dyn FlightRepository>,
}

impl SeatInventory {
    pub fn new(flights: Arc<dyn FlightRepository>) -> Self {
        Self { flights }
    }

    pub async fn travel_class(&self, cabin: CabinClass) -> Result<TravelClass, InventoryError> {
        self.flights
            .travel_classes()
            .await?
            .into_iter()
            .find(|c| c.code == cabin)
            .ok_or(InventoryError::ClassNotFound(cabin))
    }

    async fn class_count(&self, flight: &FlightView, cabin: CabinClass) -> Result<ClassSeatCount, InventoryError> {
        let total_seats = flight.configured_seats(cabin);
        let booked_seats = self.flights.count_booked_seats(flight.flight.id, cabin).await?;
        Ok(ClassSeatCount {
            class_code: cabin,
            total_seats,
            available_seats: (total_seats - booked_seats).max(0),
            booked_seats,
        })
    }

    /// Counts are derived from the aircraft's configured cabin sizes, not from seat rows.
    pub async fn check_availability(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        count: i64,
    ) -> Result<SeatAvailability, InventoryError> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or(InventoryError::FlightNotFound(flight_id))?;
        self.travel_class(cabin).await?;

        let counts = self.class_count(&flight, cabin).await?;
        Ok(SeatAvailability {
            flight_id,
            class_code: cabin,
            total_seats: counts.total_seats,
            available_seats: counts.available_seats,
            booked_seats: counts.booked_seats,
            requested: count,
            is_available: counts.available_seats >= count,
        })
    }

    /// Claims `count` seats of `class`, lowest seat numbers first. All or nothing.
    pub async fn allocate_seats<L: SeatLedger + ?Sized>(
        &self,
        ledger: &mut L,
        flight_id: Uuid,
        class: &TravelClass,
        count: i64,
    ) -> Result<Vec<FlightSeat>, InventoryError> {
        if count <= 0 {
            return Ok(Vec::new());
        }

        let seats = ledger.take_available_seats(flight_id, class.id, count).await?;
        let claimed = seats.len() as i64;
        if claimed < count {
            warn!(%flight_id, cabin = %class.code, requested = count, claimed, "Seat allocation short, releasing partial claim");
            let ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
            ledger.release_seats(&ids).await?;
            return Err(InventoryError::InsufficientSeats {
                cabin: class.code,
                requested: count,
                available: claimed,
            });
        }

        info!(%flight_id, cabin = %class.code, count, "Seats allocated");
        Ok(seats)
    }

    /// Claims one named seat, which must belong to `class`.
    pub async fn claim_seat<L: SeatLedger + ?Sized>(
        &self,
        ledger: &mut L,
        flight_id: Uuid,
        class: &TravelClass,
        seat_number: &str,
    ) -> Result<FlightSeat, InventoryError> {
        let seat_number = seat_number.trim().to_ascii_uppercase();
        match ledger.take_seat_by_number(flight_id, &seat_number).await? {
            SeatClaim::Claimed(seat) if seat.class_id == class.id => Ok(seat),
            SeatClaim::Claimed(seat) => {
                ledger.release_seats(&[seat.id]).await?;
                Err(InventoryError::WrongClass {
                    seat: seat_number,
                    cabin: class.code,
                })
            }
            SeatClaim::Taken => Err(InventoryError::SeatTaken(seat_number)),
            SeatClaim::Missing => Err(InventoryError::SeatMissing(seat_number)),
        }
    }

    pub async fn release_seats<L: SeatLedger + ?Sized>(
        &self,
        ledger: &mut L,
        seat_ids: &[Uuid],
    ) -> Result<u64, InventoryError> {
        if seat_ids.is_empty() {
            return Ok(0);
        }
        let released = ledger.release_seats(seat_ids).await?;
        info!(requested = seat_ids.len(), released, "Seats released");
        Ok(released)
    }

    pub async fn flight_seat_summary(&self, flight_id: Uuid) -> Result<SeatSummary, InventoryError> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or(InventoryError::FlightNotFound(flight_id))?;

        let mut classes = Vec::with_capacity(CabinClass::ALL.len());
        for cabin in CabinClass::ALL {
            classes.push(self.class_count(&flight, *cabin).await?);
        }

        Ok(SeatSummary {
            flight_id,
            total_seats: classes.iter().map(|c| c.total_seats).sum(),
            available_seats: classes.iter().map(|c| c.available_seats).sum(),
            booked_seats: classes.iter().map(|c| c.booked_seats).sum(),
            classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::repository::BookingStore;
    use wayfare_store::memory::{FlightFixture, InMemoryStore};

    #[tokio::test]
    async fn test_shortfall_claims_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store
            .seed_flight(FlightFixture { economy_seats: 3, ..Default::default() })
            .await;
        let inventory = SeatInventory::new(store.clone());
        let economy = store.travel_class(CabinClass::Economy);

        let mut tx = store.begin().await.unwrap();
        let err = inventory
            .allocate_seats(&mut *tx, flight.flight.id, &economy, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientSeats { requested: 5, available: 3, .. }));
        tx.commit().await.unwrap();

        let availability = inventory
            .check_availability(flight.flight.id, CabinClass::Economy, 3)
            .await
            .unwrap();
        assert_eq!(availability.available_seats, 3);
        assert!(availability.is_available);
    }

    #[tokio::test]
    async fn test_allocates_lowest_numbers_then_releases() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await;
        let inventory = SeatInventory::new(store.clone());
        let economy = store.travel_class(CabinClass::Economy);
        let flight_id = flight.flight.id;

        let mut tx = store.begin().await.unwrap();
        let seats = inventory.allocate_seats(&mut *tx, flight_id, &economy, 2).await.unwrap();
        tx.commit().await.unwrap();

        let numbers: Vec<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        assert_eq!(numbers, vec!["02A", "02B"]);

        let summary = inventory.flight_seat_summary(flight_id).await.unwrap();
        assert_eq!(summary.booked_seats, 2);
        assert_eq!(summary.total_seats, i64::from(flight.economy_seats + flight.business_seats));

        let mut tx = store.begin().await.unwrap();
        let ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
        assert_eq!(inventory.release_seats(&mut *tx, &ids).await.unwrap(), 2);
        tx.commit().await.unwrap();

        let summary = inventory.flight_seat_summary(flight_id).await.unwrap();
        assert_eq!(summary.booked_seats, 0);
    }

    #[tokio::test]
    async fn test_named_seat_rules() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await;
        let inventory = SeatInventory::new(store.clone());
        let economy = store.travel_class(CabinClass::Economy);
        let flight_id = flight.flight.id;

        let mut tx = store.begin().await.unwrap();
        let seat = inventory.claim_seat(&mut *tx, flight_id, &economy, "02c").await.unwrap();
        assert_eq!(seat.seat_number, "02C");
        assert!(matches!(
            inventory.claim_seat(&mut *tx, flight_id, &economy, "02C").await,
            Err(InventoryError::SeatTaken(_))
        ));
        assert!(matches!(
            inventory.claim_seat(&mut *tx, flight_id, &economy, "99Z").await,
            Err(InventoryError::SeatMissing(_))
        ));
        assert!(matches!(
            inventory.claim_seat(&mut *tx, flight_id, &economy, "01A").await,
            Err(InventoryError::WrongClass { .. })
        ));
        tx.commit().await.unwrap();

        let availability = inventory
            .check_availability(flight_id, CabinClass::Business, 4)
            .await
            .unwrap();
        assert!(availability.is_available);
    }

    #[tokio::test]
    async fn test_unknown_flight() {
        let store = Arc::new(InMemoryStore::new());
        let inventory = SeatInventory::new(store);
        let err = inventory
            .check_availability(Uuid::new_v4(), CabinClass::Economy, 1)
            .await
            .unwrap_err();
        assert!(matches!(CoreError::from(err), CoreError::NotFound(_)));
    }
}
