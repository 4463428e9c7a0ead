//! Persistence seams. Postgres and in-memory implementations live in `wayfare-store`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use wayfare_shared::PageRequest;

use crate::booking::{
    Booking, BookingDetail, BookingDetailView, BookingFilter, BookingStats, NewBooking,
    NewPassenger, PackageSelection, Passenger, ServiceSelection, StatusChange,
};
use crate::catalog::{AncillaryKind, AncillaryService, Promotion, ServicePackage};
use crate::flight::{CabinClass, Flight, FlightSeat, FlightView, NewSeat, SeatMapEntry, TravelClass};
use crate::reference::ReferenceEntity;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Delete blocked by rows that still point at the record.
    #[error("{0} is still referenced")]
    InUse(String),
    #[error("{0} already exists")]
    Duplicate(String),
    /// Write pointed at a record that does not exist.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RepoError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Flight reads plus the admin write path.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Non-cancelled flights between two airports departing on `date` (UTC day).
    async fn search_candidates(
        &self,
        departure_code: &str,
        arrival_code: &str,
        date: NaiveDate,
    ) -> RepoResult<Vec<FlightView>>;

    async fn get_flight(&self, id: Uuid) -> RepoResult<Option<FlightView>>;

    async fn list_flights(&self, page: PageRequest) -> RepoResult<(Vec<FlightView>, u64)>;

    async fn travel_classes(&self) -> RepoResult<Vec<TravelClass>>;

    async fn seat_map(&self, flight_id: Uuid) -> RepoResult<Vec<SeatMapEntry>>;

    /// Seat rows of `cabin` on the flight that are no longer available.
    async fn count_booked_seats(&self, flight_id: Uuid, cabin: CabinClass) -> RepoResult<i64>;

    async fn flight_has_bookings(&self, flight_id: Uuid) -> RepoResult<bool>;

    async fn create_flight(&self, flight: &Flight, seats: &[NewSeat]) -> RepoResult<()>;

    async fn update_flight(&self, flight: &Flight) -> RepoResult<()>;
}

/// Read-only lookups used while pricing.
#[async_trait]
pub trait PricingCatalog: Send + Sync {
    async fn service_package(&self, id: Uuid) -> RepoResult<Option<ServicePackage>>;

    async fn packages_for_airline(&self, airline_id: Uuid) -> RepoResult<Vec<ServicePackage>>;

    /// Add-on row scoped to one flight.
    async fn flight_ancillary(
        &self,
        flight_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>>;

    /// Airline-wide catalog row, consulted when no flight-scoped row matches.
    async fn airline_ancillary(
        &self,
        airline_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>>;

    /// Active add-ons offered on a flight: its own rows followed by the airline catalog.
    async fn flight_ancillaries(
        &self,
        flight_id: Uuid,
        airline_id: Uuid,
    ) -> RepoResult<Vec<AncillaryService>>;

    /// Promotion with this (normalised) code that is active and inside its window at `now`.
    async fn active_promotion(&self, code: &str, now: DateTime<Utc>) -> RepoResult<Option<Promotion>>;
}

/// Result of trying to claim one named seat.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatClaim {
    Claimed(FlightSeat),
    Taken,
    Missing,
}

/// Seat availability writes. Always runs inside a transaction.
#[async_trait]
pub trait SeatLedger: Send {
    /// Atomically flips up to `count` available seats of the class, lowest seat number first,
    /// and returns the rows it flipped. May return fewer than requested.
    async fn take_available_seats(
        &mut self,
        flight_id: Uuid,
        class_id: Uuid,
        count: i64,
    ) -> RepoResult<Vec<FlightSeat>>;

    async fn take_seat_by_number(&mut self, flight_id: Uuid, seat_number: &str) -> RepoResult<SeatClaim>;

    /// Returns the number of seats flipped back to available.
    async fn release_seats(&mut self, seat_ids: &[Uuid]) -> RepoResult<u64>;
}

/// Unit of work over bookings. Dropping it without `commit` rolls everything back.
#[async_trait]
pub trait BookingTransaction: SeatLedger {
    async fn reference_taken(&mut self, reference: &str) -> RepoResult<bool>;

    async fn insert_booking(&mut self, booking: &NewBooking) -> RepoResult<()>;

    async fn insert_passenger(&mut self, passenger: &NewPassenger) -> RepoResult<()>;

    async fn insert_detail(&mut self, detail: &BookingDetail) -> RepoResult<()>;

    async fn insert_service_selection(&mut self, selection: &ServiceSelection) -> RepoResult<()>;

    async fn insert_package_selection(&mut self, selection: &PackageSelection) -> RepoResult<()>;

    /// Reads the booking and holds it against concurrent status writes until commit.
    async fn lock_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn update_booking_status(&mut self, change: &StatusChange) -> RepoResult<()>;

    async fn booking_seat_ids(&mut self, booking_id: Uuid) -> RepoResult<Vec<Uuid>>;

    async fn detail_count(&mut self, booking_id: Uuid) -> RepoResult<i64>;

    async fn delete_booking(&mut self, booking_id: Uuid) -> RepoResult<()>;

    async fn get_passenger(&mut self, booking_id: Uuid, passenger_id: Uuid) -> RepoResult<Option<Passenger>>;

    async fn update_passenger(&mut self, passenger: &Passenger) -> RepoResult<()>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTransaction>>;

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn get_booking_by_reference(&self, reference: &str) -> RepoResult<Option<Booking>>;

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> RepoResult<(Vec<Booking>, u64)>;

    async fn booking_details(&self, booking_id: Uuid) -> RepoResult<Vec<BookingDetailView>>;

    async fn booking_passengers(&self, booking_id: Uuid) -> RepoResult<Vec<Passenger>>;

    async fn service_selections(&self, booking_id: Uuid) -> RepoResult<Vec<ServiceSelection>>;

    async fn package_selections(&self, booking_id: Uuid) -> RepoResult<Vec<PackageSelection>>;

    async fn stats(&self) -> RepoResult<BookingStats>;
}

/// Uniform CRUD over admin reference data.
#[async_trait]
pub trait ReferenceStore<E: ReferenceEntity>: Send + Sync {
    async fn list(&self, page: PageRequest) -> RepoResult<(Vec<E>, u64)>;

    async fn get(&self, id: Uuid) -> RepoResult<Option<E>>;

    async fn insert(&self, entity: &E) -> RepoResult<()>;

    async fn update(&self, entity: &E) -> RepoResult<()>;

    /// Returns false when nothing had that id.
    async fn delete(&self, id: Uuid) -> RepoResult<bool>;
}
