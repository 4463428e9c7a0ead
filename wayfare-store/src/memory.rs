//! In-process implementation of every repository trait.
//!
//! One mutex guards all tables. A transaction holds the lock for its whole life and works on a
//! copy of the tables: `commit` writes the copy back, dropping the transaction discards it.
//! Reads made through the store while a transaction is open in the same task will wait, so
//! callers read first and then begin.
//!
//! Each transaction copies every table, so write cost grows with the data set. Use it for
//! development and tests; production runs on Postgres.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;
use wayfare_core::booking::{
    Booking, BookingDetail, BookingDetailView, BookingFilter, BookingStats, BookingStatus,
    NewBooking, NewPassenger, PackageSelection, Passenger, PaymentStatus, ServiceSelection,
    StatusChange, StatusCount,
};
use wayfare_core::catalog::{
    AncillaryKind, AncillaryService, DiscountType, PackageType, Promotion, ServicePackage,
};
use wayfare_core::flight::{
    seed_seats, CabinClass, Flight, FlightSeat, FlightStatus, FlightType, FlightView, NewSeat,
    SeatMapEntry, TravelClass,
};
use wayfare_core::notify::{NewContact, ProfileStore};
use wayfare_core::reference::{Aircraft, Airline, Airport, ReferenceEntity};
use wayfare_core::repository::{
    BookingStore, BookingTransaction, FlightRepository, PricingCatalog, ReferenceStore,
    RepoError, RepoResult, SeatClaim, SeatLedger,
};
use wayfare_shared::PageRequest;

const FALLBACK_ECONOMY_PRICE: i64 = 1_000_000;
const FALLBACK_BUSINESS_PRICE: i64 = 2_000_000;

#[derive(Debug, Clone, Default)]
struct Tables {
    airlines: HashMap<Uuid, Airline>,
    airports: HashMap<Uuid, Airport>,
    aircraft: HashMap<Uuid, Aircraft>,
    promotions: HashMap<Uuid, Promotion>,
    flights: HashMap<Uuid, Flight>,
    seats: Vec<FlightSeat>,
    packages: Vec<ServicePackage>,
    ancillaries: Vec<AncillaryService>,
    bookings: HashMap<Uuid, Booking>,
    passengers: Vec<Passenger>,
    details: Vec<BookingDetail>,
    services: Vec<ServiceSelection>,
    package_selections: Vec<PackageSelection>,
    contacts: Vec<NewContact>,
    citizen_ids: HashMap<Uuid, String>,
}

impl Tables {
    fn view(&self, flight: &Flight) -> Option<FlightView> {
        let airline = self.airlines.get(&flight.airline_id)?;
        let from = self.airports.get(&flight.departure_airport_id)?;
        let to = self.airports.get(&flight.arrival_airport_id)?;
        let aircraft = self.aircraft.get(&flight.aircraft_id)?;
        Some(FlightView {
            flight: flight.clone(),
            airline_code: airline.code.clone(),
            airline_name: airline.name.clone(),
            departure_airport_code: from.code.clone(),
            arrival_airport_code: to.code.clone(),
            aircraft_model: aircraft.model.clone(),
            business_seats: aircraft.business_seats,
            economy_seats: aircraft.economy_seats,
        })
    }

    fn check_flight_references(&self, flight: &Flight) -> RepoResult<()> {
        if !self.airlines.contains_key(&flight.airline_id) {
            return Err(RepoError::Invalid(format!("Airline not found: {}", flight.airline_id)));
        }
        if !self.aircraft.contains_key(&flight.aircraft_id) {
            return Err(RepoError::Invalid(format!("Aircraft not found: {}", flight.aircraft_id)));
        }
        for airport in [flight.departure_airport_id, flight.arrival_airport_id] {
            if !self.airports.contains_key(&airport) {
                return Err(RepoError::Invalid(format!("Airport not found: {}", airport)));
            }
        }
        Ok(())
    }

    fn add_flight(&mut self, flight: &Flight, seats: &[NewSeat]) {
        self.flights.insert(flight.id, flight.clone());
        self.seats.extend(seats.iter().map(|s| FlightSeat {
            id: Uuid::new_v4(),
            flight_id: flight.id,
            class_id: s.class_id,
            seat_number: s.seat_number.clone(),
            price: s.price,
            is_available: true,
        }));
    }

    fn airline_id(&mut self, code: &str, now: DateTime<Utc>) -> Uuid {
        if let Some(airline) = self.airlines.values().find(|a| a.code == code) {
            return airline.id;
        }
        let airline = Airline {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("{} Airlines", code),
            country: Some("Vietnam".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let id = airline.id;
        self.airlines.insert(id, airline);
        id
    }

    fn airport_id(&mut self, code: &str, now: DateTime<Utc>) -> Uuid {
        if let Some(airport) = self.airports.values().find(|a| a.code == code) {
            return airport.id;
        }
        let airport = Airport {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("{} International Airport", code),
            city: code.to_string(),
            country: "Vietnam".to_string(),
            timezone: Some("Asia/Ho_Chi_Minh".to_string()),
            created_at: now,
            updated_at: now,
        };
        let id = airport.id;
        self.airports.insert(id, airport);
        id
    }

    fn detail_views(&self, booking_id: Uuid) -> Vec<BookingDetailView> {
        let mut views: Vec<BookingDetailView> = self
            .details
            .iter()
            .filter(|d| d.booking_id == booking_id)
            .filter_map(|d| {
                let flight = self.flights.get(&d.flight_id)?;
                let from = self.airports.get(&flight.departure_airport_id)?;
                let to = self.airports.get(&flight.arrival_airport_id)?;
                let passenger = self.passengers.iter().find(|p| p.id == d.passenger_id)?;
                let seat_number = d
                    .seat_id
                    .and_then(|id| self.seats.iter().find(|s| s.id == id))
                    .map(|s| s.seat_number.clone());
                Some(BookingDetailView {
                    detail: d.clone(),
                    flight_number: flight.flight_number.clone(),
                    departure_airport_code: from.code.clone(),
                    arrival_airport_code: to.code.clone(),
                    departure_time: flight.departure_time,
                    arrival_time: flight.arrival_time,
                    seat_number,
                    passenger_name: format!("{} {}", passenger.first_name, passenger.last_name),
                    passenger_type: passenger.passenger_type,
                })
            })
            .collect();
        views.sort_by_key(|v| v.departure_time);
        views
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

/// Everything `seed_flight` needs to put a bookable flight in the store.
#[derive(Debug, Clone)]
pub struct FlightFixture {
    pub flight_number: String,
    pub airline_code: String,
    pub from: String,
    pub to: String,
    pub economy_seats: i32,
    pub business_seats: i32,
    pub economy_price: Option<i64>,
    pub business_price: Option<i64>,
    pub departure_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: FlightStatus,
}

impl Default for FlightFixture {
    fn default() -> Self {
        let day = Utc::now().date_naive() + Duration::days(7);
        Self {
            flight_number: "VN201".to_string(),
            airline_code: "VN".to_string(),
            from: "HAN".to_string(),
            to: "SGN".to_string(),
            economy_seats: 6,
            business_seats: 4,
            economy_price: Some(1_200_000),
            business_price: Some(2_500_000),
            departure_time: at_hour(day, 8),
            duration_minutes: 125,
            status: FlightStatus::Scheduled,
        }
    }
}

fn at_hour(day: NaiveDate, hour: i64) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN + Duration::hours(hour)).and_utc()
}

pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    economy: TravelClass,
    business: TravelClass,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            economy: TravelClass {
                id: Uuid::new_v4(),
                code: CabinClass::Economy,
                name: "Economy".to_string(),
            },
            business: TravelClass {
                id: Uuid::new_v4(),
                code: CabinClass::Business,
                name: "Business".to_string(),
            },
        }
    }

    pub fn travel_class(&self, cabin: CabinClass) -> TravelClass {
        match cabin {
            CabinClass::Economy => self.economy.clone(),
            CabinClass::Business => self.business.clone(),
        }
    }

    fn cabin_of(&self, class_id: Uuid) -> Option<CabinClass> {
        [&self.economy, &self.business]
            .into_iter()
            .find(|c| c.id == class_id)
            .map(|c| c.code)
    }

    // ========================================================================
    // Seeding and inspection
    // ========================================================================

    /// Adds a flight with its airline, airports, aircraft and seat rows. Airlines and airports
    /// are reused by code.
    pub async fn seed_flight(&self, fixture: FlightFixture) -> FlightView {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;

        let airline_id = tables.airline_id(&fixture.airline_code, now);
        let departure_airport_id = tables.airport_id(&fixture.from, now);
        let arrival_airport_id = tables.airport_id(&fixture.to, now);

        let aircraft = Aircraft {
            id: Uuid::new_v4(),
            airline_id,
            model: "A321neo".to_string(),
            registration: format!("{}-{}", fixture.airline_code, fixture.flight_number),
            business_seats: fixture.business_seats,
            economy_seats: fixture.economy_seats,
            created_at: now,
            updated_at: now,
        };
        tables.aircraft.insert(aircraft.id, aircraft.clone());

        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: fixture.flight_number.clone(),
            airline_id,
            aircraft_id: aircraft.id,
            departure_airport_id,
            arrival_airport_id,
            departure_time: fixture.departure_time,
            arrival_time: fixture.departure_time + Duration::minutes(fixture.duration_minutes),
            status: fixture.status,
            economy_price: fixture.economy_price,
            business_price: fixture.business_price,
            flight_type: FlightType::Domestic,
            created_at: now,
            updated_at: now,
        };
        let seats = seed_seats(
            (
                &self.business,
                fixture.business_seats,
                fixture.business_price.unwrap_or(FALLBACK_BUSINESS_PRICE),
            ),
            (
                &self.economy,
                fixture.economy_seats,
                fixture.economy_price.unwrap_or(FALLBACK_ECONOMY_PRICE),
            ),
        );
        tables.add_flight(&flight, &seats);

        FlightView {
            flight,
            airline_code: fixture.airline_code,
            airline_name: tables
                .airlines
                .get(&airline_id)
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            departure_airport_code: fixture.from,
            arrival_airport_code: fixture.to,
            aircraft_model: aircraft.model,
            business_seats: fixture.business_seats,
            economy_seats: fixture.economy_seats,
        }
    }

    pub async fn insert_ancillary(&self, service: AncillaryService) {
        self.tables.lock().await.ancillaries.push(service);
    }

    pub async fn insert_package(&self, package: ServicePackage) {
        self.tables.lock().await.packages.push(package);
    }

    /// Seat rows of a flight in seat-number order.
    pub async fn seats(&self, flight_id: Uuid) -> Vec<FlightSeat> {
        let tables = self.tables.lock().await;
        let mut seats: Vec<FlightSeat> = tables
            .seats
            .iter()
            .filter(|s| s.flight_id == flight_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        seats
    }

    pub async fn contacts(&self) -> Vec<NewContact> {
        self.tables.lock().await.contacts.clone()
    }

    pub async fn citizen_id(&self, user_id: Uuid) -> Option<String> {
        self.tables.lock().await.citizen_ids.get(&user_id).cloned()
    }

    /// A small, browsable data set for running the API without a database.
    pub async fn seed_demo(&self) {
        let outbound = self.seed_flight(FlightFixture::default()).await;
        self.seed_flight(FlightFixture {
            flight_number: "VN220".to_string(),
            from: "SGN".to_string(),
            to: "HAN".to_string(),
            departure_time: outbound.flight.departure_time + Duration::days(3),
            ..Default::default()
        })
        .await;
        self.seed_flight(FlightFixture {
            flight_number: "VN155".to_string(),
            to: "DAD".to_string(),
            economy_seats: 12,
            business_seats: 4,
            economy_price: Some(890_000),
            business_price: None,
            departure_time: outbound.flight.departure_time + Duration::hours(5),
            duration_minutes: 80,
            ..Default::default()
        })
        .await;

        let now = Utc::now();
        let airline_id = outbound.flight.airline_id;
        let mut tables = self.tables.lock().await;

        for (code, name, cabin, package_type, multiplier) in [
            ("ECO_STD", "Economy Standard", CabinClass::Economy, PackageType::Standard, 1.0),
            ("ECO_PLUS", "Economy Plus", CabinClass::Economy, PackageType::Plus, 1.2),
            ("BUS_STD", "Business Standard", CabinClass::Business, PackageType::Standard, 1.0),
            ("BUS_PLUS", "Business Plus", CabinClass::Business, PackageType::Plus, 1.2),
        ] {
            let baggage_kg = if package_type == PackageType::Plus { 30 } else { 20 };
            tables.packages.push(ServicePackage {
                id: Uuid::new_v4(),
                airline_id,
                name: name.to_string(),
                code: code.to_string(),
                cabin_class: cabin,
                package_type,
                price_multiplier: multiplier,
                included_services: serde_json::json!({ "checked_baggage_kg": baggage_kg }),
                is_active: true,
            });
        }

        for (kind, name, price, weight_kg) in [
            (AncillaryKind::Baggage, "Extra 20kg", 250_000, Some(20)),
            (AncillaryKind::Baggage, "Extra 30kg", 350_000, Some(30)),
            (AncillaryKind::Meal, "Pho bo", 80_000, None),
            (AncillaryKind::Meal, "Vegetarian set", 70_000, None),
        ] {
            tables.ancillaries.push(AncillaryService {
                id: Uuid::new_v4(),
                kind,
                flight_id: None,
                airline_id: Some(airline_id),
                name: name.to_string(),
                description: None,
                price,
                weight_kg,
                is_active: true,
            });
        }

        let promotion = Promotion {
            id: Uuid::new_v4(),
            code: "WELCOME10".to_string(),
            description: Some("10% off the first booking".to_string()),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount: Some(500_000),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(365),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.promotions.insert(promotion.id, promotion);
    }
}

// ============================================================================
// Flights
// ============================================================================

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn search_candidates(
        &self,
        departure_code: &str,
        arrival_code: &str,
        date: NaiveDate,
    ) -> RepoResult<Vec<FlightView>> {
        let tables = self.tables.lock().await;
        let mut found: Vec<FlightView> = tables
            .flights
            .values()
            .filter(|f| f.status != FlightStatus::Cancelled && f.departure_time.date_naive() == date)
            .filter_map(|f| tables.view(f))
            .filter(|v| {
                v.departure_airport_code.eq_ignore_ascii_case(departure_code)
                    && v.arrival_airport_code.eq_ignore_ascii_case(arrival_code)
            })
            .collect();
        found.sort_by_key(|v| v.flight.departure_time);
        Ok(found)
    }

    async fn get_flight(&self, id: Uuid) -> RepoResult<Option<FlightView>> {
        let tables = self.tables.lock().await;
        Ok(tables.flights.get(&id).and_then(|f| tables.view(f)))
    }

    async fn list_flights(&self, page: PageRequest) -> RepoResult<(Vec<FlightView>, u64)> {
        let tables = self.tables.lock().await;
        let mut all: Vec<FlightView> = tables.flights.values().filter_map(|f| tables.view(f)).collect();
        all.sort_by_key(|v| v.flight.departure_time);
        Ok(paginate(all, page))
    }

    async fn travel_classes(&self) -> RepoResult<Vec<TravelClass>> {
        Ok(vec![self.economy.clone(), self.business.clone()])
    }

    async fn seat_map(&self, flight_id: Uuid) -> RepoResult<Vec<SeatMapEntry>> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<SeatMapEntry> = tables
            .seats
            .iter()
            .filter(|s| s.flight_id == flight_id)
            .filter_map(|s| {
                Some(SeatMapEntry {
                    seat_id: s.id,
                    seat_number: s.seat_number.clone(),
                    class_code: self.cabin_of(s.class_id)?,
                    price: s.price,
                    is_available: s.is_available,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        Ok(entries)
    }

    async fn count_booked_seats(&self, flight_id: Uuid, cabin: CabinClass) -> RepoResult<i64> {
        let class_id = self.travel_class(cabin).id;
        let tables = self.tables.lock().await;
        Ok(tables
            .seats
            .iter()
            .filter(|s| s.flight_id == flight_id && s.class_id == class_id && !s.is_available)
            .count() as i64)
    }

    async fn flight_has_bookings(&self, flight_id: Uuid) -> RepoResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.details.iter().any(|d| d.flight_id == flight_id))
    }

    async fn create_flight(&self, flight: &Flight, seats: &[NewSeat]) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        tables.check_flight_references(flight)?;
        tables.add_flight(flight, seats);
        Ok(())
    }

    async fn update_flight(&self, flight: &Flight) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.flights.contains_key(&flight.id) {
            return Err(RepoError::Invalid(format!("Flight not found: {}", flight.id)));
        }
        tables.check_flight_references(flight)?;
        tables.flights.insert(flight.id, flight.clone());
        Ok(())
    }
}

// ============================================================================
// Pricing catalog
// ============================================================================

#[async_trait]
impl PricingCatalog for InMemoryStore {
    async fn service_package(&self, id: Uuid) -> RepoResult<Option<ServicePackage>> {
        let tables = self.tables.lock().await;
        Ok(tables.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn packages_for_airline(&self, airline_id: Uuid) -> RepoResult<Vec<ServicePackage>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .packages
            .iter()
            .filter(|p| p.airline_id == airline_id && p.is_active)
            .cloned()
            .collect())
    }

    async fn flight_ancillary(
        &self,
        flight_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ancillaries
            .iter()
            .find(|s| s.id == service_id && s.kind == kind && s.flight_id == Some(flight_id))
            .cloned())
    }

    async fn airline_ancillary(
        &self,
        airline_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ancillaries
            .iter()
            .find(|s| {
                s.id == service_id
                    && s.kind == kind
                    && s.flight_id.is_none()
                    && s.airline_id == Some(airline_id)
            })
            .cloned())
    }

    async fn flight_ancillaries(&self, flight_id: Uuid, airline_id: Uuid) -> RepoResult<Vec<AncillaryService>> {
        let tables = self.tables.lock().await;
        let own = tables
            .ancillaries
            .iter()
            .filter(|s| s.is_active && s.flight_id == Some(flight_id));
        let catalog = tables
            .ancillaries
            .iter()
            .filter(|s| s.is_active && s.flight_id.is_none() && s.airline_id == Some(airline_id));
        Ok(own.chain(catalog).cloned().collect())
    }

    async fn active_promotion(&self, code: &str, now: DateTime<Utc>) -> RepoResult<Option<Promotion>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .promotions
            .values()
            .find(|p| p.code == code && p.is_applicable(now))
            .cloned())
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Working copy of the tables plus the lock that keeps every other writer out.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

impl MemoryTransaction {
    fn booking_mut(&mut self, id: Uuid) -> RepoResult<&mut Booking> {
        self.work
            .bookings
            .get_mut(&id)
            .ok_or_else(|| RepoError::Invalid(format!("Booking not found: {}", id)))
    }
}

#[async_trait]
impl SeatLedger for MemoryTransaction {
    async fn take_available_seats(
        &mut self,
        flight_id: Uuid,
        class_id: Uuid,
        count: i64,
    ) -> RepoResult<Vec<FlightSeat>> {
        let mut candidates: Vec<&mut FlightSeat> = self
            .work
            .seats
            .iter_mut()
            .filter(|s| s.flight_id == flight_id && s.class_id == class_id && s.is_available)
            .collect();
        candidates.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));

        let mut taken = Vec::new();
        for seat in candidates.into_iter().take(count.max(0) as usize) {
            seat.is_available = false;
            taken.push(seat.clone());
        }
        Ok(taken)
    }

    async fn take_seat_by_number(&mut self, flight_id: Uuid, seat_number: &str) -> RepoResult<SeatClaim> {
        let seat = self
            .work
            .seats
            .iter_mut()
            .find(|s| s.flight_id == flight_id && s.seat_number == seat_number);
        Ok(match seat {
            None => SeatClaim::Missing,
            Some(seat) if !seat.is_available => SeatClaim::Taken,
            Some(seat) => {
                seat.is_available = false;
                SeatClaim::Claimed(seat.clone())
            }
        })
    }

    async fn release_seats(&mut self, seat_ids: &[Uuid]) -> RepoResult<u64> {
        let mut released = 0;
        for seat in self.work.seats.iter_mut().filter(|s| seat_ids.contains(&s.id)) {
            if !seat.is_available {
                seat.is_available = true;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn reference_taken(&mut self, reference: &str) -> RepoResult<bool> {
        Ok(self.work.bookings.values().any(|b| b.booking_reference == reference))
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> RepoResult<()> {
        if self.work.bookings.values().any(|b| b.booking_reference == booking.booking_reference) {
            return Err(RepoError::Duplicate(format!("Booking reference {}", booking.booking_reference)));
        }
        self.work.bookings.insert(
            booking.id,
            Booking {
                id: booking.id,
                booking_reference: booking.booking_reference.clone(),
                user_id: booking.user_id,
                contact: booking.contact.clone(),
                status: BookingStatus::Pending,
                payment_status: PaymentStatus::Pending,
                trip_type: booking.trip_type,
                amounts: booking.amounts,
                total_amount: booking.amounts.final_amount,
                promotion_code: booking.promotion_code.clone(),
                cancellation_reason: None,
                cancellation_requested_at: None,
                created_at: booking.created_at,
                updated_at: booking.created_at,
            },
        );
        Ok(())
    }

    async fn insert_passenger(&mut self, passenger: &NewPassenger) -> RepoResult<()> {
        if !self.work.bookings.contains_key(&passenger.booking_id) {
            return Err(RepoError::Invalid(format!("Booking not found: {}", passenger.booking_id)));
        }
        self.work.passengers.push(Passenger {
            id: passenger.id,
            booking_id: passenger.booking_id,
            first_name: passenger.first_name.clone(),
            last_name: passenger.last_name.clone(),
            passenger_type: passenger.passenger_type,
            date_of_birth: passenger.date_of_birth,
            gender: passenger.gender.clone(),
            nationality: passenger.nationality.clone(),
            citizen_id: passenger.citizen_id.clone(),
            passport_number: passenger.passport_number.clone(),
            created_at: passenger.created_at,
        });
        Ok(())
    }

    async fn insert_detail(&mut self, detail: &BookingDetail) -> RepoResult<()> {
        self.work.details.push(detail.clone());
        Ok(())
    }

    async fn insert_service_selection(&mut self, selection: &ServiceSelection) -> RepoResult<()> {
        self.work.services.push(selection.clone());
        Ok(())
    }

    async fn insert_package_selection(&mut self, selection: &PackageSelection) -> RepoResult<()> {
        self.work.package_selections.push(selection.clone());
        Ok(())
    }

    async fn lock_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.work.bookings.get(&id).cloned())
    }

    async fn update_booking_status(&mut self, change: &StatusChange) -> RepoResult<()> {
        let booking = self.booking_mut(change.booking_id)?;
        booking.status = change.status;
        booking.payment_status = change.payment_status;
        booking.cancellation_reason = change.cancellation_reason.clone();
        booking.cancellation_requested_at = change.cancellation_requested_at;
        booking.updated_at = change.at;
        Ok(())
    }

    async fn booking_seat_ids(&mut self, booking_id: Uuid) -> RepoResult<Vec<Uuid>> {
        Ok(self
            .work
            .details
            .iter()
            .filter(|d| d.booking_id == booking_id)
            .filter_map(|d| d.seat_id)
            .collect())
    }

    async fn detail_count(&mut self, booking_id: Uuid) -> RepoResult<i64> {
        Ok(self.work.details.iter().filter(|d| d.booking_id == booking_id).count() as i64)
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> RepoResult<()> {
        let work = &mut self.work;
        work.bookings.remove(&booking_id);
        work.passengers.retain(|p| p.booking_id != booking_id);
        work.services.retain(|s| s.booking_id != booking_id);
        work.package_selections.retain(|p| p.booking_id != booking_id);
        Ok(())
    }

    async fn get_passenger(&mut self, booking_id: Uuid, passenger_id: Uuid) -> RepoResult<Option<Passenger>> {
        Ok(self
            .work
            .passengers
            .iter()
            .find(|p| p.id == passenger_id && p.booking_id == booking_id)
            .cloned())
    }

    async fn update_passenger(&mut self, passenger: &Passenger) -> RepoResult<()> {
        let row = self
            .work
            .passengers
            .iter_mut()
            .find(|p| p.id == passenger.id)
            .ok_or_else(|| RepoError::Invalid(format!("Passenger not found: {}", passenger.id)))?;
        *row = passenger.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let MemoryTransaction { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, work }))
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn get_booking_by_reference(&self, reference: &str) -> RepoResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.booking_reference == reference)
            .cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> RepoResult<(Vec<Booking>, u64)> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.user_id.map_or(true, |u| b.user_id == Some(u)))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matching, page))
    }

    async fn booking_details(&self, booking_id: Uuid) -> RepoResult<Vec<BookingDetailView>> {
        Ok(self.tables.lock().await.detail_views(booking_id))
    }

    async fn booking_passengers(&self, booking_id: Uuid) -> RepoResult<Vec<Passenger>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .passengers
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn service_selections(&self, booking_id: Uuid) -> RepoResult<Vec<ServiceSelection>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .services
            .iter()
            .filter(|s| s.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn package_selections(&self, booking_id: Uuid) -> RepoResult<Vec<PackageSelection>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .package_selections
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> RepoResult<BookingStats> {
        let tables = self.tables.lock().await;
        let by_status = BookingStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: tables.bookings.values().filter(|b| b.status == *status).count() as i64,
            })
            .filter(|c| c.count > 0)
            .collect();
        Ok(BookingStats {
            total_bookings: tables.bookings.len() as i64,
            by_status,
            confirmed_revenue: tables
                .bookings
                .values()
                .filter(|b| matches!(b.status, BookingStatus::Confirmed | BookingStatus::Completed))
                .map(|b| b.amounts.final_amount)
                .sum(),
            total_passengers: tables.passengers.len() as i64,
        })
    }
}

// ============================================================================
// Reference data
// ============================================================================

trait MemoryTable: ReferenceEntity {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;
    /// Natural key that must stay unique (code or registration).
    fn natural_key(&self) -> String;

    fn check_references(&self, _tables: &Tables) -> RepoResult<()> {
        Ok(())
    }

    fn in_use(_id: Uuid, _tables: &Tables) -> bool {
        false
    }
}

impl MemoryTable for Airline {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.airlines
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.airlines
    }
    fn natural_key(&self) -> String {
        self.code.clone()
    }
    fn in_use(id: Uuid, tables: &Tables) -> bool {
        tables.aircraft.values().any(|a| a.airline_id == id)
            || tables.flights.values().any(|f| f.airline_id == id)
            || tables.packages.iter().any(|p| p.airline_id == id)
            || tables.ancillaries.iter().any(|s| s.airline_id == Some(id))
    }
}

impl MemoryTable for Airport {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.airports
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.airports
    }
    fn natural_key(&self) -> String {
        self.code.clone()
    }
    fn in_use(id: Uuid, tables: &Tables) -> bool {
        tables
            .flights
            .values()
            .any(|f| f.departure_airport_id == id || f.arrival_airport_id == id)
    }
}

impl MemoryTable for Aircraft {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.aircraft
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.aircraft
    }
    fn natural_key(&self) -> String {
        self.registration.clone()
    }
    fn check_references(&self, tables: &Tables) -> RepoResult<()> {
        if tables.airlines.contains_key(&self.airline_id) {
            Ok(())
        } else {
            Err(RepoError::Invalid(format!("Airline not found: {}", self.airline_id)))
        }
    }
    fn in_use(id: Uuid, tables: &Tables) -> bool {
        tables.flights.values().any(|f| f.aircraft_id == id)
    }
}

impl MemoryTable for Promotion {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.promotions
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.promotions
    }
    fn natural_key(&self) -> String {
        self.code.clone()
    }
}

fn check_unique<E: MemoryTable>(tables: &Tables, entity: &E) -> RepoResult<()> {
    let key = entity.natural_key();
    let clash = E::table(tables)
        .values()
        .any(|other| other.id() != entity.id() && other.natural_key().eq_ignore_ascii_case(&key));
    if clash {
        Err(RepoError::Duplicate(format!("{} {}", E::LABEL, key)))
    } else {
        Ok(())
    }
}

#[async_trait]
impl<E: MemoryTable> ReferenceStore<E> for InMemoryStore {
    async fn list(&self, page: PageRequest) -> RepoResult<(Vec<E>, u64)> {
        let tables = self.tables.lock().await;
        let mut all: Vec<E> = E::table(&tables).values().cloned().collect();
        all.sort_by_key(|e| e.natural_key());
        Ok(paginate(all, page))
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<E>> {
        Ok(E::table(&*self.tables.lock().await).get(&id).cloned())
    }

    async fn insert(&self, entity: &E) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        check_unique(&tables, entity)?;
        entity.check_references(&tables)?;
        E::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &E) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if !E::table(&tables).contains_key(&entity.id()) {
            return Err(RepoError::Invalid(format!("{} not found: {}", E::LABEL, entity.id())));
        }
        check_unique(&tables, entity)?;
        entity.check_references(&tables)?;
        E::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().await;
        if E::in_use(id, &tables) {
            return Err(RepoError::InUse(E::LABEL.to_string()));
        }
        Ok(E::table_mut(&mut tables).remove(&id).is_some())
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn update_citizen_id(&self, user_id: Uuid, citizen_id: &str) -> RepoResult<()> {
        self.tables
            .lock()
            .await
            .citizen_ids
            .insert(user_id, citizen_id.to_string());
        Ok(())
    }

    async fn create_contact(&self, contact: &NewContact) -> RepoResult<()> {
        self.tables.lock().await.contacts.push(contact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::booking::{AmountBreakdown, ContactInfo, TripType};

    fn new_booking(reference: &str) -> NewBooking {
        NewBooking {
            id: Uuid::new_v4(),
            booking_reference: reference.to_string(),
            user_id: None,
            contact: ContactInfo {
                first_name: "Lan".into(),
                last_name: "Nguyen".into(),
                email: "lan@example.com".into(),
                phone: "0901234567".into(),
            },
            trip_type: TripType::OneWay,
            amounts: AmountBreakdown::default(),
            promotion_code: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let flight = store.seed_flight(FlightFixture::default()).await;
        let economy = store.travel_class(CabinClass::Economy);

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_booking(&new_booking("ABC234")).await.unwrap();
            let seats = tx.take_available_seats(flight.flight.id, economy.id, 2).await.unwrap();
            assert_eq!(seats.len(), 2);
        }

        assert!(store.seats(flight.flight.id).await.iter().all(|s| s.is_available));
        let (bookings, total) = store
            .list_bookings(&BookingFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(bookings.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_named_seat_claims() {
        let store = InMemoryStore::new();
        let flight = store.seed_flight(FlightFixture::default()).await;

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.take_seat_by_number(flight.flight.id, "01A").await.unwrap(),
            SeatClaim::Claimed(_)
        ));
        assert_eq!(tx.take_seat_by_number(flight.flight.id, "01A").await.unwrap(), SeatClaim::Taken);
        assert_eq!(tx.take_seat_by_number(flight.flight.id, "99Z").await.unwrap(), SeatClaim::Missing);
        tx.commit().await.unwrap();

        assert_eq!(
            store.count_booked_seats(flight.flight.id, CabinClass::Business).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_reference_data_guards() {
        let store = InMemoryStore::new();
        let flight = store.seed_flight(FlightFixture::default()).await;

        let err = ReferenceStore::<Airline>::delete(&store, flight.flight.airline_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InUse(_)));

        let now = Utc::now();
        let duplicate = Airline {
            id: Uuid::new_v4(),
            code: "vn".into(),
            name: "Copy".into(),
            country: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let err = ReferenceStore::<Airline>::insert(&store, &duplicate).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));

        let (airports, total) = ReferenceStore::<Airport>::list(&store, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(airports[0].code, "HAN");
    }

    #[tokio::test]
    async fn test_search_matches_route_and_day() {
        let store = InMemoryStore::new();
        let flight = store.seed_flight(FlightFixture::default()).await;
        store
            .seed_flight(FlightFixture {
                flight_number: "VN999".into(),
                status: FlightStatus::Cancelled,
                ..Default::default()
            })
            .await;
        let day = flight.flight.departure_time.date_naive();

        let found = store.search_candidates("han", "SGN", day).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].flight.id, flight.flight.id);
        assert!(store
            .search_candidates("HAN", "SGN", day + Duration::days(1))
            .await
            .unwrap()
            .is_empty());
    }
}
