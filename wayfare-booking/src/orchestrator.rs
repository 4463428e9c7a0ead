//! Booking creation, cancellation lifecycle and passenger edits.
//!
//! Every write runs in one [`BookingTransaction`]: seat claims, booking, passengers, details and
//! selections commit together or not at all. Reads needed for pricing and validation happen
//! before the transaction opens. Side effects are queued only after commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use wayfare_catalog::inventory::SeatInventory;
use wayfare_catalog::pricing::{FareTraveller, LegQuote, LegRequest, Quote};
use wayfare_catalog::FareCalculator;
use wayfare_core::booking::{
    AmountBreakdown, Booking, BookingDetail, BookingDetailView, BookingFilter, BookingStats,
    BookingStatus, NewBooking, NewPassenger, PackageSelection, Passenger, PassengerType,
    PassengerUpdate, PaymentStatus, ServiceSelection, StatusChange, TripType,
};
use wayfare_core::catalog::AncillaryKind;
use wayfare_core::flight::{CabinClass, FlightSeat, FlightView, TravelClass};
use wayfare_core::notify::NewContact;
use wayfare_core::repository::{BookingStore, BookingTransaction, FlightRepository};
use wayfare_core::{CoreError, CoreResult};
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CancellationRejectedEvent,
    CancellationRequestedEvent,
};
use wayfare_shared::{Masked, PageRequest, Pagination};

use crate::reference::{generate_reference, normalize_reference};
use crate::request::{CreateBookingRequest, StatusUpdateRequest};
use crate::side_effects::{SideEffect, SideEffectQueue};
use crate::status::{check_transition, passengers_editable, settle_payment, Actor};
use crate::validation::{
    validate_ages, validate_booking, validate_passenger_update, SeatMode, ValidBooking,
};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_passengers: usize,
    pub reference_length: usize,
    pub reference_attempts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_passengers: 9,
            reference_length: 6,
            reference_attempts: 10,
        }
    }
}

/// Who is reading a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Customer(Uuid),
    Admin,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocatedSeat {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub passenger_type: PassengerType,
    pub cabin_class: CabinClass,
    pub seat_id: Option<Uuid>,
    pub seat_number: Option<String>,
}

/// Response to a successful `POST /bookings`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub trip_type: TripType,
    #[serde(flatten)]
    pub amounts: AmountBreakdown,
    pub total_amount: i64,
    pub promotion_code: Option<String>,
    pub allocation_mode: SeatMode,
    pub seats: Vec<AllocatedSeat>,
    pub legs: Vec<LegQuote>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub trip_type: TripType,
    #[serde(flatten)]
    pub quote: Quote,
}

/// A booking with everything hanging off it.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRecord {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
    pub details: Vec<BookingDetailView>,
    pub services: Vec<ServiceSelection>,
    pub packages: Vec<PackageSelection>,
}

/// 1 leg is one-way, A→B→A is a round trip, anything else is multi-city.
pub fn derive_trip_type(flights: &[FlightView]) -> TripType {
    match flights {
        [_] => TripType::OneWay,
        [out, back]
            if out.departure_airport_code == back.arrival_airport_code
                && out.arrival_airport_code == back.departure_airport_code =>
        {
            TripType::RoundTrip
        }
        _ => TripType::MultiCity,
    }
}

#[derive(Clone)]
pub struct BookingOrchestrator {
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingStore>,
    fares: FareCalculator,
    inventory: SeatInventory,
    effects: SideEffectQueue,
    config: OrchestratorConfig,
}

/// Everything the write phase needs, resolved before the transaction opens.
struct PreparedBooking {
    valid: ValidBooking,
    flights: Vec<FlightView>,
    trip_type: TripType,
    quote: Quote,
    classes: HashMap<CabinClass, TravelClass>,
}

impl BookingOrchestrator {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingStore>,
        fares: FareCalculator,
        effects: SideEffectQueue,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inventory: SeatInventory::new(flights.clone()),
            flights,
            bookings,
            fares,
            effects,
            config,
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    async fn load_flights(&self, valid: &ValidBooking, now: DateTime<Utc>) -> CoreResult<Vec<FlightView>> {
        let mut flights = Vec::with_capacity(valid.legs.len());
        for leg in &valid.legs {
            let flight = self
                .flights
                .get_flight(leg.flight_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Flight not found: {}", leg.flight_id)))?;
            if !flight.flight.is_bookable(now) {
                return Err(CoreError::BadRequest(format!(
                    "Flight {} is not open for booking",
                    flight.flight.flight_number
                )));
            }
            flights.push(flight);
        }
        Ok(flights)
    }

    async fn price(&self, valid: &ValidBooking, flights: &[FlightView], now: DateTime<Utc>) -> CoreResult<Quote> {
        let requests: Vec<LegRequest<'_>> = valid
            .legs
            .iter()
            .zip(flights)
            .map(|(leg, flight)| LegRequest {
                flight: &flight.flight,
                travellers: valid
                    .passengers
                    .iter()
                    .map(|p| FareTraveller {
                        passenger_type: p.passenger_type,
                        cabin: valid.cabin_for(p, leg),
                    })
                    .collect(),
                service_package_id: leg.service_package_id,
                baggage: &leg.baggage,
                meals: &leg.meals,
            })
            .collect();
        Ok(self
            .fares
            .quote(&requests, valid.promotion_code.as_deref(), now)
            .await?)
    }

    /// Validation, flight lookup, age checks and pricing. Read-only.
    async fn prepare(&self, req: &CreateBookingRequest, now: DateTime<Utc>) -> CoreResult<PreparedBooking> {
        let valid = validate_booking(req, self.config.max_passengers)?;
        let flights = self.load_flights(&valid, now).await?;

        if let Some(first) = flights.iter().map(|f| f.flight.departure_time).min() {
            let errors = validate_ages(&valid.passengers, first.date_naive());
            if !errors.is_empty() {
                return Err(CoreError::validation(errors));
            }
        }

        let quote = self.price(&valid, &flights, now).await?;
        let mut classes = HashMap::new();
        for cabin in CabinClass::ALL {
            classes.insert(*cabin, self.inventory.travel_class(*cabin).await?);
        }

        Ok(PreparedBooking {
            trip_type: derive_trip_type(&flights),
            valid,
            flights,
            quote,
            classes,
        })
    }

    /// Seats each cabin needs per leg; lap infants need none.
    fn seat_demand(valid: &ValidBooking, leg_index: usize) -> BTreeMap<CabinClass, i64> {
        let leg = &valid.legs[leg_index];
        let mut demand = BTreeMap::new();
        for p in valid.passengers.iter().filter(|p| p.passenger_type.occupies_seat()) {
            *demand.entry(valid.cabin_for(p, leg)).or_insert(0) += 1;
        }
        demand
    }

    /// Early, unlocked availability check so an obviously full flight fails before any write.
    async fn precheck_availability(&self, prepared: &PreparedBooking) -> CoreResult<()> {
        for (i, flight) in prepared.flights.iter().enumerate() {
            for (cabin, count) in Self::seat_demand(&prepared.valid, i) {
                let availability = self
                    .inventory
                    .check_availability(flight.flight.id, cabin, count)
                    .await?;
                if !availability.is_available {
                    return Err(CoreError::BadRequest(format!(
                        "Not enough {} seats on {}: requested {}, available {}",
                        cabin, flight.flight.flight_number, count, availability.available_seats
                    )));
                }
            }
        }
        Ok(())
    }

    async fn claim_reference(&self, tx: &mut dyn BookingTransaction) -> CoreResult<String> {
        for _ in 0..self.config.reference_attempts.max(1) {
            let candidate = generate_reference(self.config.reference_length);
            if !tx.reference_taken(&candidate).await? {
                return Ok(candidate);
            }
            warn!(reference = %candidate, "Booking reference collision, regenerating");
        }
        Err(CoreError::InternalError(
            "Could not generate a unique booking reference".to_string(),
        ))
    }

    /// Seats for one leg, indexed like `valid.passengers`; `None` for lap infants.
    async fn seats_for_leg(
        &self,
        tx: &mut dyn BookingTransaction,
        prepared: &PreparedBooking,
        leg_index: usize,
    ) -> CoreResult<Vec<Option<FlightSeat>>> {
        let valid = &prepared.valid;
        let leg = &valid.legs[leg_index];
        let flight_id = prepared.flights[leg_index].flight.id;
        let mut seats: Vec<Option<FlightSeat>> = vec![None; valid.passengers.len()];

        match valid.seat_mode {
            SeatMode::Manual => {
                for (i, p) in valid.passengers.iter().enumerate() {
                    if !p.passenger_type.occupies_seat() {
                        continue;
                    }
                    let class = self.class(prepared, valid.cabin_for(p, leg))?;
                    let seat_number = p.seat_numbers.get(leg_index).ok_or_else(|| {
                        CoreError::BadRequest(format!("Missing seat for {}", p.full_name()))
                    })?;
                    let seat = self
                        .inventory
                        .claim_seat(&mut *tx, flight_id, class, seat_number)
                        .await?;
                    seats[i] = Some(seat);
                }
            }
            SeatMode::Auto => {
                for (cabin, count) in Self::seat_demand(valid, leg_index) {
                    let class = self.class(prepared, cabin)?;
                    let mut claimed = self
                        .inventory
                        .allocate_seats(&mut *tx, flight_id, class, count)
                        .await?
                        .into_iter();
                    for (i, p) in valid.passengers.iter().enumerate() {
                        if p.passenger_type.occupies_seat() && valid.cabin_for(p, leg) == cabin {
                            seats[i] = claimed.next();
                        }
                    }
                }
            }
        }
        Ok(seats)
    }

    fn class<'a>(&self, prepared: &'a PreparedBooking, cabin: CabinClass) -> CoreResult<&'a TravelClass> {
        prepared
            .classes
            .get(&cabin)
            .ok_or_else(|| CoreError::NotFound(format!("Travel class not found: {}", cabin)))
    }

    /// Prices a booking request without reserving or storing anything.
    pub async fn price_quote(&self, req: &CreateBookingRequest, now: DateTime<Utc>) -> CoreResult<PriceQuote> {
        let prepared = self.prepare(req, now).await?;
        Ok(PriceQuote {
            trip_type: prepared.trip_type,
            quote: prepared.quote,
        })
    }

    pub async fn create_booking(
        &self,
        req: CreateBookingRequest,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CoreResult<BookingConfirmation> {
        let prepared = self.prepare(&req, now).await?;
        if prepared.valid.seat_mode == SeatMode::Auto {
            self.precheck_availability(&prepared).await?;
        }

        let valid = &prepared.valid;
        let amounts = prepared.quote.amounts;
        let booking_id = Uuid::new_v4();

        let mut tx = self.bookings.begin().await?;
        let booking_reference = self.claim_reference(&mut *tx).await?;

        tx.insert_booking(&NewBooking {
            id: booking_id,
            booking_reference: booking_reference.clone(),
            user_id,
            contact: valid.contact.clone(),
            trip_type: prepared.trip_type,
            amounts,
            promotion_code: prepared.quote.promotion_code.clone(),
            created_at: now,
        })
        .await?;

        let mut passenger_ids = Vec::with_capacity(valid.passengers.len());
        for p in &valid.passengers {
            let id = Uuid::new_v4();
            tx.insert_passenger(&NewPassenger {
                id,
                booking_id,
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
                passenger_type: p.passenger_type,
                date_of_birth: Some(p.date_of_birth),
                gender: p.gender.clone(),
                nationality: p.nationality.clone(),
                citizen_id: p.citizen_id.clone(),
                passport_number: p.passport_number.clone(),
                created_at: now,
            })
            .await?;
            passenger_ids.push(id);
        }

        let mut allocated = Vec::with_capacity(valid.passengers.len() * valid.legs.len());
        for (leg_index, (leg, flight)) in valid.legs.iter().zip(&prepared.flights).enumerate() {
            let leg_quote = &prepared.quote.legs[leg_index];
            let package_id = leg_quote.package.as_ref().map(|p| p.id);
            let seats = self.seats_for_leg(&mut *tx, &prepared, leg_index).await?;

            for ((p, passenger_id), seat) in valid.passengers.iter().zip(&passenger_ids).zip(seats) {
                let cabin = valid.cabin_for(p, leg);
                tx.insert_detail(&BookingDetail {
                    id: Uuid::new_v4(),
                    booking_id,
                    flight_id: flight.flight.id,
                    passenger_id: *passenger_id,
                    seat_id: seat.as_ref().map(|s| s.id),
                    cabin_class: cabin,
                    service_package_id: package_id,
                    created_at: now,
                })
                .await?;
                allocated.push(AllocatedSeat {
                    flight_id: flight.flight.id,
                    flight_number: flight.flight.flight_number.clone(),
                    passenger_id: *passenger_id,
                    passenger_name: p.full_name(),
                    passenger_type: p.passenger_type,
                    cabin_class: cabin,
                    seat_id: seat.as_ref().map(|s| s.id),
                    seat_number: seat.map(|s| s.seat_number),
                });
            }

            let mut lines: BTreeMap<(AncillaryKind, Uuid), (i32, i64)> = BTreeMap::new();
            for add_on in &leg_quote.add_ons {
                let line = lines
                    .entry((add_on.kind, add_on.service_id))
                    .or_insert((0, add_on.unit_price));
                line.0 = line.0.checked_add(add_on.quantity).ok_or_else(|| {
                    CoreError::BadRequest(format!("Add-on quantity too large: {}", add_on.service_id))
                })?;
            }
            for ((kind, service_id), (quantity, unit_price)) in lines {
                tx.insert_service_selection(&ServiceSelection {
                    booking_id,
                    flight_id: flight.flight.id,
                    kind,
                    service_id,
                    quantity,
                    unit_price,
                })
                .await?;
            }

            if let Some(package) = &leg_quote.package {
                tx.insert_package_selection(&PackageSelection {
                    booking_id,
                    flight_id: flight.flight.id,
                    service_package_id: package.id,
                    price_multiplier: package.price_multiplier,
                })
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            %booking_id,
            reference = %booking_reference,
            legs = valid.legs.len(),
            passengers = valid.passengers.len(),
            final_amount = amounts.final_amount,
            mode = ?valid.seat_mode,
            "Booking created"
        );

        self.queue_creation_effects(&prepared, booking_id, &booking_reference, user_id, now);

        Ok(BookingConfirmation {
            booking_id,
            booking_reference,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            trip_type: prepared.trip_type,
            amounts,
            total_amount: amounts.final_amount,
            promotion_code: prepared.quote.promotion_code.clone(),
            allocation_mode: valid.seat_mode,
            seats: allocated,
            legs: prepared.quote.legs.clone(),
            created_at: now,
        })
    }

    fn queue_creation_effects(
        &self,
        prepared: &PreparedBooking,
        booking_id: Uuid,
        booking_reference: &str,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) {
        let contact = &prepared.valid.contact;

        if let Some(user_id) = user_id {
            let citizen_id = prepared
                .valid
                .passengers
                .iter()
                .find(|p| p.passenger_type == PassengerType::Adult)
                .and_then(|p| p.citizen_id.clone());
            if let Some(citizen_id) = citizen_id {
                self.effects.enqueue(SideEffect::UpdateCitizenId { user_id, citizen_id });
            }
        }

        self.effects.enqueue(SideEffect::CreateContact(NewContact {
            id: Uuid::new_v4(),
            user_id,
            booking_id,
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            created_at: now,
        }));

        self.effects.enqueue(SideEffect::BookingConfirmation {
            email: Masked::new(contact.email.clone()),
            event: BookingConfirmedEvent {
                booking_id,
                booking_reference: booking_reference.to_string(),
                contact_name: contact.full_name(),
                final_amount: prepared.quote.amounts.final_amount,
                flight_numbers: prepared
                    .flights
                    .iter()
                    .map(|f| f.flight.flight_number.clone())
                    .collect(),
                passenger_count: prepared.valid.passengers.len(),
                created_at: now,
            },
        });
    }

    // ========================================================================
    // Status lifecycle
    // ========================================================================

    async fn lock(&self, tx: &mut dyn BookingTransaction, booking_id: Uuid) -> CoreResult<Booking> {
        tx.lock_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking not found: {}", booking_id)))
    }

    fn ensure_owner(booking: &Booking, user_id: Uuid) -> CoreResult<()> {
        if booking.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden("You do not have access to this booking".to_string()))
        }
    }

    /// Customer asks to cancel. Seats stay held until an admin confirms.
    pub async fn request_cancellation(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Booking> {
        let mut tx = self.bookings.begin().await?;
        let mut booking = self.lock(&mut *tx, booking_id).await?;
        Self::ensure_owner(&booking, user_id)?;
        check_transition(booking.status, BookingStatus::PendingCancellation, Actor::Customer)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let change = StatusChange {
            booking_id,
            status: BookingStatus::PendingCancellation,
            payment_status: booking.payment_status,
            cancellation_reason: reason.clone(),
            cancellation_requested_at: Some(now),
            at: now,
        };
        tx.update_booking_status(&change).await?;
        tx.commit().await?;
        info!(%booking_id, from = %booking.status, "Cancellation requested");

        booking.status = change.status;
        booking.cancellation_reason = reason.clone();
        booking.cancellation_requested_at = Some(now);
        booking.updated_at = now;

        self.effects.enqueue(SideEffect::CancellationRequested {
            email: Masked::new(booking.contact.email.clone()),
            event: CancellationRequestedEvent {
                booking_id,
                booking_reference: booking.booking_reference.clone(),
                reason,
                requested_at: now,
            },
        });
        Ok(booking)
    }

    /// Admin status change. `cancelled` releases every seat in the same transaction.
    pub async fn admin_update_status(
        &self,
        booking_id: Uuid,
        req: &StatusUpdateRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<Booking> {
        let target = req.target_status()?;

        let mut tx = self.bookings.begin().await?;
        let mut booking = self.lock(&mut *tx, booking_id).await?;
        let from = booking.status;

        if target == from {
            // Same status is only meaningful as a payment-only update.
            if req.payment_status.is_none() {
                return Err(CoreError::BadRequest(format!("Booking is already {}", from)));
            }
        } else {
            check_transition(from, target, Actor::Admin)?;
        }

        let requested_payment = req.payment_status.unwrap_or(booking.payment_status);
        let payment_status = settle_payment(target, requested_payment);

        let mut released = 0;
        if target == BookingStatus::Cancelled && from != target {
            let seat_ids = tx.booking_seat_ids(booking_id).await?;
            released = self.inventory.release_seats(&mut *tx, &seat_ids).await?;
        }

        let reason = match req.reason.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => Some(r.to_string()),
            _ => booking.cancellation_reason.clone(),
        };
        tx.update_booking_status(&StatusChange {
            booking_id,
            status: target,
            payment_status,
            cancellation_reason: reason.clone(),
            cancellation_requested_at: booking.cancellation_requested_at,
            at: now,
        })
        .await?;
        tx.commit().await?;
        info!(%booking_id, %from, to = %target, %payment_status, released, "Booking status updated");

        let refunded = booking.payment_status == PaymentStatus::Paid && payment_status == PaymentStatus::Refunded;
        booking.status = target;
        booking.payment_status = payment_status;
        booking.cancellation_reason = reason;
        booking.updated_at = now;

        let email = Masked::new(booking.contact.email.clone());
        match target {
            BookingStatus::Cancelled if from != target => {
                self.effects.enqueue(SideEffect::CancellationConfirmed {
                    email,
                    event: BookingCancelledEvent {
                        booking_id,
                        booking_reference: booking.booking_reference.clone(),
                        released_seats: released as usize,
                        refunded,
                        cancelled_at: now,
                    },
                });
            }
            BookingStatus::CancellationRejected => {
                self.effects.enqueue(SideEffect::CancellationRejected {
                    email,
                    event: CancellationRejectedEvent {
                        booking_id,
                        booking_reference: booking.booking_reference.clone(),
                        rejected_at: now,
                    },
                });
            }
            _ => {}
        }
        Ok(booking)
    }

    // ========================================================================
    // Passenger edits and admin delete
    // ========================================================================

    pub async fn update_passenger(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        user_id: Uuid,
        update: PassengerUpdate,
        now: DateTime<Utc>,
    ) -> CoreResult<Passenger> {
        validate_passenger_update(&update, now.date_naive())?;

        let mut tx = self.bookings.begin().await?;
        let booking = self.lock(&mut *tx, booking_id).await?;
        Self::ensure_owner(&booking, user_id)?;
        if !passengers_editable(booking.status) {
            return Err(CoreError::BadRequest(format!(
                "Passengers of a {} booking cannot be modified",
                booking.status
            )));
        }

        let mut passenger = tx
            .get_passenger(booking_id, passenger_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Passenger not found: {}", passenger_id)))?;
        update.apply(&mut passenger);
        tx.update_passenger(&passenger).await?;
        tx.commit().await?;

        info!(%booking_id, %passenger_id, "Passenger updated");
        Ok(passenger)
    }

    /// Admin hard delete, only for bookings without any detail rows.
    pub async fn delete_booking(&self, booking_id: Uuid) -> CoreResult<()> {
        let mut tx = self.bookings.begin().await?;
        self.lock(&mut *tx, booking_id).await?;

        let details = tx.detail_count(booking_id).await?;
        if details > 0 {
            return Err(CoreError::BadRequest(format!(
                "Booking has {} flight details and cannot be deleted",
                details
            )));
        }
        tx.delete_booking(booking_id).await?;
        tx.commit().await?;
        info!(%booking_id, "Booking deleted");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn record(&self, booking: Booking) -> CoreResult<BookingRecord> {
        let id = booking.id;
        Ok(BookingRecord {
            booking,
            passengers: self.bookings.booking_passengers(id).await?,
            details: self.bookings.booking_details(id).await?,
            services: self.bookings.service_selections(id).await?,
            packages: self.bookings.package_selections(id).await?,
        })
    }

    pub async fn booking_record(&self, booking_id: Uuid, viewer: Viewer) -> CoreResult<BookingRecord> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking not found: {}", booking_id)))?;
        if let Viewer::Customer(user_id) = viewer {
            Self::ensure_owner(&booking, user_id)?;
        }
        self.record(booking).await
    }

    /// Lookup by the human-facing reference; knowing it is the credential.
    pub async fn booking_by_reference(&self, reference: &str) -> CoreResult<BookingRecord> {
        let reference = normalize_reference(reference);
        let booking = self
            .bookings
            .get_booking_by_reference(&reference)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking not found: {}", reference)))?;
        self.record(booking).await
    }

    pub async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> CoreResult<(Vec<Booking>, Pagination)> {
        let (items, total) = self.bookings.list_bookings(filter, page).await?;
        Ok((items, Pagination::new(page, total)))
    }

    pub async fn stats(&self) -> CoreResult<BookingStats> {
        Ok(self.bookings.stats().await?)
    }
}
