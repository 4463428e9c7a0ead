use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;
use wayfare_core::booking::{
    AmountBreakdown, Booking, BookingDetail, BookingDetailView, BookingFilter, BookingStats,
    BookingStatus, ContactInfo, NewBooking, NewPassenger, PackageSelection, Passenger,
    ServiceSelection, StatusChange, StatusCount,
};
use wayfare_core::flight::FlightSeat;
use wayfare_core::repository::{
    BookingStore, BookingTransaction, RepoError, RepoResult, SeatClaim, SeatLedger,
};
use wayfare_shared::{Masked, PageRequest};

use crate::database::{decode, delete_error, write_error};
use crate::RedisClient;

const BOOKING_COLUMNS: &str = r#"
    id, booking_reference, user_id,
    contact_first_name, contact_last_name, contact_email, contact_phone,
    status, payment_status, trip_type,
    base_amount, baggage_fees, meal_fees, service_package_fees, subtotal,
    discount_amount, tax_amount, final_amount, total_amount,
    promotion_code, cancellation_reason, cancellation_requested_at,
    created_at, updated_at
"#;

const PASSENGER_COLUMNS: &str = "id, booking_id, first_name, last_name, passenger_type, date_of_birth, \
     gender, nationality, citizen_id, passport_number, created_at";

const SEAT_COLUMNS: &str = "id, flight_id, class_id, seat_number, price, is_available";

// ============================================================================
// Rows
// ============================================================================

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_reference: String,
    user_id: Option<Uuid>,
    contact_first_name: String,
    contact_last_name: String,
    contact_email: String,
    contact_phone: String,
    status: String,
    payment_status: String,
    trip_type: String,
    base_amount: i64,
    baggage_fees: i64,
    meal_fees: i64,
    service_package_fees: i64,
    subtotal: i64,
    discount_amount: i64,
    tax_amount: i64,
    final_amount: i64,
    total_amount: i64,
    promotion_code: Option<String>,
    cancellation_reason: Option<String>,
    cancellation_requested_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> RepoResult<Booking> {
        Ok(Booking {
            id: self.id,
            booking_reference: self.booking_reference,
            user_id: self.user_id,
            contact: ContactInfo {
                first_name: self.contact_first_name,
                last_name: self.contact_last_name,
                email: self.contact_email,
                phone: self.contact_phone,
            },
            status: decode(&self.status)?,
            payment_status: decode(&self.payment_status)?,
            trip_type: decode(&self.trip_type)?,
            amounts: AmountBreakdown {
                base_amount: self.base_amount,
                baggage_fees: self.baggage_fees,
                meal_fees: self.meal_fees,
                service_package_fees: self.service_package_fees,
                subtotal: self.subtotal,
                discount_amount: self.discount_amount,
                tax_amount: self.tax_amount,
                final_amount: self.final_amount,
            },
            total_amount: self.total_amount,
            promotion_code: self.promotion_code,
            cancellation_reason: self.cancellation_reason,
            cancellation_requested_at: self.cancellation_requested_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    first_name: String,
    last_name: String,
    passenger_type: String,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    nationality: Option<String>,
    citizen_id: Option<String>,
    passport_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl PassengerRow {
    fn into_passenger(self) -> RepoResult<Passenger> {
        Ok(Passenger {
            id: self.id,
            booking_id: self.booking_id,
            first_name: self.first_name,
            last_name: self.last_name,
            passenger_type: decode(&self.passenger_type)?,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            nationality: self.nationality,
            citizen_id: self.citizen_id.map(Masked::new),
            passport_number: self.passport_number.map(Masked::new),
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    flight_id: Uuid,
    class_id: Uuid,
    seat_number: String,
    price: i64,
    is_available: bool,
}

impl From<SeatRow> for FlightSeat {
    fn from(r: SeatRow) -> Self {
        FlightSeat {
            id: r.id,
            flight_id: r.flight_id,
            class_id: r.class_id,
            seat_number: r.seat_number,
            price: r.price,
            is_available: r.is_available,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailViewRow {
    id: Uuid,
    booking_id: Uuid,
    flight_id: Uuid,
    passenger_id: Uuid,
    seat_id: Option<Uuid>,
    cabin_class: String,
    service_package_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    flight_number: String,
    departure_airport_code: String,
    arrival_airport_code: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    seat_number: Option<String>,
    passenger_name: String,
    passenger_type: String,
}

impl DetailViewRow {
    fn into_view(self) -> RepoResult<BookingDetailView> {
        Ok(BookingDetailView {
            detail: BookingDetail {
                id: self.id,
                booking_id: self.booking_id,
                flight_id: self.flight_id,
                passenger_id: self.passenger_id,
                seat_id: self.seat_id,
                cabin_class: decode(&self.cabin_class)?,
                service_package_id: self.service_package_id,
                created_at: self.created_at,
            },
            flight_number: self.flight_number,
            departure_airport_code: self.departure_airport_code,
            arrival_airport_code: self.arrival_airport_code,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            seat_number: self.seat_number,
            passenger_name: self.passenger_name,
            passenger_type: decode(&self.passenger_type)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ServiceSelectionRow {
    booking_id: Uuid,
    flight_id: Uuid,
    kind: String,
    service_id: Uuid,
    quantity: i32,
    unit_price: i64,
}

#[derive(sqlx::FromRow)]
struct PackageSelectionRow {
    booking_id: Uuid,
    flight_id: Uuid,
    service_package_id: Uuid,
    price_multiplier: f64,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

// ============================================================================
// Transaction
// ============================================================================

pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
    redis: Option<RedisClient>,
    touched_flights: HashSet<Uuid>,
}

#[async_trait]
impl SeatLedger for PgBookingTransaction {
    async fn take_available_seats(
        &mut self,
        flight_id: Uuid,
        class_id: Uuid,
        count: i64,
    ) -> RepoResult<Vec<FlightSeat>> {
        // Rows locked by another booking are skipped rather than waited on.
        let sql = format!(
            r#"
            UPDATE flight_seats SET is_available = FALSE
            WHERE id IN (
                SELECT id FROM flight_seats
                WHERE flight_id = $1 AND class_id = $2 AND is_available
                ORDER BY seat_number
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            SEAT_COLUMNS
        );
        let rows: Vec<SeatRow> = sqlx::query_as(&sql)
            .bind(flight_id)
            .bind(class_id)
            .bind(count.max(0))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepoError::backend)?;

        let mut seats: Vec<FlightSeat> = rows.into_iter().map(FlightSeat::from).collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        if !seats.is_empty() {
            self.touched_flights.insert(flight_id);
        }
        Ok(seats)
    }

    async fn take_seat_by_number(&mut self, flight_id: Uuid, seat_number: &str) -> RepoResult<SeatClaim> {
        let sql = format!(
            "UPDATE flight_seats SET is_available = FALSE \
             WHERE flight_id = $1 AND seat_number = $2 AND is_available RETURNING {}",
            SEAT_COLUMNS
        );
        let claimed: Option<SeatRow> = sqlx::query_as(&sql)
            .bind(flight_id)
            .bind(seat_number)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepoError::backend)?;

        if let Some(row) = claimed {
            self.touched_flights.insert(flight_id);
            return Ok(SeatClaim::Claimed(row.into()));
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM flight_seats WHERE flight_id = $1 AND seat_number = $2)",
        )
        .bind(flight_id)
        .bind(seat_number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(RepoError::backend)?;

        Ok(if exists { SeatClaim::Taken } else { SeatClaim::Missing })
    }

    async fn release_seats(&mut self, seat_ids: &[Uuid]) -> RepoResult<u64> {
        if seat_ids.is_empty() {
            return Ok(0);
        }
        let flights: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE flight_seats SET is_available = TRUE WHERE id = ANY($1) AND NOT is_available RETURNING flight_id",
        )
        .bind(seat_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(RepoError::backend)?;

        let released = flights.len() as u64;
        self.touched_flights.extend(flights);
        Ok(released)
    }
}

#[async_trait]
impl BookingTransaction for PgBookingTransaction {
    async fn reference_taken(&mut self, reference: &str) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE booking_reference = $1)")
            .bind(reference)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(RepoError::backend)
    }

    async fn insert_booking(&mut self, b: &NewBooking) -> RepoResult<()> {
        let a = &b.amounts;
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, booking_reference, user_id,
                contact_first_name, contact_last_name, contact_email, contact_phone,
                status, payment_status, trip_type,
                base_amount, baggage_fees, meal_fees, service_package_fees, subtotal,
                discount_amount, tax_amount, final_amount, total_amount,
                promotion_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 'pending', $8,
                    $9, $10, $11, $12, $13, $14, $15, $16, $16, $17, $18, $18)
            "#,
        )
        .bind(b.id)
        .bind(&b.booking_reference)
        .bind(b.user_id)
        .bind(&b.contact.first_name)
        .bind(&b.contact.last_name)
        .bind(&b.contact.email)
        .bind(&b.contact.phone)
        .bind(b.trip_type.as_str())
        .bind(a.base_amount)
        .bind(a.baggage_fees)
        .bind(a.meal_fees)
        .bind(a.service_package_fees)
        .bind(a.subtotal)
        .bind(a.discount_amount)
        .bind(a.tax_amount)
        .bind(a.final_amount)
        .bind(&b.promotion_code)
        .bind(b.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, &format!("Booking reference {}", b.booking_reference)))?;
        Ok(())
    }

    async fn insert_passenger(&mut self, p: &NewPassenger) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passengers (
                id, booking_id, first_name, last_name, passenger_type, date_of_birth,
                gender, nationality, citizen_id, passport_number, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(p.id)
        .bind(p.booking_id)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(p.passenger_type.as_str())
        .bind(p.date_of_birth)
        .bind(&p.gender)
        .bind(&p.nationality)
        .bind(p.citizen_id.as_ref().map(|c| c.expose().as_str()))
        .bind(p.passport_number.as_ref().map(|c| c.expose().as_str()))
        .bind(p.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Passenger"))?;
        Ok(())
    }

    async fn insert_detail(&mut self, d: &BookingDetail) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_details (
                id, booking_id, flight_id, passenger_id, seat_id, cabin_class, service_package_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(d.id)
        .bind(d.booking_id)
        .bind(d.flight_id)
        .bind(d.passenger_id)
        .bind(d.seat_id)
        .bind(d.cabin_class.as_str())
        .bind(d.service_package_id)
        .bind(d.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Booking detail"))?;
        Ok(())
    }

    async fn insert_service_selection(&mut self, s: &ServiceSelection) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_service_selections (booking_id, flight_id, kind, service_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(s.booking_id)
        .bind(s.flight_id)
        .bind(s.kind.as_str())
        .bind(s.service_id)
        .bind(s.quantity)
        .bind(s.unit_price)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Service selection"))?;
        Ok(())
    }

    async fn insert_package_selection(&mut self, s: &PackageSelection) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_package_selections (booking_id, flight_id, service_package_id, price_multiplier)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(s.booking_id)
        .bind(s.flight_id)
        .bind(s.service_package_id)
        .bind(s.price_multiplier)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Package selection"))?;
        Ok(())
    }

    async fn lock_booking(&mut self, id: Uuid) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepoError::backend)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn update_booking_status(&mut self, change: &StatusChange) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = $2, payment_status = $3, cancellation_reason = $4,
                cancellation_requested_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(change.booking_id)
        .bind(change.status.as_str())
        .bind(change.payment_status.as_str())
        .bind(&change.cancellation_reason)
        .bind(change.cancellation_requested_at)
        .bind(change.at)
        .execute(&mut *self.tx)
        .await
        .map_err(RepoError::backend)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Invalid(format!("Booking not found: {}", change.booking_id)));
        }
        Ok(())
    }

    async fn booking_seat_ids(&mut self, booking_id: Uuid) -> RepoResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT seat_id FROM booking_details WHERE booking_id = $1 AND seat_id IS NOT NULL")
            .bind(booking_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(RepoError::backend)
    }

    async fn detail_count(&mut self, booking_id: Uuid) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM booking_details WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(RepoError::backend)
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| delete_error(e, "Booking"))?;
        Ok(())
    }

    async fn get_passenger(&mut self, booking_id: Uuid, passenger_id: Uuid) -> RepoResult<Option<Passenger>> {
        let sql = format!(
            "SELECT {} FROM passengers WHERE id = $1 AND booking_id = $2 FOR UPDATE",
            PASSENGER_COLUMNS
        );
        let row: Option<PassengerRow> = sqlx::query_as(&sql)
            .bind(passenger_id)
            .bind(booking_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(RepoError::backend)?;
        row.map(PassengerRow::into_passenger).transpose()
    }

    async fn update_passenger(&mut self, p: &Passenger) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE passengers SET
                first_name = $2, last_name = $3, date_of_birth = $4, gender = $5,
                nationality = $6, citizen_id = $7, passport_number = $8
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(p.date_of_birth)
        .bind(&p.gender)
        .bind(&p.nationality)
        .bind(p.citizen_id.as_ref().map(|c| c.expose().as_str()))
        .bind(p.passport_number.as_ref().map(|c| c.expose().as_str()))
        .execute(&mut *self.tx)
        .await
        .map_err(RepoError::backend)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let PgBookingTransaction {
            tx,
            redis,
            touched_flights,
        } = *self;
        tx.commit().await.map_err(RepoError::backend)?;

        // Cached counts for these flights are stale now.
        if let Some(redis) = redis {
            for flight_id in touched_flights {
                if let Err(e) = redis.invalidate_flight(flight_id).await {
                    warn!(%flight_id, "Failed to invalidate availability cache: {}", e);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

pub struct PostgresBookingStore {
    pool: PgPool,
    redis: Option<RedisClient>,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool, redis: Option<RedisClient>) -> Self {
        Self { pool, redis }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTransaction>> {
        let tx = self.pool.begin().await.map_err(RepoError::backend)?;
        debug!("Booking transaction started");
        Ok(Box::new(PgBookingTransaction {
            tx,
            redis: self.redis.clone(),
            touched_flights: HashSet::new(),
        }))
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn get_booking_by_reference(&self, reference: &str) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE booking_reference = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> RepoResult<(Vec<Booking>, u64)> {
        let status = filter.status.map(|s| s.as_str());
        const FILTER: &str = "($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)";

        let count_sql = format!("SELECT COUNT(*) FROM bookings WHERE {}", FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.user_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let sql = format!(
            "SELECT {} FROM bookings WHERE {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            BOOKING_COLUMNS, FILTER
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(filter.user_id)
            .bind(status)
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let bookings = rows.into_iter().map(BookingRow::into_booking).collect::<RepoResult<_>>()?;
        Ok((bookings, total.max(0) as u64))
    }

    async fn booking_details(&self, booking_id: Uuid) -> RepoResult<Vec<BookingDetailView>> {
        let rows: Vec<DetailViewRow> = sqlx::query_as(
            r#"
            SELECT
                d.id, d.booking_id, d.flight_id, d.passenger_id, d.seat_id, d.cabin_class,
                d.service_package_id, d.created_at,
                f.flight_number, dep.code AS departure_airport_code, arr.code AS arrival_airport_code,
                f.departure_time, f.arrival_time,
                s.seat_number,
                p.first_name || ' ' || p.last_name AS passenger_name,
                p.passenger_type
            FROM booking_details d
            JOIN flights f ON f.id = d.flight_id
            JOIN airports dep ON dep.id = f.departure_airport_id
            JOIN airports arr ON arr.id = f.arrival_airport_id
            JOIN passengers p ON p.id = d.passenger_id
            LEFT JOIN flight_seats s ON s.id = d.seat_id
            WHERE d.booking_id = $1
            ORDER BY f.departure_time, d.created_at
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::backend)?;
        rows.into_iter().map(DetailViewRow::into_view).collect()
    }

    async fn booking_passengers(&self, booking_id: Uuid) -> RepoResult<Vec<Passenger>> {
        let sql = format!(
            "SELECT {} FROM passengers WHERE booking_id = $1 ORDER BY created_at",
            PASSENGER_COLUMNS
        );
        let rows: Vec<PassengerRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        rows.into_iter().map(PassengerRow::into_passenger).collect()
    }

    async fn service_selections(&self, booking_id: Uuid) -> RepoResult<Vec<ServiceSelection>> {
        let rows: Vec<ServiceSelectionRow> = sqlx::query_as(
            "SELECT booking_id, flight_id, kind, service_id, quantity, unit_price \
             FROM booking_service_selections WHERE booking_id = $1 ORDER BY flight_id, kind",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::backend)?;

        rows.into_iter()
            .map(|r| {
                Ok(ServiceSelection {
                    booking_id: r.booking_id,
                    flight_id: r.flight_id,
                    kind: decode(&r.kind)?,
                    service_id: r.service_id,
                    quantity: r.quantity,
                    unit_price: r.unit_price,
                })
            })
            .collect()
    }

    async fn package_selections(&self, booking_id: Uuid) -> RepoResult<Vec<PackageSelection>> {
        let rows: Vec<PackageSelectionRow> = sqlx::query_as(
            "SELECT booking_id, flight_id, service_package_id, price_multiplier \
             FROM booking_package_selections WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::backend)?;

        Ok(rows
            .into_iter()
            .map(|r| PackageSelection {
                booking_id: r.booking_id,
                flight_id: r.flight_id,
                service_package_id: r.service_package_id,
                price_multiplier: r.price_multiplier,
            })
            .collect())
    }

    async fn stats(&self) -> RepoResult<BookingStats> {
        let rows: Vec<StatusCountRow> =
            sqlx::query_as("SELECT status, COUNT(*) AS count FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(RepoError::backend)?;

        let mut counts: HashMap<BookingStatus, i64> = HashMap::new();
        for row in rows {
            counts.insert(decode(&row.status)?, row.count);
        }
        let by_status: Vec<StatusCount> = BookingStatus::ALL
            .iter()
            .filter_map(|s| counts.get(s).map(|c| StatusCount { status: *s, count: *c }))
            .collect();

        let confirmed_revenue: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(final_amount), 0)::BIGINT FROM bookings WHERE status IN ('confirmed', 'completed')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::backend)?;

        let total_passengers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passengers")
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        Ok(BookingStats {
            total_bookings: by_status.iter().map(|c| c.count).sum(),
            by_status,
            confirmed_revenue,
            total_passengers,
        })
    }
}
