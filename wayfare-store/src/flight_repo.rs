use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;
use wayfare_core::flight::{CabinClass, Flight, FlightView, NewSeat, SeatMapEntry, TravelClass};
use wayfare_core::repository::{FlightRepository, RepoError, RepoResult};
use wayfare_shared::PageRequest;

use crate::database::{decode, write_error};
use crate::RedisClient;

const FLIGHT_VIEW_SELECT: &str = r#"
    SELECT
        f.id, f.flight_number, f.airline_id, f.aircraft_id,
        f.departure_airport_id, f.arrival_airport_id,
        f.departure_time, f.arrival_time, f.status,
        f.economy_price, f.business_price, f.flight_type,
        f.created_at, f.updated_at,
        al.code AS airline_code, al.name AS airline_name,
        dep.code AS departure_airport_code, arr.code AS arrival_airport_code,
        ac.model AS aircraft_model, ac.business_seats, ac.economy_seats
    FROM flights f
    JOIN airlines al ON al.id = f.airline_id
    JOIN airports dep ON dep.id = f.departure_airport_id
    JOIN airports arr ON arr.id = f.arrival_airport_id
    JOIN aircraft ac ON ac.id = f.aircraft_id
"#;

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline_id: Uuid,
    aircraft_id: Uuid,
    departure_airport_id: Uuid,
    arrival_airport_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    status: String,
    economy_price: Option<i64>,
    business_price: Option<i64>,
    flight_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    airline_code: String,
    airline_name: String,
    departure_airport_code: String,
    arrival_airport_code: String,
    aircraft_model: String,
    business_seats: i32,
    economy_seats: i32,
}

impl FlightRow {
    fn into_view(self) -> RepoResult<FlightView> {
        Ok(FlightView {
            flight: Flight {
                id: self.id,
                flight_number: self.flight_number,
                airline_id: self.airline_id,
                aircraft_id: self.aircraft_id,
                departure_airport_id: self.departure_airport_id,
                arrival_airport_id: self.arrival_airport_id,
                departure_time: self.departure_time,
                arrival_time: self.arrival_time,
                status: decode(&self.status)?,
                economy_price: self.economy_price,
                business_price: self.business_price,
                flight_type: decode(&self.flight_type)?,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            airline_code: self.airline_code,
            airline_name: self.airline_name,
            departure_airport_code: self.departure_airport_code,
            arrival_airport_code: self.arrival_airport_code,
            aircraft_model: self.aircraft_model,
            business_seats: self.business_seats,
            economy_seats: self.economy_seats,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ClassRow {
    id: Uuid,
    code: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct SeatMapRow {
    seat_id: Uuid,
    seat_number: String,
    class_code: String,
    price: i64,
    is_available: bool,
}

pub struct PostgresFlightRepository {
    pub pool: sqlx::PgPool,
    pub redis: Option<RedisClient>,
    pub cache_ttl_seconds: u64,
}

impl PostgresFlightRepository {
    pub fn new(pool: sqlx::PgPool, redis: Option<RedisClient>, cache_ttl_seconds: u64) -> Self {
        Self {
            pool,
            redis,
            cache_ttl_seconds,
        }
    }

    async fn booked_from_db(&self, flight_id: Uuid, cabin: CabinClass) -> RepoResult<i64> {
        let booked: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM flight_seats s
            JOIN travel_classes tc ON tc.id = s.class_id
            WHERE s.flight_id = $1 AND tc.code = $2 AND NOT s.is_available
            "#,
        )
        .bind(flight_id)
        .bind(cabin.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::backend)?;
        Ok(booked)
    }
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn search_candidates(
        &self,
        departure_code: &str,
        arrival_code: &str,
        date: NaiveDate,
    ) -> RepoResult<Vec<FlightView>> {
        let sql = format!(
            r#"{}
            WHERE dep.code = UPPER($1)
              AND arr.code = UPPER($2)
              AND (f.departure_time AT TIME ZONE 'UTC')::date = $3
              AND f.status <> 'cancelled'
            ORDER BY f.departure_time
            "#,
            FLIGHT_VIEW_SELECT
        );
        let rows: Vec<FlightRow> = sqlx::query_as(&sql)
            .bind(departure_code)
            .bind(arrival_code)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        rows.into_iter().map(FlightRow::into_view).collect()
    }

    async fn get_flight(&self, id: Uuid) -> RepoResult<Option<FlightView>> {
        let sql = format!("{} WHERE f.id = $1", FLIGHT_VIEW_SELECT);
        let row: Option<FlightRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(FlightRow::into_view).transpose()
    }

    async fn list_flights(&self, page: PageRequest) -> RepoResult<(Vec<FlightView>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flights")
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let sql = format!("{} ORDER BY f.departure_time LIMIT $1 OFFSET $2", FLIGHT_VIEW_SELECT);
        let rows: Vec<FlightRow> = sqlx::query_as(&sql)
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let flights = rows.into_iter().map(FlightRow::into_view).collect::<RepoResult<_>>()?;
        Ok((flights, total.max(0) as u64))
    }

    async fn travel_classes(&self) -> RepoResult<Vec<TravelClass>> {
        let rows: Vec<ClassRow> = sqlx::query_as("SELECT id, code, name FROM travel_classes ORDER BY code DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        rows.into_iter()
            .map(|r| {
                Ok(TravelClass {
                    id: r.id,
                    code: decode(&r.code)?,
                    name: r.name,
                })
            })
            .collect()
    }

    async fn seat_map(&self, flight_id: Uuid) -> RepoResult<Vec<SeatMapEntry>> {
        let rows: Vec<SeatMapRow> = sqlx::query_as(
            r#"
            SELECT s.id AS seat_id, s.seat_number, tc.code AS class_code, s.price, s.is_available
            FROM flight_seats s
            JOIN travel_classes tc ON tc.id = s.class_id
            WHERE s.flight_id = $1
            ORDER BY s.seat_number
            "#,
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::backend)?;

        rows.into_iter()
            .map(|r| {
                Ok(SeatMapEntry {
                    seat_id: r.seat_id,
                    seat_number: r.seat_number,
                    class_code: decode(&r.class_code)?,
                    price: r.price,
                    is_available: r.is_available,
                })
            })
            .collect()
    }

    async fn count_booked_seats(&self, flight_id: Uuid, cabin: CabinClass) -> RepoResult<i64> {
        // 1. Cache
        if let Some(redis) = &self.redis {
            match redis.get_booked_seats(flight_id, cabin).await {
                Ok(Some(booked)) => return Ok(booked),
                Ok(None) => {}
                Err(e) => warn!(%flight_id, "Availability cache read failed: {}", e),
            }
        }

        // 2. Database, then repopulate
        let booked = self.booked_from_db(flight_id, cabin).await?;
        if let Some(redis) = &self.redis {
            if let Err(e) = redis
                .set_booked_seats(flight_id, cabin, booked, self.cache_ttl_seconds)
                .await
            {
                warn!(%flight_id, "Availability cache write failed: {}", e);
            }
        }
        Ok(booked)
    }

    async fn flight_has_bookings(&self, flight_id: Uuid) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM booking_details WHERE flight_id = $1)")
            .bind(flight_id)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::backend)
    }

    async fn create_flight(&self, flight: &Flight, seats: &[NewSeat]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(RepoError::backend)?;

        sqlx::query(
            r#"
            INSERT INTO flights (
                id, flight_number, airline_id, aircraft_id, departure_airport_id, arrival_airport_id,
                departure_time, arrival_time, status, economy_price, business_price, flight_type,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.airline_id)
        .bind(flight.aircraft_id)
        .bind(flight.departure_airport_id)
        .bind(flight.arrival_airport_id)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.status.as_str())
        .bind(flight.economy_price)
        .bind(flight.business_price)
        .bind(flight.flight_type.as_str())
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Flight"))?;

        let ids: Vec<Uuid> = seats.iter().map(|_| Uuid::new_v4()).collect();
        let flight_ids: Vec<Uuid> = vec![flight.id; seats.len()];
        let class_ids: Vec<Uuid> = seats.iter().map(|s| s.class_id).collect();
        let numbers: Vec<String> = seats.iter().map(|s| s.seat_number.clone()).collect();
        let prices: Vec<i64> = seats.iter().map(|s| s.price).collect();

        sqlx::query(
            r#"
            INSERT INTO flight_seats (id, flight_id, class_id, seat_number, price)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[], $5::bigint[])
            "#,
        )
        .bind(&ids)
        .bind(&flight_ids)
        .bind(&class_ids)
        .bind(&numbers)
        .bind(&prices)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Seat"))?;

        tx.commit().await.map_err(RepoError::backend)?;
        Ok(())
    }

    async fn update_flight(&self, flight: &Flight) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flights SET
                flight_number = $2, departure_airport_id = $3, arrival_airport_id = $4,
                departure_time = $5, arrival_time = $6, status = $7,
                economy_price = $8, business_price = $9, flight_type = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.departure_airport_id)
        .bind(flight.arrival_airport_id)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.status.as_str())
        .bind(flight.economy_price)
        .bind(flight.business_price)
        .bind(flight.flight_type.as_str())
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Flight"))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Invalid(format!("Flight not found: {}", flight.id)));
        }
        Ok(())
    }
}
