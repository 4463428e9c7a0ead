//! One generic repository serves airlines, airports, aircraft and promotions. Each entity
//! describes its table through [`PgEntity`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use wayfare_core::catalog::Promotion;
use wayfare_core::reference::{Aircraft, Airline, Airport, ReferenceEntity};
use wayfare_core::repository::{ReferenceStore, RepoError, RepoResult};
use wayfare_shared::PageRequest;

use crate::database::{decode, delete_error, write_error};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

trait PgEntity: ReferenceEntity {
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    const ORDER_BY: &'static str;

    type Row: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin;

    fn from_row(row: Self::Row) -> RepoResult<Self>;
    fn insert_query(&self) -> PgQuery<'_>;
    fn update_query(&self) -> PgQuery<'_>;
}

pub struct PostgresReferenceRepository {
    pool: PgPool,
}

impl PostgresReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<E: PgEntity> ReferenceStore<E> for PostgresReferenceRepository {
    async fn list(&self, page: PageRequest) -> RepoResult<(Vec<E>, u64)> {
        let count_sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} LIMIT $1 OFFSET $2",
            E::COLUMNS,
            E::TABLE,
            E::ORDER_BY
        );
        let rows: Vec<E::Row> = sqlx::query_as(&sql)
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;

        let items = rows.into_iter().map(E::from_row).collect::<RepoResult<_>>()?;
        Ok((items, total.max(0) as u64))
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<E>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", E::COLUMNS, E::TABLE);
        let row: Option<E::Row> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(E::from_row).transpose()
    }

    async fn insert(&self, entity: &E) -> RepoResult<()> {
        entity
            .insert_query()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, E::LABEL))?;
        Ok(())
    }

    async fn update(&self, entity: &E) -> RepoResult<()> {
        let result = entity
            .update_query()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, E::LABEL))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Invalid(format!("{} not found: {}", E::LABEL, entity.id())));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| delete_error(e, E::LABEL))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Airline
// ============================================================================

#[derive(sqlx::FromRow)]
struct AirlineRow {
    id: Uuid,
    code: String,
    name: String,
    country: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgEntity for Airline {
    const TABLE: &'static str = "airlines";
    const COLUMNS: &'static str = "id, code, name, country, is_active, created_at, updated_at";
    const ORDER_BY: &'static str = "code";
    type Row = AirlineRow;

    fn from_row(r: AirlineRow) -> RepoResult<Self> {
        Ok(Airline {
            id: r.id,
            code: r.code,
            name: r.name,
            country: r.country,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }

    fn insert_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "INSERT INTO airlines (id, code, name, country, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.name)
        .bind(&self.country)
        .bind(self.is_active)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "UPDATE airlines SET code = $2, name = $3, country = $4, is_active = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.name)
        .bind(&self.country)
        .bind(self.is_active)
        .bind(self.updated_at)
    }
}

// ============================================================================
// Airport
// ============================================================================

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: Uuid,
    code: String,
    name: String,
    city: String,
    country: String,
    timezone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgEntity for Airport {
    const TABLE: &'static str = "airports";
    const COLUMNS: &'static str = "id, code, name, city, country, timezone, created_at, updated_at";
    const ORDER_BY: &'static str = "code";
    type Row = AirportRow;

    fn from_row(r: AirportRow) -> RepoResult<Self> {
        Ok(Airport {
            id: r.id,
            code: r.code,
            name: r.name,
            city: r.city,
            country: r.country,
            timezone: r.timezone,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }

    fn insert_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "INSERT INTO airports (id, code, name, city, country, timezone, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.name)
        .bind(&self.city)
        .bind(&self.country)
        .bind(&self.timezone)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "UPDATE airports SET code = $2, name = $3, city = $4, country = $5, timezone = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.name)
        .bind(&self.city)
        .bind(&self.country)
        .bind(&self.timezone)
        .bind(self.updated_at)
    }
}

// ============================================================================
// Aircraft
// ============================================================================

#[derive(sqlx::FromRow)]
struct AircraftRow {
    id: Uuid,
    airline_id: Uuid,
    model: String,
    registration: String,
    business_seats: i32,
    economy_seats: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgEntity for Aircraft {
    const TABLE: &'static str = "aircraft";
    const COLUMNS: &'static str =
        "id, airline_id, model, registration, business_seats, economy_seats, created_at, updated_at";
    const ORDER_BY: &'static str = "registration";
    type Row = AircraftRow;

    fn from_row(r: AircraftRow) -> RepoResult<Self> {
        Ok(Aircraft {
            id: r.id,
            airline_id: r.airline_id,
            model: r.model,
            registration: r.registration,
            business_seats: r.business_seats,
            economy_seats: r.economy_seats,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }

    fn insert_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "INSERT INTO aircraft (id, airline_id, model, registration, business_seats, economy_seats, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.id)
        .bind(self.airline_id)
        .bind(&self.model)
        .bind(&self.registration)
        .bind(self.business_seats)
        .bind(self.economy_seats)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "UPDATE aircraft SET airline_id = $2, model = $3, registration = $4, business_seats = $5, \
             economy_seats = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.airline_id)
        .bind(&self.model)
        .bind(&self.registration)
        .bind(self.business_seats)
        .bind(self.economy_seats)
        .bind(self.updated_at)
    }
}

// ============================================================================
// Promotion
// ============================================================================

pub(crate) const PROMOTION_COLUMNS: &str = "id, code, description, discount_type, discount_value, max_discount, \
     start_date, end_date, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PromotionRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    discount_type: String,
    discount_value: f64,
    max_discount: Option<i64>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PromotionRow {
    pub(crate) fn into_entity(self) -> RepoResult<Promotion> {
        Ok(Promotion {
            id: self.id,
            code: self.code,
            description: self.description,
            discount_type: decode(&self.discount_type)?,
            discount_value: self.discount_value,
            max_discount: self.max_discount,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgEntity for Promotion {
    const TABLE: &'static str = "promotions";
    const COLUMNS: &'static str = PROMOTION_COLUMNS;
    const ORDER_BY: &'static str = "start_date DESC, code";
    type Row = PromotionRow;

    fn from_row(row: PromotionRow) -> RepoResult<Self> {
        row.into_entity()
    }

    fn insert_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "INSERT INTO promotions (id, code, description, discount_type, discount_value, max_discount, \
             start_date, end_date, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.description)
        .bind(self.discount_type.as_str())
        .bind(self.discount_value)
        .bind(self.max_discount)
        .bind(self.start_date)
        .bind(self.end_date)
        .bind(self.is_active)
        .bind(self.created_at)
        .bind(self.updated_at)
    }

    fn update_query(&self) -> PgQuery<'_> {
        sqlx::query(
            "UPDATE promotions SET code = $2, description = $3, discount_type = $4, discount_value = $5, \
             max_discount = $6, start_date = $7, end_date = $8, is_active = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(&self.description)
        .bind(self.discount_type.as_str())
        .bind(self.discount_value)
        .bind(self.max_discount)
        .bind(self.start_date)
        .bind(self.end_date)
        .bind(self.is_active)
        .bind(self.updated_at)
    }
}
