use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;
use wayfare_core::catalog::{AncillaryKind, AncillaryService, Promotion, ServicePackage};
use wayfare_core::repository::{PricingCatalog, RepoError, RepoResult};

use crate::database::decode;
use crate::reference_repo::{PromotionRow, PROMOTION_COLUMNS};

pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    airline_id: Uuid,
    name: String,
    code: String,
    cabin_class: String,
    package_type: String,
    price_multiplier: f64,
    included_services: Value,
    is_active: bool,
}

impl PackageRow {
    fn into_package(self) -> RepoResult<ServicePackage> {
        Ok(ServicePackage {
            id: self.id,
            airline_id: self.airline_id,
            name: self.name,
            code: self.code,
            cabin_class: decode(&self.cabin_class)?,
            package_type: decode(&self.package_type)?,
            price_multiplier: self.price_multiplier,
            included_services: self.included_services,
            is_active: self.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AncillaryRow {
    id: Uuid,
    kind: String,
    flight_id: Option<Uuid>,
    airline_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    price: i64,
    weight_kg: Option<i32>,
    is_active: bool,
}

impl AncillaryRow {
    fn into_service(self) -> RepoResult<AncillaryService> {
        Ok(AncillaryService {
            id: self.id,
            kind: decode(&self.kind)?,
            flight_id: self.flight_id,
            airline_id: self.airline_id,
            name: self.name,
            description: self.description,
            price: self.price,
            weight_kg: self.weight_kg,
            is_active: self.is_active,
        })
    }
}

const PACKAGE_COLUMNS: &str =
    "id, airline_id, name, code, cabin_class, package_type, price_multiplier, included_services, is_active";
const ANCILLARY_COLUMNS: &str =
    "id, kind, flight_id, airline_id, name, description, price, weight_kg, is_active";

#[async_trait]
impl PricingCatalog for PostgresCatalogRepository {
    async fn service_package(&self, id: Uuid) -> RepoResult<Option<ServicePackage>> {
        let sql = format!("SELECT {} FROM service_packages WHERE id = $1", PACKAGE_COLUMNS);
        let row: Option<PackageRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(PackageRow::into_package).transpose()
    }

    async fn packages_for_airline(&self, airline_id: Uuid) -> RepoResult<Vec<ServicePackage>> {
        let sql = format!(
            "SELECT {} FROM service_packages WHERE airline_id = $1 AND is_active ORDER BY cabin_class, price_multiplier",
            PACKAGE_COLUMNS
        );
        let rows: Vec<PackageRow> = sqlx::query_as(&sql)
            .bind(airline_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        rows.into_iter().map(PackageRow::into_package).collect()
    }

    async fn flight_ancillary(
        &self,
        flight_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>> {
        let sql = format!(
            "SELECT {} FROM ancillary_services WHERE id = $1 AND kind = $2 AND flight_id = $3",
            ANCILLARY_COLUMNS
        );
        let row: Option<AncillaryRow> = sqlx::query_as(&sql)
            .bind(service_id)
            .bind(kind.as_str())
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(AncillaryRow::into_service).transpose()
    }

    async fn airline_ancillary(
        &self,
        airline_id: Uuid,
        kind: AncillaryKind,
        service_id: Uuid,
    ) -> RepoResult<Option<AncillaryService>> {
        let sql = format!(
            "SELECT {} FROM ancillary_services WHERE id = $1 AND kind = $2 AND flight_id IS NULL AND airline_id = $3",
            ANCILLARY_COLUMNS
        );
        let row: Option<AncillaryRow> = sqlx::query_as(&sql)
            .bind(service_id)
            .bind(kind.as_str())
            .bind(airline_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(AncillaryRow::into_service).transpose()
    }

    async fn flight_ancillaries(&self, flight_id: Uuid, airline_id: Uuid) -> RepoResult<Vec<AncillaryService>> {
        // Flight-scoped rows sort ahead of the airline catalog.
        let sql = format!(
            r#"
            SELECT {} FROM ancillary_services
            WHERE is_active AND (flight_id = $1 OR (flight_id IS NULL AND airline_id = $2))
            ORDER BY (flight_id IS NULL), kind, price
            "#,
            ANCILLARY_COLUMNS
        );
        let rows: Vec<AncillaryRow> = sqlx::query_as(&sql)
            .bind(flight_id)
            .bind(airline_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        rows.into_iter().map(AncillaryRow::into_service).collect()
    }

    async fn active_promotion(&self, code: &str, now: DateTime<Utc>) -> RepoResult<Option<Promotion>> {
        let sql = format!(
            "SELECT {} FROM promotions WHERE code = $1 AND is_active AND start_date <= $2 AND end_date >= $2",
            PROMOTION_COLUMNS
        );
        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::backend)?;
        row.map(PromotionRow::into_entity).transpose()
    }
}
