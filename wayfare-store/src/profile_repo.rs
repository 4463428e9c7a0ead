use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use wayfare_core::notify::{NewContact, ProfileStore};
use wayfare_core::repository::{RepoError, RepoResult};

use crate::database::write_error;

pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileRepository {
    async fn update_citizen_id(&self, user_id: Uuid, citizen_id: &str) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, citizen_id, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET citizen_id = EXCLUDED.citizen_id, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(citizen_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(RepoError::backend)?;
        Ok(())
    }

    async fn create_contact(&self, contact: &NewContact) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contacts (id, user_id, booking_id, first_name, last_name, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(contact.id)
        .bind(contact.user_id)
        .bind(contact.booking_id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Contact"))?;
        Ok(())
    }
}
