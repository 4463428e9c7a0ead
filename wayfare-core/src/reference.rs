//! Admin-managed reference data: airlines, airports, aircraft and promotions.
//!
//! All four share one CRUD shape, expressed by [`ReferenceEntity`], so a single repository
//! trait and a single set of HTTP handlers serve them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{DiscountType, Promotion};
use crate::flight::{seat_rows, MAX_SEAT_ROWS};
use crate::FieldError;

pub trait ReferenceEntity: Clone + Serialize + Send + Sync + 'static {
    type Input: DeserializeOwned + Clone + Send + Sync + 'static;

    /// Singular, human readable ("Airline").
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
    fn create(id: Uuid, input: &Self::Input, now: DateTime<Utc>) -> Self;
    fn update(&mut self, input: &Self::Input, now: DateTime<Utc>);
    fn validate(input: &Self::Input) -> Vec<FieldError>;
}

fn require(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{} is required", field)));
    }
}

// ============================================================================
// Airline
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airline {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub country: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirlineInput {
    pub code: String,
    pub name: String,
    pub country: Option<String>,
    pub is_active: Option<bool>,
}

impl ReferenceEntity for Airline {
    type Input = AirlineInput;
    const LABEL: &'static str = "Airline";

    fn id(&self) -> Uuid {
        self.id
    }

    fn create(id: Uuid, input: &AirlineInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            code: input.code.trim().to_ascii_uppercase(),
            name: input.name.trim().to_string(),
            country: input.country.clone(),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    fn update(&mut self, input: &AirlineInput, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::create(self.id, input, now);
        self.created_at = created_at;
    }

    fn validate(input: &AirlineInput) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &input.name);
        let code = input.code.trim();
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(FieldError::new("code", "code must be 2-3 alphanumeric characters"));
        }
        errors
    }
}

// ============================================================================
// Airport
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirportInput {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub timezone: Option<String>,
}

impl ReferenceEntity for Airport {
    type Input = AirportInput;
    const LABEL: &'static str = "Airport";

    fn id(&self) -> Uuid {
        self.id
    }

    fn create(id: Uuid, input: &AirportInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            code: input.code.trim().to_ascii_uppercase(),
            name: input.name.trim().to_string(),
            city: input.city.trim().to_string(),
            country: input.country.trim().to_string(),
            timezone: input.timezone.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn update(&mut self, input: &AirportInput, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::create(self.id, input, now);
        self.created_at = created_at;
    }

    fn validate(input: &AirportInput) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &input.name);
        require(&mut errors, "city", &input.city);
        require(&mut errors, "country", &input.country);
        let code = input.code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(FieldError::new("code", "code must be a 3 letter IATA code"));
        }
        errors
    }
}

// ============================================================================
// Aircraft
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: Uuid,
    pub airline_id: Uuid,
    pub model: String,
    pub registration: String,
    pub business_seats: i32,
    pub economy_seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AircraftInput {
    pub airline_id: Uuid,
    pub model: String,
    pub registration: String,
    pub business_seats: i32,
    pub economy_seats: i32,
}

impl ReferenceEntity for Aircraft {
    type Input = AircraftInput;
    const LABEL: &'static str = "Aircraft";

    fn id(&self) -> Uuid {
        self.id
    }

    fn create(id: Uuid, input: &AircraftInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            airline_id: input.airline_id,
            model: input.model.trim().to_string(),
            registration: input.registration.trim().to_ascii_uppercase(),
            business_seats: input.business_seats,
            economy_seats: input.economy_seats,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(&mut self, input: &AircraftInput, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::create(self.id, input, now);
        self.created_at = created_at;
    }

    fn validate(input: &AircraftInput) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "model", &input.model);
        require(&mut errors, "registration", &input.registration);
        match seat_rows(input.business_seats, input.economy_seats) {
            None => errors.push(FieldError::new("seats", "seat counts cannot be negative")),
            Some(0) => errors.push(FieldError::new("seats", "aircraft needs at least one seat")),
            Some(rows) if rows > MAX_SEAT_ROWS => errors.push(FieldError::new(
                "seats",
                format!("seat layout needs {} rows, at most {} allowed", rows, MAX_SEAT_ROWS),
            )),
            Some(_) => {}
        }
        errors
    }
}

// ============================================================================
// Promotion
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PromotionInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_discount: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
}

impl ReferenceEntity for Promotion {
    type Input = PromotionInput;
    const LABEL: &'static str = "Promotion";

    fn id(&self) -> Uuid {
        self.id
    }

    fn create(id: Uuid, input: &PromotionInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            code: Promotion::normalize_code(&input.code),
            description: input.description.clone(),
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            max_discount: input.max_discount,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    fn update(&mut self, input: &PromotionInput, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::create(self.id, input, now);
        self.created_at = created_at;
    }

    fn validate(input: &PromotionInput) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require(&mut errors, "code", &input.code);
        if !input.discount_value.is_finite() || input.discount_value <= 0.0 {
            errors.push(FieldError::new("discount_value", "discount_value must be positive"));
        }
        if input.discount_type == DiscountType::Percentage && input.discount_value > 100.0 {
            errors.push(FieldError::new("discount_value", "percentage cannot exceed 100"));
        }
        if matches!(input.max_discount, Some(cap) if cap <= 0) {
            errors.push(FieldError::new("max_discount", "max_discount must be positive"));
        }
        if input.start_date >= input.end_date {
            errors.push(FieldError::new("end_date", "end_date must be after start_date"));
        }
        errors
    }
}
