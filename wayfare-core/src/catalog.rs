use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flight::CabinClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Standard,
    Plus,
}

text_enum!(PackageType {
    Standard => "standard",
    Plus => "plus",
});

/// Per-airline fare bundle. The multiplier scales the class base price (1.0 standard, 1.2 plus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: Uuid,
    pub airline_id: Uuid,
    pub name: String,
    pub code: String,
    pub cabin_class: CabinClass,
    pub package_type: PackageType,
    pub price_multiplier: f64,
    pub included_services: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AncillaryKind {
    Baggage,
    Meal,
}

text_enum!(AncillaryKind {
    Baggage => "baggage",
    Meal => "meal",
});

/// A priced add-on. Flight-scoped rows carry `flight_id`; airline catalog rows carry `airline_id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncillaryService {
    pub id: Uuid,
    pub kind: AncillaryKind,
    pub flight_id: Option<Uuid>,
    pub airline_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub weight_kg: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

text_enum!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Percent (10.0 = 10%) for `Percentage`, currency units for `Fixed`.
    pub discount_value: f64,
    pub max_discount: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn promotion_window() {
        let now = Utc::now();
        let mut promo = Promotion {
            id: Uuid::new_v4(),
            code: "SUMMER".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(promo.is_applicable(now));

        promo.is_active = false;
        assert!(!promo.is_applicable(now));

        promo.is_active = true;
        assert!(!promo.is_applicable(now + Duration::days(2)));
    }

    #[test]
    fn codes_are_normalized() {
        assert_eq!(Promotion::normalize_code("  summer10 "), "SUMMER10");
    }
}
