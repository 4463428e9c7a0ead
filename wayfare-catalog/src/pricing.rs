//! Fare calculation for single flights and multi-leg itineraries.
//!
//! [`PricingEngine`] is pure arithmetic over already-loaded rows. [`FareCalculator`] loads
//! packages, add-ons and promotions from a [`PricingCatalog`] and feeds the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use wayfare_core::booking::{AmountBreakdown, PassengerType};
use wayfare_core::catalog::{AncillaryKind, DiscountType, Promotion, ServicePackage};
use wayfare_core::flight::{CabinClass, Flight};
use wayfare_core::repository::{PricingCatalog, RepoError};
use wayfare_core::CoreError;

use crate::ancillary::{self, AddOnSelection, ResolvedAddOn};

/// Fallback prices and tax rate. Injected once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Used when a flight has no economy price.
    pub economy_fallback: i64,
    /// Used when a flight has no business price.
    pub business_fallback: i64,
    /// Flat fare for infants, independent of class and package.
    pub infant_price: i64,
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            economy_fallback: 1_000_000,
            business_fallback: 2_000_000,
            infant_price: 400_000,
            tax_rate: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("At least one flight is required to price a booking")]
    NoLegs,
    #[error(transparent)]
    Catalog(#[from] RepoError),
}

impl From<PricingError> for CoreError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::NoLegs => CoreError::BadRequest(err.to_string()),
            PricingError::Catalog(e) => e.into(),
        }
    }
}

/// Who is being priced on a leg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FareTraveller {
    pub passenger_type: PassengerType,
    pub cabin: CabinClass,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PassengerFare {
    pub passenger_type: PassengerType,
    pub cabin: CabinClass,
    /// Class price before the package multiplier (infant flat price for infants).
    pub base_fare: i64,
    /// What the package multiplier added on top of `base_fare`.
    pub package_fee: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppliedPackage {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub price_multiplier: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegQuote {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub package: Option<AppliedPackage>,
    pub fares: Vec<PassengerFare>,
    pub add_ons: Vec<ResolvedAddOn>,
    pub base_amount: i64,
    pub service_package_fees: i64,
    pub baggage_fees: i64,
    pub meal_fees: i64,
    pub subtotal: i64,
}

/// Priced itinerary: every leg plus the single combined breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub legs: Vec<LegQuote>,
    pub amounts: AmountBreakdown,
    /// Code of the promotion that was found and evaluated, if any.
    pub promotion_code: Option<String>,
}

pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Flight's class price, or the configured fallback when unset.
    pub fn class_base_price(&self, flight: &Flight, cabin: CabinClass) -> i64 {
        flight.class_price(cabin).unwrap_or(match cabin {
            CabinClass::Economy => self.config.economy_fallback,
            CabinClass::Business => self.config.business_fallback,
        })
    }

    /// Multiplier of a package, or 1.0 for a missing, inactive or nonsensical one.
    pub fn effective_multiplier(package: Option<&ServicePackage>) -> f64 {
        package
            .filter(|p| p.is_active)
            .map(|p| p.price_multiplier)
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(1.0)
    }

    pub fn passenger_fare(&self, flight: &Flight, traveller: FareTraveller, multiplier: f64) -> PassengerFare {
        if traveller.passenger_type == PassengerType::Infant {
            return PassengerFare {
                passenger_type: traveller.passenger_type,
                cabin: traveller.cabin,
                base_fare: self.config.infant_price,
                package_fee: 0,
            };
        }

        let base_fare = self.class_base_price(flight, traveller.cabin);
        let with_package = (base_fare as f64 * multiplier).round() as i64;
        PassengerFare {
            passenger_type: traveller.passenger_type,
            cabin: traveller.cabin,
            base_fare,
            package_fee: with_package - base_fare,
        }
    }

    /// Prices one leg without any discount.
    pub fn price_leg(
        &self,
        flight: &Flight,
        travellers: &[FareTraveller],
        package: Option<&ServicePackage>,
        add_ons: Vec<ResolvedAddOn>,
    ) -> LegQuote {
        let multiplier = Self::effective_multiplier(package);
        let fares: Vec<PassengerFare> = travellers
            .iter()
            .map(|t| self.passenger_fare(flight, *t, multiplier))
            .collect();

        let base_amount = fares.iter().map(|f| f.base_fare).sum::<i64>();
        let service_package_fees = fares.iter().map(|f| f.package_fee).sum::<i64>();
        let fees_of = |kind: AncillaryKind| {
            add_ons
                .iter()
                .filter(|a| a.kind == kind)
                .map(ResolvedAddOn::total)
                .sum::<i64>()
        };
        let baggage_fees = fees_of(AncillaryKind::Baggage);
        let meal_fees = fees_of(AncillaryKind::Meal);

        LegQuote {
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            package: package.filter(|p| p.is_active).map(|p| AppliedPackage {
                id: p.id,
                code: p.code.clone(),
                name: p.name.clone(),
                price_multiplier: multiplier,
            }),
            fares,
            add_ons,
            base_amount,
            service_package_fees,
            baggage_fees,
            meal_fees,
            subtotal: base_amount + service_package_fees + baggage_fees + meal_fees,
        }
    }

    /// Discount a promotion grants on `subtotal` at `now`, capped and clamped to `[0, subtotal]`.
    pub fn discount(&self, promotion: Option<&Promotion>, subtotal: i64, now: DateTime<Utc>) -> i64 {
        let Some(promo) = promotion.filter(|p| p.is_applicable(now)) else {
            return 0;
        };
        if !promo.discount_value.is_finite() {
            return 0;
        }

        let raw = match promo.discount_type {
            DiscountType::Percentage => (subtotal as f64 * promo.discount_value / 100.0).round() as i64,
            DiscountType::Fixed => promo.discount_value.round() as i64,
        };
        let capped = match promo.max_discount {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        capped.clamp(0, subtotal.max(0))
    }

    fn tax(&self, taxable: i64) -> i64 {
        if !self.config.tax_rate.is_finite() || self.config.tax_rate <= 0.0 {
            return 0;
        }
        (taxable as f64 * self.config.tax_rate).round() as i64
    }

    /// Sums every leg first, then applies the promotion once to the grand subtotal.
    pub fn combine(&self, legs: Vec<LegQuote>, promotion: Option<&Promotion>, now: DateTime<Utc>) -> Quote {
        let mut amounts = AmountBreakdown::default();
        for leg in &legs {
            amounts.base_amount += leg.base_amount;
            amounts.service_package_fees += leg.service_package_fees;
            amounts.baggage_fees += leg.baggage_fees;
            amounts.meal_fees += leg.meal_fees;
        }
        amounts.subtotal = amounts.base_amount
            + amounts.service_package_fees
            + amounts.baggage_fees
            + amounts.meal_fees;
        amounts.discount_amount = self.discount(promotion, amounts.subtotal, now);
        amounts.tax_amount = self.tax(amounts.subtotal - amounts.discount_amount);
        amounts.final_amount = amounts.subtotal - amounts.discount_amount + amounts.tax_amount;

        Quote {
            legs,
            amounts,
            promotion_code: promotion.map(|p| p.code.clone()),
        }
    }
}

/// One leg of a pricing request.
#[derive(Debug, Clone)]
pub struct LegRequest<'a> {
    pub flight: &'a Flight,
    pub travellers: Vec<FareTraveller>,
    pub service_package_id: Option<Uuid>,
    pub baggage: &'a [AddOnSelection],
    pub meals: &'a [AddOnSelection],
}

#[derive(Clone)]
pub struct FareCalculator {
    catalog: Arc<dyn PricingCatalog>,
    engine: Arc<PricingEngine>,
}

impl FareCalculator {
    pub fn new(catalog: Arc<dyn PricingCatalog>, engine: Arc<PricingEngine>) -> Self {
        Self { catalog, engine }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub async fn quote_leg(&self, leg: &LegRequest<'_>) -> Result<LegQuote, PricingError> {
        let package = match leg.service_package_id {
            Some(id) => {
                let found = self.catalog.service_package(id).await?;
                if found.is_none() {
                    debug!(package_id = %id, "Unknown service package, pricing with multiplier 1.0");
                }
                found
            }
            None => None,
        };

        let mut add_ons = Vec::with_capacity(leg.baggage.len() + leg.meals.len());
        for (kind, selections) in [
            (AncillaryKind::Baggage, leg.baggage),
            (AncillaryKind::Meal, leg.meals),
        ] {
            for selection in selections {
                if let Some(resolved) =
                    ancillary::resolve(self.catalog.as_ref(), leg.flight, kind, selection).await?
                {
                    add_ons.push(resolved);
                }
            }
        }

        Ok(self
            .engine
            .price_leg(leg.flight, &leg.travellers, package.as_ref(), add_ons))
    }

    /// Prices every leg independently, then applies `promotion_code` once.
    pub async fn quote(
        &self,
        legs: &[LegRequest<'_>],
        promotion_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Quote, PricingError> {
        if legs.is_empty() {
            return Err(PricingError::NoLegs);
        }

        let mut quotes = Vec::with_capacity(legs.len());
        for leg in legs {
            quotes.push(self.quote_leg(leg).await?);
        }

        let promotion = match promotion_code.map(Promotion::normalize_code) {
            Some(code) if !code.is_empty() => {
                let found = self.catalog.active_promotion(&code, now).await?;
                if found.is_none() {
                    debug!(%code, "Promotion code not active, no discount applied");
                }
                found
            }
            _ => None,
        };

        Ok(self.engine.combine(quotes, promotion.as_ref(), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wayfare_core::flight::{FlightStatus, FlightType};

    fn flight(economy: Option<i64>, business: Option<i64>) -> Flight {
        let now = Utc::now();
        Flight {
            id: Uuid::new_v4(),
            flight_number: "VN201".into(),
            airline_id: Uuid::new_v4(),
            aircraft_id: Uuid::new_v4(),
            departure_airport_id: Uuid::new_v4(),
            arrival_airport_id: Uuid::new_v4(),
            departure_time: now + Duration::days(3),
            arrival_time: now + Duration::days(3) + Duration::hours(2),
            status: FlightStatus::Scheduled,
            economy_price: economy,
            business_price: business,
            flight_type: FlightType::Domestic,
            created_at: now,
            updated_at: now,
        }
    }

    fn package(multiplier: f64) -> ServicePackage {
        ServicePackage {
            id: Uuid::new_v4(),
            airline_id: Uuid::new_v4(),
            name: "Economy Plus".into(),
            code: "ECO_PLUS".into(),
            cabin_class: CabinClass::Economy,
            package_type: wayfare_core::catalog::PackageType::Plus,
            price_multiplier: multiplier,
            included_services: serde_json::json!({"checked_bag_kg": 23}),
            is_active: true,
        }
    }

    fn promotion(kind: DiscountType, value: f64, cap: Option<i64>) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: Uuid::new_v4(),
            code: "AUTUMN".into(),
            description: None,
            discount_type: kind,
            discount_value: value,
            max_discount: cap,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn traveller(passenger_type: PassengerType, cabin: CabinClass) -> FareTraveller {
        FareTraveller { passenger_type, cabin }
    }

    fn engine() -> PricingEngine {
        PricingEngine::new(PricingConfig::default())
    }

    #[test]
    fn adult_and_lap_infant_on_economy() {
        let engine = engine();
        let f = flight(Some(1_200_000), None);
        let leg = engine.price_leg(
            &f,
            &[
                traveller(PassengerType::Adult, CabinClass::Economy),
                traveller(PassengerType::Infant, CabinClass::Economy),
            ],
            None,
            vec![],
        );
        let quote = engine.combine(vec![leg], None, Utc::now());

        assert_eq!(quote.amounts.base_amount, 1_600_000);
        assert_eq!(quote.amounts.final_amount, 1_600_000);
        assert_eq!(quote.amounts.tax_amount, 0);
        assert!(quote.amounts.reconciles());
    }

    #[test]
    fn infant_fare_ignores_class_and_package() {
        let engine = engine();
        let f = flight(Some(1_200_000), Some(3_000_000));
        let plus = package(1.2);
        for cabin in [CabinClass::Economy, CabinClass::Business] {
            for pkg in [None, Some(&plus)] {
                let leg = engine.price_leg(&f, &[traveller(PassengerType::Infant, cabin)], pkg, vec![]);
                assert_eq!(leg.base_amount, 400_000);
                assert_eq!(leg.service_package_fees, 0);
            }
        }
    }

    #[test]
    fn package_cost_is_a_separate_line() {
        let engine = engine();
        let f = flight(Some(1_200_000), None);
        let leg = engine.price_leg(
            &f,
            &[
                traveller(PassengerType::Adult, CabinClass::Economy),
                traveller(PassengerType::Child, CabinClass::Economy),
            ],
            Some(&package(1.2)),
            vec![],
        );
        assert_eq!(leg.base_amount, 2_400_000);
        assert_eq!(leg.service_package_fees, 480_000);
        assert_eq!(leg.subtotal, 2_880_000);
        assert_eq!(leg.package.as_ref().map(|p| p.price_multiplier), Some(1.2));
    }

    #[test]
    fn missing_or_inactive_package_prices_at_one() {
        let mut inactive = package(1.2);
        inactive.is_active = false;
        assert_eq!(PricingEngine::effective_multiplier(None), 1.0);
        assert_eq!(PricingEngine::effective_multiplier(Some(&inactive)), 1.0);
        assert_eq!(PricingEngine::effective_multiplier(Some(&package(f64::NAN))), 1.0);
    }

    #[test]
    fn unset_class_prices_fall_back() {
        let engine = engine();
        let f = flight(None, Some(0));
        assert_eq!(engine.class_base_price(&f, CabinClass::Economy), 1_000_000);
        assert_eq!(engine.class_base_price(&f, CabinClass::Business), 2_000_000);
    }

    #[test]
    fn each_passenger_priced_in_own_class() {
        let engine = engine();
        let f = flight(Some(1_000_000), Some(2_500_000));
        let leg = engine.price_leg(
            &f,
            &[
                traveller(PassengerType::Adult, CabinClass::Business),
                traveller(PassengerType::Adult, CabinClass::Economy),
            ],
            None,
            vec![],
        );
        assert_eq!(leg.base_amount, 3_500_000);
    }

    #[test]
    fn add_ons_split_by_kind() {
        let engine = engine();
        let f = flight(Some(1_000_000), None);
        let add_ons = vec![
            ResolvedAddOn { kind: AncillaryKind::Baggage, service_id: Uuid::new_v4(), quantity: 2, unit_price: 150_000 },
            ResolvedAddOn { kind: AncillaryKind::Meal, service_id: Uuid::new_v4(), quantity: 1, unit_price: 60_000 },
        ];
        let leg = engine.price_leg(&f, &[traveller(PassengerType::Adult, CabinClass::Economy)], None, add_ons);
        assert_eq!(leg.baggage_fees, 300_000);
        assert_eq!(leg.meal_fees, 60_000);
        assert_eq!(leg.subtotal, 1_360_000);
    }

    #[test]
    fn promotion_applies_once_across_legs() {
        let engine = engine();
        let adults = [traveller(PassengerType::Adult, CabinClass::Economy)];
        let outbound = engine.price_leg(&flight(Some(1_000_000), None), &adults, None, vec![]);
        let inbound = engine.price_leg(&flight(Some(1_500_000), None), &adults, None, vec![]);
        let promo = promotion(DiscountType::Percentage, 10.0, None);
        let now = Utc::now();

        let grand_subtotal = outbound.subtotal + inbound.subtotal;
        let expected = engine.discount(Some(&promo), grand_subtotal, now);

        let quote = engine.combine(vec![outbound, inbound], Some(&promo), now);
        assert_eq!(quote.amounts.discount_amount, expected);
        assert_eq!(quote.amounts.discount_amount, 250_000);
        assert_eq!(quote.amounts.final_amount, 2_250_000);
        assert!(quote.amounts.reconciles());
    }

    #[test]
    fn cap_binds_on_the_combined_subtotal() {
        let engine = engine();
        let adults = [traveller(PassengerType::Adult, CabinClass::Economy)];
        let legs = vec![
            engine.price_leg(&flight(Some(1_000_000), None), &adults, None, vec![]),
            engine.price_leg(&flight(Some(1_000_000), None), &adults, None, vec![]),
        ];
        let promo = promotion(DiscountType::Percentage, 10.0, Some(150_000));
        let quote = engine.combine(legs, Some(&promo), Utc::now());
        assert_eq!(quote.amounts.discount_amount, 150_000);
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let engine = engine();
        let now = Utc::now();
        let promo = promotion(DiscountType::Fixed, 500_000.0, None);
        assert_eq!(engine.discount(Some(&promo), 2_000_000, now), 500_000);
        assert_eq!(engine.discount(Some(&promo), 300_000, now), 300_000);
    }

    #[test]
    fn out_of_window_or_inactive_promotion_gives_nothing() {
        let engine = engine();
        let now = Utc::now();
        let mut promo = promotion(DiscountType::Percentage, 20.0, None);
        assert_eq!(engine.discount(Some(&promo), 1_000_000, now + Duration::days(5)), 0);
        promo.is_active = false;
        assert_eq!(engine.discount(Some(&promo), 1_000_000, now), 0);
        assert_eq!(engine.discount(None, 1_000_000, now), 0);
    }

    #[test]
    fn configured_tax_is_added_after_discount() {
        let engine = PricingEngine::new(PricingConfig { tax_rate: 0.1, ..PricingConfig::default() });
        let f = flight(Some(1_000_000), None);
        let leg = engine.price_leg(&f, &[traveller(PassengerType::Adult, CabinClass::Economy)], None, vec![]);
        let promo = promotion(DiscountType::Fixed, 200_000.0, None);
        let quote = engine.combine(vec![leg], Some(&promo), Utc::now());
        assert_eq!(quote.amounts.tax_amount, 80_000);
        assert_eq!(quote.amounts.final_amount, 880_000);
        assert!(quote.amounts.reconciles());
    }
}
