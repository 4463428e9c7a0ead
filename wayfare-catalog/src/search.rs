//! Read paths for shoppers: flight search and the flight detail page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use wayfare_core::catalog::{AncillaryService, ServicePackage};
use wayfare_core::flight::{CabinClass, FlightView, SeatMapEntry};
use wayfare_core::repository::{FlightRepository, PricingCatalog};
use wayfare_core::search::{select_options, FlightOption, FlightSearchQuery};
use wayfare_core::{CoreError, CoreResult};
use wayfare_shared::Pagination;

use crate::ancillary;
use crate::inventory::{SeatInventory, SeatSummary};
use crate::pricing::PricingEngine;

#[derive(Debug, Clone, Serialize)]
pub struct ClassPrices {
    pub economy: i64,
    pub business: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightDetail {
    #[serde(flatten)]
    pub flight: FlightView,
    pub duration_minutes: i64,
    pub prices: ClassPrices,
    pub seat_summary: SeatSummary,
    pub seat_map: Vec<SeatMapEntry>,
    pub baggage_services: Vec<AncillaryService>,
    pub meal_services: Vec<AncillaryService>,
    pub service_packages: Vec<ServicePackage>,
}

#[derive(Clone)]
pub struct FlightSearch {
    flights: Arc<dyn FlightRepository>,
    catalog: Arc<dyn PricingCatalog>,
    inventory: SeatInventory,
    engine: Arc<PricingEngine>,
    default_limit: u32,
    max_limit: u32,
}

impl FlightSearch {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        catalog: Arc<dyn PricingCatalog>,
        engine: Arc<PricingEngine>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        Self {
            inventory: SeatInventory::new(flights.clone()),
            flights,
            catalog,
            engine,
            default_limit,
            max_limit,
        }
    }

    pub async fn search(
        &self,
        query: &FlightSearchQuery,
        now: DateTime<Utc>,
    ) -> CoreResult<(Vec<FlightOption>, Pagination)> {
        let errors = query.validate();
        if !errors.is_empty() {
            return Err(CoreError::validation(errors));
        }

        let cabin = query.cabin();
        let candidates = self
            .flights
            .search_candidates(
                &query.departure_airport_code.trim().to_ascii_uppercase(),
                &query.arrival_airport_code.trim().to_ascii_uppercase(),
                query.departure_date,
            )
            .await?;

        let mut options = Vec::with_capacity(candidates.len());
        for flight in candidates {
            let booked = self.flights.count_booked_seats(flight.flight.id, cabin).await?;
            options.push(FlightOption {
                class_code: cabin,
                duration_minutes: flight.flight.duration_minutes(),
                starting_price: self.engine.class_base_price(&flight.flight, cabin),
                available_seats: (flight.configured_seats(cabin) - booked).max(0),
                flight,
            });
        }

        let page = query.page_request(self.default_limit, self.max_limit);
        let (items, total) = select_options(options, query, page, now);
        Ok((items, Pagination::new(page, total)))
    }

    pub async fn flight_detail(&self, flight_id: Uuid) -> CoreResult<FlightDetail> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Flight not found: {}", flight_id)))?;

        let seat_summary = self.inventory.flight_seat_summary(flight_id).await?;
        let seat_map = self.flights.seat_map(flight_id).await?;
        let offered = ancillary::offerings(self.catalog.as_ref(), &flight.flight).await?;
        let service_packages = self
            .catalog
            .packages_for_airline(flight.flight.airline_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .collect();

        Ok(FlightDetail {
            duration_minutes: flight.flight.duration_minutes(),
            prices: ClassPrices {
                economy: self.engine.class_base_price(&flight.flight, CabinClass::Economy),
                business: self.engine.class_base_price(&flight.flight, CabinClass::Business),
            },
            flight,
            seat_summary,
            seat_map,
            baggage_services: offered.baggage,
            meal_services: offered.meals,
            service_packages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wayfare_core::catalog::{AncillaryKind, PackageType};
    use wayfare_store::memory::{FlightFixture, InMemoryStore};

    fn search(store: &Arc<InMemoryStore>) -> FlightSearch {
        FlightSearch::new(
            store.clone(),
            store.clone(),
            Arc::new(PricingEngine::new(Default::default())),
            20,
            100,
        )
    }

    fn query(date: chrono::NaiveDate, passengers: u32) -> FlightSearchQuery {
        serde_json::from_value(serde_json::json!({
            "departure_airport_code": "han",
            "arrival_airport_code": "SGN",
            "departure_date": date,
            "passengers": passengers,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_respects_capacity_and_price_fallback() {
        let store = Arc::new(InMemoryStore::new());
        let roomy = store
            .seed_flight(FlightFixture { economy_price: None, ..Default::default() })
            .await;
        store
            .seed_flight(FlightFixture {
                flight_number: "VN209".into(),
                economy_seats: 1,
                departure_time: roomy.flight.departure_time + Duration::hours(3),
                ..Default::default()
            })
            .await;
        let date = roomy.flight.departure_time.date_naive();
        let now = Utc::now();

        let (all, page) = search(&store).search(&query(date, 1), now).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(all[0].flight.flight.id, roomy.flight.id);
        assert_eq!(all[0].starting_price, 1_000_000);

        let (pair, page) = search(&store).search(&query(date, 2), now).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(pair[0].flight.flight.id, roomy.flight.id);

        let (none, _) = search(&store)
            .search(&query(date + Duration::days(1), 1), now)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_detail_lists_offerings() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await;
        let airline_id = flight.flight.airline_id;

        store
            .insert_ancillary(AncillaryService {
                id: Uuid::new_v4(),
                kind: AncillaryKind::Baggage,
                flight_id: Some(flight.flight.id),
                airline_id: None,
                name: "20kg".into(),
                description: None,
                price: 250_000,
                weight_kg: Some(20),
                is_active: true,
            })
            .await;
        store
            .insert_ancillary(AncillaryService {
                id: Uuid::new_v4(),
                kind: AncillaryKind::Meal,
                flight_id: None,
                airline_id: Some(airline_id),
                name: "Pho bo".into(),
                description: None,
                price: 0,
                weight_kg: None,
                is_active: true,
            })
            .await;
        store
            .insert_package(ServicePackage {
                id: Uuid::new_v4(),
                airline_id,
                name: "Economy Standard".into(),
                code: "ECO_STD".into(),
                cabin_class: CabinClass::Economy,
                package_type: PackageType::Standard,
                price_multiplier: 1.0,
                included_services: serde_json::json!({}),
                is_active: true,
            })
            .await;

        let detail = search(&store).flight_detail(flight.flight.id).await.unwrap();
        assert_eq!(detail.baggage_services.len(), 1);
        assert!(detail.meal_services.is_empty());
        assert_eq!(detail.service_packages.len(), 1);
        assert_eq!(detail.seat_map.len(), 10);
        assert_eq!(detail.prices.economy, 1_200_000);
        assert_eq!(detail.seat_summary.available_seats, 10);
    }
}
