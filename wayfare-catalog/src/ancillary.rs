//! Baggage and meal add-ons: price resolution for bookings and the per-flight menu.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use wayfare_core::catalog::{AncillaryKind, AncillaryService};
use wayfare_core::flight::Flight;
use wayfare_core::repository::{PricingCatalog, RepoResult};

/// `{service_id, quantity}` as sent in `baggage_options` / `meal_options`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddOnSelection {
    pub service_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// An add-on whose price was found.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ResolvedAddOn {
    pub kind: AncillaryKind,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

impl ResolvedAddOn {
    pub fn total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Looks the selection up on the flight first, then in the airline catalog.
///
/// Unknown ids, inactive rows, non-positive prices and non-positive quantities all yield `None`
/// so the add-on contributes nothing; the booking still goes through.
pub async fn resolve(
    catalog: &dyn PricingCatalog,
    flight: &Flight,
    kind: AncillaryKind,
    selection: &AddOnSelection,
) -> RepoResult<Option<ResolvedAddOn>> {
    if selection.quantity <= 0 {
        warn!(service_id = %selection.service_id, quantity = selection.quantity, "Ignoring add-on with non-positive quantity");
        return Ok(None);
    }

    let mut service = catalog
        .flight_ancillary(flight.id, kind, selection.service_id)
        .await?
        .filter(|s| s.is_active);
    if service.is_none() {
        service = catalog
            .airline_ancillary(flight.airline_id, kind, selection.service_id)
            .await?
            .filter(|s| s.is_active);
    }

    match service {
        Some(s) if s.price > 0 => Ok(Some(ResolvedAddOn {
            kind,
            service_id: s.id,
            quantity: selection.quantity,
            unit_price: s.price,
        })),
        Some(s) => {
            warn!(service_id = %s.id, price = s.price, %kind, "Add-on has no usable price");
            Ok(None)
        }
        None => {
            warn!(service_id = %selection.service_id, flight_id = %flight.id, %kind, "Add-on not found for flight or airline");
            Ok(None)
        }
    }
}

/// What a flight offers on its detail page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlightOfferings {
    pub baggage: Vec<AncillaryService>,
    pub meals: Vec<AncillaryService>,
}

pub async fn offerings(catalog: &dyn PricingCatalog, flight: &Flight) -> RepoResult<FlightOfferings> {
    let mut offered = FlightOfferings::default();
    for service in catalog.flight_ancillaries(flight.id, flight.airline_id).await? {
        if !service.is_active || service.price <= 0 {
            continue;
        }
        match service.kind {
            AncillaryKind::Baggage => offered.baggage.push(service),
            AncillaryKind::Meal => offered.meals.push(service),
        }
    }
    Ok(offered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wayfare_store::memory::{FlightFixture, InMemoryStore};

    fn service(kind: AncillaryKind, flight_id: Option<Uuid>, airline_id: Option<Uuid>, price: i64) -> AncillaryService {
        AncillaryService {
            id: Uuid::new_v4(),
            kind,
            flight_id,
            airline_id,
            name: "Extra".into(),
            description: None,
            price,
            weight_kg: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_flight_rows_win_then_airline_catalog() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await.flight;

        let on_flight = service(AncillaryKind::Baggage, Some(flight.id), None, 300_000);
        let from_airline = service(AncillaryKind::Meal, None, Some(flight.airline_id), 80_000);
        let other_airline = service(AncillaryKind::Meal, None, Some(Uuid::new_v4()), 80_000);
        for s in [&on_flight, &from_airline, &other_airline] {
            store.insert_ancillary(s.clone()).await;
        }

        let pick = |id| AddOnSelection { service_id: id, quantity: 2 };
        let bag = resolve(&*store, &flight, AncillaryKind::Baggage, &pick(on_flight.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bag.total(), 600_000);

        let meal = resolve(&*store, &flight, AncillaryKind::Meal, &pick(from_airline.id))
            .await
            .unwrap();
        assert_eq!(meal.map(|m| m.unit_price), Some(80_000));

        let foreign = resolve(&*store, &flight, AncillaryKind::Meal, &pick(other_airline.id))
            .await
            .unwrap();
        assert!(foreign.is_none());

        let wrong_kind = resolve(&*store, &flight, AncillaryKind::Meal, &pick(on_flight.id))
            .await
            .unwrap();
        assert!(wrong_kind.is_none());
    }

    #[tokio::test]
    async fn test_unusable_price_or_quantity_contributes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let flight = store.seed_flight(FlightFixture::default()).await.flight;
        let free = service(AncillaryKind::Baggage, Some(flight.id), None, 0);
        let priced = service(AncillaryKind::Baggage, Some(flight.id), None, 100_000);
        store.insert_ancillary(free.clone()).await;
        store.insert_ancillary(priced.clone()).await;

        let zero_price = AddOnSelection { service_id: free.id, quantity: 1 };
        assert!(resolve(&*store, &flight, AncillaryKind::Baggage, &zero_price)
            .await
            .unwrap()
            .is_none());

        let zero_quantity = AddOnSelection { service_id: priced.id, quantity: 0 };
        assert!(resolve(&*store, &flight, AncillaryKind::Baggage, &zero_quantity)
            .await
            .unwrap()
            .is_none());
    }
}
