use std::sync::Arc;

use wayfare_booking::{BookingOrchestrator, OrchestratorConfig, SideEffectQueue, SideEffectRunner};
use wayfare_catalog::{FareCalculator, FlightSchedule, FlightSearch, PricingConfig, PricingEngine, SeatInventory};
use wayfare_core::catalog::Promotion;
use wayfare_core::notify::{Mailer, ProfileStore};
use wayfare_core::reference::{Aircraft, Airline, Airport, ReferenceEntity};
use wayfare_core::repository::{BookingStore, FlightRepository, PricingCatalog, ReferenceStore};
use wayfare_store::app_config::{Config, PricingSettings, RateLimitConfig};
use wayfare_store::booking_repo::PostgresBookingStore;
use wayfare_store::catalog_repo::PostgresCatalogRepository;
use wayfare_store::flight_repo::PostgresFlightRepository;
use wayfare_store::mailer::LogMailer;
use wayfare_store::memory::InMemoryStore;
use wayfare_store::profile_repo::PostgresProfileRepository;
use wayfare_store::reference_repo::PostgresReferenceRepository;
use wayfare_store::{DbClient, RedisClient};

use crate::worker::SideEffectWorker;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingOrchestrator,
    pub search: FlightSearch,
    pub inventory: SeatInventory,
    pub schedule: FlightSchedule,
    pub airlines: Arc<dyn ReferenceStore<Airline>>,
    pub airports: Arc<dyn ReferenceStore<Airport>>,
    pub aircraft: Arc<dyn ReferenceStore<Aircraft>>,
    pub promotions: Arc<dyn ReferenceStore<Promotion>>,
    pub db: Option<Arc<DbClient>>,
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub run_mode: String,
    pub default_limit: u32,
    pub max_limit: u32,
}

// ============================================================================
// Storage wiring
// ============================================================================

/// Repository implementations behind the services, chosen once at startup.
pub struct Backends {
    pub flights: Arc<dyn FlightRepository>,
    pub catalog: Arc<dyn PricingCatalog>,
    pub bookings: Arc<dyn BookingStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub mailer: Arc<dyn Mailer>,
    pub airlines: Arc<dyn ReferenceStore<Airline>>,
    pub airports: Arc<dyn ReferenceStore<Airport>>,
    pub aircraft: Arc<dyn ReferenceStore<Aircraft>>,
    pub promotions: Arc<dyn ReferenceStore<Promotion>>,
    pub db: Option<Arc<DbClient>>,
    pub redis: Option<Arc<RedisClient>>,
}

impl Backends {
    pub fn memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            flights: store.clone(),
            catalog: store.clone(),
            bookings: store.clone(),
            profiles: store.clone(),
            mailer: Arc::new(LogMailer),
            airlines: store.clone(),
            airports: store.clone(),
            aircraft: store.clone(),
            promotions: store,
            db: None,
            redis: None,
        }
    }

    pub fn postgres(db: DbClient, redis: Option<RedisClient>, cache_ttl_seconds: u64) -> Self {
        let pool = db.pool.clone();
        let references = Arc::new(PostgresReferenceRepository::new(pool.clone()));
        Self {
            flights: Arc::new(PostgresFlightRepository::new(pool.clone(), redis.clone(), cache_ttl_seconds)),
            catalog: Arc::new(PostgresCatalogRepository::new(pool.clone())),
            bookings: Arc::new(PostgresBookingStore::new(pool.clone(), redis.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(pool)),
            mailer: Arc::new(LogMailer),
            airlines: references.clone(),
            airports: references.clone(),
            aircraft: references.clone(),
            promotions: references,
            db: Some(Arc::new(db)),
            redis: redis.map(Arc::new),
        }
    }
}

fn pricing_config(settings: &PricingSettings) -> PricingConfig {
    PricingConfig {
        economy_fallback: settings.economy_fallback,
        business_fallback: settings.business_fallback,
        infant_price: settings.infant_price,
        tax_rate: settings.tax_rate,
    }
}

impl AppState {
    /// Assembles the services. The returned worker must be spawned for side effects to run.
    pub fn build(config: &Config, run_mode: &str, backends: Backends) -> (Self, SideEffectWorker) {
        let engine = Arc::new(PricingEngine::new(pricing_config(&config.pricing)));
        let fares = FareCalculator::new(backends.catalog.clone(), engine.clone());
        let (queue, receiver) = SideEffectQueue::new(config.booking.side_effect_queue);

        let bookings = BookingOrchestrator::new(
            backends.flights.clone(),
            backends.bookings.clone(),
            fares,
            queue,
            OrchestratorConfig {
                max_passengers: config.booking.max_passengers,
                reference_length: config.booking.reference_length,
                reference_attempts: config.booking.reference_attempts,
            },
        );

        let state = Self {
            bookings,
            search: FlightSearch::new(
                backends.flights.clone(),
                backends.catalog.clone(),
                engine.clone(),
                config.search.default_limit,
                config.search.max_limit,
            ),
            inventory: SeatInventory::new(backends.flights.clone()),
            schedule: FlightSchedule::new(backends.flights.clone(), backends.aircraft.clone(), engine),
            airlines: backends.airlines,
            airports: backends.airports,
            aircraft: backends.aircraft,
            promotions: backends.promotions,
            db: backends.db,
            redis: backends.redis,
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
                expiration: config.auth.jwt_expiration_seconds,
            },
            rate_limit: config.rate_limit.clone(),
            run_mode: run_mode.to_string(),
            default_limit: config.search.default_limit,
            max_limit: config.search.max_limit,
        };

        let worker = SideEffectWorker::new(SideEffectRunner::new(backends.mailer, backends.profiles), receiver);
        (state, worker)
    }

    pub fn is_production(&self) -> bool {
        self.run_mode.eq_ignore_ascii_case("production")
    }
}

/// Picks the store for one kind of reference data out of the state.
pub trait ReferenceAccess: ReferenceEntity {
    fn store(state: &AppState) -> &Arc<dyn ReferenceStore<Self>>;
}

impl ReferenceAccess for Airline {
    fn store(state: &AppState) -> &Arc<dyn ReferenceStore<Self>> {
        &state.airlines
    }
}

impl ReferenceAccess for Airport {
    fn store(state: &AppState) -> &Arc<dyn ReferenceStore<Self>> {
        &state.airports
    }
}

impl ReferenceAccess for Aircraft {
    fn store(state: &AppState) -> &Arc<dyn ReferenceStore<Self>> {
        &state.aircraft
    }
}

impl ReferenceAccess for Promotion {
    fn store(state: &AppState) -> &Arc<dyn ReferenceStore<Self>> {
        &state.promotions
    }
}
