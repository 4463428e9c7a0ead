//! Back-office endpoints. Everything here sits behind the admin role check.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use wayfare_booking::{BookingRecord, StatusUpdateRequest, Viewer};
use wayfare_core::booking::{Booking, BookingFilter, BookingStats, BookingStatus};
use wayfare_core::catalog::Promotion;
use wayfare_core::flight::{FlightUpdate, FlightView, NewFlight};
use wayfare_core::reference::{Aircraft, Airline, Airport};
use wayfare_core::repository::ReferenceStore;
use wayfare_core::CoreError;
use wayfare_shared::{ApiResponse, PageRequest, Pagination};

use crate::auth::admin_auth_middleware;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::state::{AppState, ReferenceAccess};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(reference_routes::<Airline>("airlines"))
        .merge(reference_routes::<Airport>("airports"))
        .merge(reference_routes::<Aircraft>("aircraft"))
        .merge(reference_routes::<Promotion>("promotions"))
        .route("/admin/flights", get(list_flights).post(create_flight))
        .route("/admin/flights/{flight_id}", patch(update_flight))
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/bookings/{booking_id}", get(get_booking).delete(delete_booking))
        .route("/admin/bookings/{booking_id}/status", patch(update_status))
        .route("/admin/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Reference data (airlines, airports, aircraft, promotions)
// ============================================================================

fn reference_routes<E: ReferenceAccess>(collection: &str) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/admin/{}", collection),
            get(list_references::<E>).post(create_reference::<E>),
        )
        .route(
            &format!("/admin/{}/{{id}}", collection),
            get(get_reference::<E>)
                .put(update_reference::<E>)
                .patch(update_reference::<E>)
                .delete(delete_reference::<E>),
        )
}

async fn load_reference<E: ReferenceAccess>(state: &AppState, id: Uuid) -> ApiResult<E> {
    E::store(state)
        .get(id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("{} not found: {}", E::LABEL, id)).into())
}

fn check_input<E: ReferenceAccess>(input: &E::Input) -> ApiResult<()> {
    let errors = E::validate(input);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation(errors).into())
    }
}

async fn list_references<E: ReferenceAccess>(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<ApiResponse<Vec<E>>>> {
    let page = params.resolve(state.default_limit, state.max_limit);
    let (items, total) = E::store(&state).list(page).await?;
    Ok(Json(ApiResponse::paginated(
        format!("{} list retrieved", E::LABEL),
        items,
        Pagination::new(page, total),
    )))
}

async fn get_reference<E: ReferenceAccess>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<E>>> {
    let entity = load_reference::<E>(&state, id).await?;
    Ok(Json(ApiResponse::ok(format!("{} retrieved", E::LABEL), entity)))
}

async fn create_reference<E: ReferenceAccess>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<E::Input>,
) -> ApiResult<(StatusCode, Json<ApiResponse<E>>)> {
    check_input::<E>(&input)?;
    let entity = E::create(Uuid::new_v4(), &input, Utc::now());
    E::store(&state).insert(&entity).await?;
    info!(kind = E::LABEL, id = %entity.id(), "Reference record created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(format!("{} created", E::LABEL), entity)),
    ))
}

async fn update_reference<E: ReferenceAccess>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<E::Input>,
) -> ApiResult<Json<ApiResponse<E>>> {
    check_input::<E>(&input)?;
    let mut entity = load_reference::<E>(&state, id).await?;
    entity.update(&input, Utc::now());
    E::store(&state).update(&entity).await?;
    info!(kind = E::LABEL, %id, "Reference record updated");
    Ok(Json(ApiResponse::ok(format!("{} updated", E::LABEL), entity)))
}

#[derive(Debug, Serialize)]
struct Deleted {
    id: Uuid,
}

async fn delete_reference<E: ReferenceAccess>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    if !E::store(&state).delete(id).await? {
        return Err(CoreError::NotFound(format!("{} not found: {}", E::LABEL, id)).into());
    }
    info!(kind = E::LABEL, %id, "Reference record deleted");
    Ok(Json(ApiResponse::ok(format!("{} deleted", E::LABEL), Deleted { id })))
}

// ============================================================================
// Flights
// ============================================================================

async fn list_flights(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<ApiResponse<Vec<FlightView>>>> {
    let page = params.resolve(state.default_limit, state.max_limit);
    let (flights, total) = state.schedule.list_flights(page).await?;
    Ok(Json(ApiResponse::paginated(
        "Flights retrieved",
        flights,
        Pagination::new(page, total),
    )))
}

async fn create_flight(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewFlight>,
) -> ApiResult<(StatusCode, Json<ApiResponse<FlightView>>)> {
    let flight = state.schedule.create_flight(input, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Flight created", flight)),
    ))
}

async fn update_flight(
    State(state): State<AppState>,
    ApiPath(flight_id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<FlightUpdate>,
) -> ApiResult<Json<ApiResponse<FlightView>>> {
    let flight = state.schedule.update_flight(flight_id, update, Utc::now()).await?;
    Ok(Json(ApiResponse::ok("Flight updated", flight)))
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Deserialize)]
struct BookingListParams {
    status: Option<BookingStatus>,
    user_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_bookings(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BookingListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Booking>>>> {
    let page = PageRequest::new(params.page, params.limit, state.default_limit, state.max_limit);
    let filter = BookingFilter {
        user_id: params.user_id,
        status: params.status,
    };
    let (bookings, pagination) = state.bookings.list_bookings(&filter, page).await?;
    Ok(Json(ApiResponse::paginated("Bookings retrieved", bookings, pagination)))
}

async fn get_booking(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<BookingRecord>>> {
    let record = state.bookings.booking_record(booking_id, Viewer::Admin).await?;
    Ok(Json(ApiResponse::ok("Booking retrieved", record)))
}

async fn update_status(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .bookings
        .admin_update_status(booking_id, &req, Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("Booking status updated to {}", booking.status),
        booking,
    )))
}

async fn delete_booking(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    state.bookings.delete_booking(booking_id).await?;
    Ok(Json(ApiResponse::ok("Booking deleted", Deleted { id: booking_id })))
}

async fn stats(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<BookingStats>>> {
    let stats = state.bookings.stats().await?;
    Ok(Json(ApiResponse::ok("Booking statistics retrieved", stats)))
}
