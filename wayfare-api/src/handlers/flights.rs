use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use wayfare_catalog::{FlightDetail, SeatAvailability, SeatSummary};
use wayfare_core::flight::CabinClass;
use wayfare_core::search::{FlightOption, FlightSearchQuery};
use wayfare_core::CoreError;
use wayfare_shared::ApiResponse;

use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/search", get(search_flights))
        .route("/flights/{flight_id}", get(flight_detail))
        .route("/flights/{flight_id}/seats/summary", get(seat_summary))
        .route("/flights/{flight_id}/availability", get(availability))
}

async fn search_flights(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FlightSearchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<FlightOption>>>> {
    let (options, pagination) = state.search.search(&query, Utc::now()).await?;
    tracing::debug!(
        from = %query.departure_airport_code,
        to = %query.arrival_airport_code,
        date = %query.departure_date,
        total = pagination.total,
        "Flight search"
    );
    Ok(Json(ApiResponse::paginated("Flights retrieved", options, pagination)))
}

async fn flight_detail(
    State(state): State<AppState>,
    ApiPath(flight_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<FlightDetail>>> {
    let detail = state.search.flight_detail(flight_id).await?;
    Ok(Json(ApiResponse::ok("Flight retrieved", detail)))
}

async fn seat_summary(
    State(state): State<AppState>,
    ApiPath(flight_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<SeatSummary>>> {
    let summary = state
        .inventory
        .flight_seat_summary(flight_id)
        .await
        .map_err(CoreError::from)?;
    Ok(Json(ApiResponse::ok("Seat summary retrieved", summary)))
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    class_code: Option<CabinClass>,
    count: Option<i64>,
}

async fn availability(
    State(state): State<AppState>,
    ApiPath(flight_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<AvailabilityParams>,
) -> ApiResult<Json<ApiResponse<SeatAvailability>>> {
    let count = params.count.unwrap_or(1);
    if count < 1 {
        return Err(CoreError::BadRequest("count must be at least 1".to_string()).into());
    }
    let availability = state
        .inventory
        .check_availability(flight_id, params.class_code.unwrap_or_default(), count)
        .await
        .map_err(CoreError::from)?;
    Ok(Json(ApiResponse::ok("Availability checked", availability)))
}
