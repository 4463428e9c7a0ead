use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use wayfare_booking::{
    BookingConfirmation, BookingRecord, CancellationRequest, CreateBookingRequest, ETicket,
    PriceQuote, Viewer,
};
use wayfare_core::booking::{Booking, BookingFilter, BookingStatus, Passenger, PassengerUpdate};
use wayfare_shared::{ApiResponse, PageRequest};

use crate::auth::{AuthUser, MaybeUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(my_bookings))
        .route("/bookings/price-quote", post(price_quote))
        .route("/bookings/verify/{reference}", get(verify_booking))
        .route("/bookings/{booking_id}", get(get_booking))
        .route("/bookings/{booking_id}/cancel", post(cancel_booking))
        .route("/bookings/{booking_id}/passengers/{passenger_id}", patch(update_passenger))
        .route("/eticket/{reference}", get(eticket))
}

async fn create_booking(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BookingConfirmation>>)> {
    let user_id = user.map(|u| u.user_id);
    let confirmation = state.bookings.create_booking(req, user_id, Utc::now()).await?;
    info!(
        booking_id = %confirmation.booking_id,
        reference = %confirmation.booking_reference,
        guest = user_id.is_none(),
        "Booking created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Booking created successfully", confirmation)),
    ))
}

async fn price_quote(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> ApiResult<Json<ApiResponse<PriceQuote>>> {
    let quote = state.bookings.price_quote(&req, Utc::now()).await?;
    Ok(Json(ApiResponse::ok("Price calculated", quote)))
}

#[derive(Debug, Deserialize)]
struct MyBookingsParams {
    status: Option<BookingStatus>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<MyBookingsParams>,
) -> ApiResult<Json<ApiResponse<Vec<Booking>>>> {
    let page = PageRequest::new(params.page, params.limit, state.default_limit, state.max_limit);
    let filter = BookingFilter {
        user_id: Some(user.user_id),
        status: params.status,
    };
    let (items, pagination) = state.bookings.list_bookings(&filter, page).await?;
    Ok(Json(ApiResponse::paginated("Bookings retrieved", items, pagination)))
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<BookingRecord>>> {
    let viewer = if user.claims.is_admin() {
        Viewer::Admin
    } else {
        Viewer::Customer(user.user_id)
    };
    let record = state.bookings.booking_record(booking_id, viewer).await?;
    Ok(Json(ApiResponse::ok("Booking retrieved", record)))
}

async fn verify_booking(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> ApiResult<Json<ApiResponse<BookingRecord>>> {
    let record = state.bookings.booking_by_reference(&reference).await?;
    Ok(Json(ApiResponse::ok("Booking verified", record)))
}

async fn eticket(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> ApiResult<Json<ApiResponse<ETicket>>> {
    let record = state.bookings.booking_by_reference(&reference).await?;
    let ticket = ETicket::from_record(&record, Utc::now())?;
    Ok(Json(ApiResponse::ok("E-ticket generated", ticket)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CancellationRequest>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .bookings
        .request_cancellation(booking_id, user.user_id, req.reason, Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok(
        "Cancellation request submitted, awaiting review",
        booking,
    )))
}

async fn update_passenger(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((booking_id, passenger_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(update): ApiJson<PassengerUpdate>,
) -> ApiResult<Json<ApiResponse<Passenger>>> {
    let passenger = state
        .bookings
        .update_passenger(booking_id, passenger_id, user.user_id, update, Utc::now())
        .await?;
    Ok(Json(ApiResponse::ok("Passenger updated", passenger)))
}
