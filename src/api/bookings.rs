//! Booking API endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            Booking, BookingAction, BookingDetails, BookingQuery, CancelBooking, CreateBooking,
            RecordPayment,
        },
        equipment::CreateReview,
        pagination::PageRequest,
    },
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// Request a booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created as Pending", body = BookingDetails),
        (status = 400, description = "Invalid period or equipment not available", body = crate::error::ErrorResponse),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(data): ValidatedJson<CreateBooking>,
) -> AppResult<(StatusCode, ApiResponse<BookingDetails>)> {
    let booking = state.services.bookings.create(&claims, data).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(booking, "Booking created successfully"),
    ))
}

/// List the caller's bookings (owned listings for owners, rentals otherwise)
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(BookingQuery),
    responses(
        (status = 200, description = "Page of bookings in `data`, with `count` and `total`", body = Vec<BookingDetails>)
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookingQuery>,
) -> AppResult<ApiResponse<Vec<BookingDetails>>> {
    let page = PageRequest::new(query.page, query.per_page);
    let (bookings, total) = state.services.bookings.list(&claims, page).await?;
    Ok(ApiResponse::page(bookings, total))
}

/// Get a booking
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = BookingDetails),
        (status = 401, description = "Not a party to the booking", body = crate::error::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<BookingDetails>> {
    let booking = state.services.bookings.get(&claims, id).await?;
    Ok(ApiResponse::data(booking))
}

/// Confirm a pending booking (owner)
#[utoipa::path(
    put,
    path = "/bookings/{id}/confirm",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking confirmed, equipment Rented", body = Booking),
        (status = 400, description = "Not pending or equipment not available", body = crate::error::ErrorResponse),
        (status = 401, description = "Not the owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .bookings
        .apply(&claims, id, BookingAction::Confirm)
        .await?;
    Ok(ApiResponse::with_message(booking, "Booking confirmed successfully"))
}

/// Hand over the equipment (owner)
#[utoipa::path(
    put,
    path = "/bookings/{id}/start",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking active", body = Booking),
        (status = 400, description = "Not confirmed", body = crate::error::ErrorResponse)
    )
)]
pub async fn start_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .bookings
        .apply(&claims, id, BookingAction::Start)
        .await?;
    Ok(ApiResponse::with_message(booking, "Booking started successfully"))
}

/// Decline a pending booking (owner)
#[utoipa::path(
    put,
    path = "/bookings/{id}/reject",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking rejected", body = Booking),
        (status = 400, description = "Not pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .bookings
        .apply(&claims, id, BookingAction::Reject)
        .await?;
    Ok(ApiResponse::with_message(booking, "Booking rejected"))
}

/// Cancel a booking (renter or owner)
#[utoipa::path(
    put,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body(content = CancelBooking, description = "Optional reason"),
    responses(
        (status = 200, description = "Booking cancelled, equipment Available", body = Booking),
        (status = 400, description = "Malformed body", body = crate::error::ErrorResponse),
        (status = 401, description = "Not a party to the booking", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<ApiResponse<Booking>> {
    // An empty body means no reason; anything else must parse
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        CancelBooking::default()
    } else {
        serde_json::from_slice::<CancelBooking>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))?
    };
    body.validate()?;
    let booking = state
        .services
        .bookings
        .apply(&claims, id, BookingAction::Cancel { reason: body.reason })
        .await?;
    Ok(ApiResponse::with_message(booking, "Booking cancelled successfully"))
}

/// Mark a booking as completed (owner)
#[utoipa::path(
    put,
    path = "/bookings/{id}/complete",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking completed, equipment Available", body = Booking),
        (status = 400, description = "Not confirmed or active", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .bookings
        .apply(&claims, id, BookingAction::Complete)
        .await?;
    Ok(ApiResponse::with_message(booking, "Booking completed successfully"))
}

/// Record the renter's payment
#[utoipa::path(
    put,
    path = "/bookings/{id}/payment",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = RecordPayment,
    responses(
        (status = 200, description = "Payment recorded", body = Booking),
        (status = 400, description = "Booking closed or already paid", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<RecordPayment>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state
        .services
        .bookings
        .record_payment(&claims, id, request)
        .await?;
    Ok(ApiResponse::with_message(booking, "Payment recorded successfully"))
}

/// Review a completed booking (renter)
#[utoipa::path(
    post,
    path = "/bookings/{id}/review",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review added", body = Booking),
        (status = 400, description = "Not completed or already reviewed", body = crate::error::ErrorResponse),
        (status = 404, description = "Booking or equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(review): ValidatedJson<CreateReview>,
) -> AppResult<(StatusCode, ApiResponse<Booking>)> {
    let booking = state
        .services
        .bookings
        .add_review(&claims, id, &review)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(booking, "Review added successfully"),
    ))
}
