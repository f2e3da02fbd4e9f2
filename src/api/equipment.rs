//! Equipment catalog API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    error::AppResult,
    models::equipment::{CreateEquipment, CreateReview, Equipment, EquipmentQuery, UpdateEquipment},
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// Search the equipment catalog
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Page of listings in `data`, with `count` and `total`", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<ApiResponse<Vec<Equipment>>> {
    let (items, total) = state.services.equipment.search(&query).await?;
    Ok(ApiResponse::page(items, total))
}

/// Get a listing with its reviews and owner
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Equipment>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(ApiResponse::data(equipment))
}

/// Listings owned by the caller
#[utoipa::path(
    get,
    path = "/equipment/my/listings",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's listings", body = Vec<Equipment>),
        (status = 403, description = "Role not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_listings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<Vec<Equipment>>> {
    let items = state.services.equipment.my_listings(&claims).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::page(items, total))
}

/// Create a listing
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid listing", body = crate::error::ErrorResponse),
        (status = 403, description = "Role not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(data): ValidatedJson<CreateEquipment>,
) -> AppResult<(StatusCode, ApiResponse<Equipment>)> {
    let equipment = state.services.equipment.create(&claims, data).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(equipment, "Equipment listed successfully"),
    ))
}

/// Update a listing
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 401, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(data): ValidatedJson<UpdateEquipment>,
) -> AppResult<ApiResponse<Equipment>> {
    let equipment = state.services.equipment.update(&claims, id, data).await?;
    Ok(ApiResponse::with_message(equipment, "Equipment updated successfully"))
}

/// Delete a listing
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment deleted"),
        (status = 400, description = "Open bookings exist", body = crate::error::ErrorResponse),
        (status = 401, description = "Not the owner", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    state.services.equipment.delete(&claims, id).await?;
    Ok(ApiResponse::message("Equipment deleted successfully"))
}

/// Review a listing
#[utoipa::path(
    post,
    path = "/equipment/{id}/review",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review added", body = Equipment),
        (status = 400, description = "Already reviewed or invalid rating", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(review): ValidatedJson<CreateReview>,
) -> AppResult<(StatusCode, ApiResponse<Equipment>)> {
    let equipment = state.services.equipment.add_review(&claims, id, &review).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(equipment, "Review added successfully"),
    ))
}
