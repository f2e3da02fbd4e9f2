//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, equipment, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgriRent API",
        version = "1.0.0",
        description = "Agricultural equipment rental marketplace REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::my_listings,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::add_review,
        // Bookings
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::confirm_booking,
        bookings::start_booking,
        bookings::reject_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::record_payment,
        bookings::add_review,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::EquipmentCategory,
            crate::models::enums::AvailabilityStatus,
            crate::models::enums::EquipmentCondition,
            crate::models::enums::BookingStatus,
            crate::models::enums::PaymentStatus,
            crate::models::enums::DeliveryType,
            // Users
            crate::models::user::UserShort,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentSummary,
            crate::models::equipment::EquipmentReview,
            crate::models::equipment::Pricing,
            crate::models::equipment::Specifications,
            crate::models::equipment::Location,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::CreateReview,
            // Bookings
            crate::models::booking::Booking,
            crate::models::booking::BookingDetails,
            crate::models::booking::BookingPricing,
            crate::models::booking::Payment,
            crate::models::booking::DeliveryAddress,
            crate::models::booking::BookingReview,
            crate::models::booking::CreateBooking,
            crate::models::booking::CancelBooking,
            crate::models::booking::RecordPayment,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment catalog"),
        (name = "bookings", description = "Booking lifecycle")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
