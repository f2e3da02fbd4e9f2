//! Equipment listing model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{AvailabilityStatus, EquipmentCategory, EquipmentCondition};
use super::user::{UserClaims, UserShort};
use crate::error::{AppError, AppResult};

/// Rental rates. Only the daily rate is used for booking prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pricing {
    pub hourly: Option<Decimal>,
    pub daily: Decimal,
    pub weekly: Option<Decimal>,
    pub monthly: Option<Decimal>,
}

impl Pricing {
    fn check(&self) -> AppResult<()> {
        ensure_non_negative("pricing.daily", Some(self.daily))?;
        ensure_non_negative("pricing.hourly", self.hourly)?;
        ensure_non_negative("pricing.weekly", self.weekly)?;
        ensure_non_negative("pricing.monthly", self.monthly)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Specifications {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub horsepower: Option<String>,
    pub capacity: Option<String>,
    #[serde(default)]
    pub condition: EquipmentCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Review attached to a listing
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentReview {
    pub id: i32,
    pub user_id: i32,
    /// Reviewer display name
    pub user_name: Option<String>,
    /// Set when the review was left through a completed booking
    pub booking_id: Option<i32>,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Internal row structure for equipment queries joined with the owner
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    id: i32,
    owner_id: i32,
    owner_name: Option<String>,
    owner_phone: Option<String>,
    owner_email: Option<String>,
    name: String,
    category: EquipmentCategory,
    equipment_type: String,
    description: String,
    brand: Option<String>,
    model: Option<String>,
    model_year: Option<i32>,
    horsepower: Option<String>,
    capacity: Option<String>,
    equipment_condition: EquipmentCondition,
    hourly_rate: Option<Decimal>,
    daily_rate: Decimal,
    weekly_rate: Option<Decimal>,
    monthly_rate: Option<Decimal>,
    availability_status: AvailabilityStatus,
    address: Option<String>,
    village: Option<String>,
    district: Option<String>,
    state: Option<String>,
    pincode: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    images: Vec<String>,
    operator_included: bool,
    operator_charge: Option<Decimal>,
    deposit: Decimal,
    min_rental_period: String,
    features: Vec<String>,
    average_rating: f64,
    total_bookings: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Equipment {
            id: row.id,
            owner_id: row.owner_id,
            owner: Some(UserShort {
                id: row.owner_id,
                name: row.owner_name,
                phone: row.owner_phone,
                email: row.owner_email,
            }),
            name: row.name,
            category: row.category,
            equipment_type: row.equipment_type,
            description: row.description,
            specifications: Specifications {
                brand: row.brand,
                model: row.model,
                year: row.model_year,
                horsepower: row.horsepower,
                capacity: row.capacity,
                condition: row.equipment_condition,
            },
            pricing: Pricing {
                hourly: row.hourly_rate,
                daily: row.daily_rate,
                weekly: row.weekly_rate,
                monthly: row.monthly_rate,
            },
            availability_status: row.availability_status,
            location: Location {
                address: row.address,
                village: row.village,
                district: row.district,
                state: row.state,
                pincode: row.pincode,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            images: row.images,
            operator_included: row.operator_included,
            operator_charge: row.operator_charge,
            deposit: row.deposit,
            min_rental_period: row.min_rental_period,
            features: row.features,
            reviews: Vec::new(),
            average_rating: row.average_rating,
            total_bookings: row.total_bookings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Full equipment listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: i32,
    pub owner_id: i32,
    pub owner: Option<UserShort>,
    pub name: String,
    pub category: EquipmentCategory,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub description: String,
    pub specifications: Specifications,
    pub pricing: Pricing,
    pub availability_status: AvailabilityStatus,
    pub location: Location,
    pub images: Vec<String>,
    pub operator_included: bool,
    /// Per-day operator charge, applied only when an operator is included
    pub operator_charge: Option<Decimal>,
    pub deposit: Decimal,
    pub min_rental_period: String,
    pub features: Vec<String>,
    pub reviews: Vec<EquipmentReview>,
    pub average_rating: f64,
    pub total_bookings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Only the listing owner or an admin may change a listing
    pub fn ensure_manageable_by(&self, claims: &UserClaims) -> AppResult<()> {
        if self.owner_id == claims.user_id || claims.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Not authorized to manage this equipment".to_string(),
            ))
        }
    }

    /// New bookings are only taken while the listing is Available
    pub fn ensure_bookable(&self) -> AppResult<()> {
        if self.availability_status == AvailabilityStatus::Available {
            Ok(())
        } else {
            Err(AppError::InvalidState(
                "Equipment is not available for booking".to_string(),
            ))
        }
    }

    /// Listings with Pending, Confirmed or Active bookings cannot be removed
    pub fn ensure_deletable(&self, open_bookings: i64) -> AppResult<()> {
        if open_bookings > 0 {
            return Err(AppError::InvalidState(format!(
                "Equipment has {} open booking(s) and cannot be deleted",
                open_bookings
            )));
        }
        Ok(())
    }

    /// Merge a partial update. Nested groups replace the whole group.
    pub fn apply_update(&mut self, data: UpdateEquipment) {
        if let Some(name) = data.name {
            self.name = name.trim().to_string();
        }
        if let Some(category) = data.category {
            self.category = category;
        }
        if let Some(equipment_type) = data.equipment_type {
            self.equipment_type = equipment_type;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(specifications) = data.specifications {
            self.specifications = specifications;
        }
        if let Some(pricing) = data.pricing {
            self.pricing = pricing;
        }
        if let Some(status) = data.availability_status {
            self.availability_status = status;
        }
        if let Some(location) = data.location {
            self.location = location;
        }
        if let Some(images) = data.images {
            self.images = images;
        }
        if let Some(operator_included) = data.operator_included {
            self.operator_included = operator_included;
        }
        if data.operator_charge.is_some() {
            self.operator_charge = data.operator_charge;
        }
        if let Some(deposit) = data.deposit {
            self.deposit = deposit;
        }
        if let Some(period) = data.min_rental_period {
            self.min_rental_period = period;
        }
        if let Some(features) = data.features {
            self.features = features;
        }
    }
}

/// Mean of the ratings rounded to one decimal, 0 when there are none
pub fn average_rating(ratings: &[i16]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    let mean = sum / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn ensure_non_negative(field: &str, value: Option<Decimal>) -> AppResult<()> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(AppError::Validation(format!(
            "{} must not be negative",
            field
        ))),
        _ => Ok(()),
    }
}

/// Equipment listing summary embedded in bookings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSummary {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub category: EquipmentCategory,
    pub images: Vec<String>,
    pub pricing: Pricing,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Please provide equipment name"))]
    pub name: String,
    pub category: EquipmentCategory,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Please provide equipment type"))]
    pub equipment_type: String,
    #[validate(length(min = 1, message = "Please provide a description"))]
    pub description: String,
    pub specifications: Option<Specifications>,
    pub pricing: Pricing,
    pub availability_status: Option<AvailabilityStatus>,
    pub location: Option<Location>,
    pub images: Option<Vec<String>>,
    pub operator_included: Option<bool>,
    pub operator_charge: Option<Decimal>,
    pub deposit: Decimal,
    pub min_rental_period: Option<String>,
    pub features: Option<Vec<String>>,
}

impl CreateEquipment {
    /// Trim the name and check money amounts
    pub fn normalize(mut self) -> AppResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(AppError::Validation("Please provide equipment name".to_string()));
        }
        self.pricing.check()?;
        ensure_non_negative("operatorCharge", self.operator_charge)?;
        ensure_non_negative("deposit", Some(self.deposit))?;
        Ok(self)
    }
}

/// Update equipment request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipment {
    #[validate(length(min = 1, message = "Equipment name must not be empty"))]
    pub name: Option<String>,
    pub category: Option<EquipmentCategory>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<Specifications>,
    pub pricing: Option<Pricing>,
    pub availability_status: Option<AvailabilityStatus>,
    pub location: Option<Location>,
    pub images: Option<Vec<String>>,
    pub operator_included: Option<bool>,
    pub operator_charge: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub min_rental_period: Option<String>,
    pub features: Option<Vec<String>>,
}

impl UpdateEquipment {
    pub fn check(&self) -> AppResult<()> {
        if let Some(pricing) = &self.pricing {
            pricing.check()?;
        }
        ensure_non_negative("operatorCharge", self.operator_charge)?;
        ensure_non_negative("deposit", self.deposit)
    }
}

/// Catalog filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    /// Exact category
    pub category: Option<EquipmentCategory>,
    /// Case-insensitive substring of the district
    pub district: Option<String>,
    /// Only listings currently Available
    pub available: Option<bool>,
    /// Case-insensitive substring of name, type or description
    pub search: Option<String>,
    /// Inclusive lower bound on the daily rate
    pub min_price: Option<f64>,
    /// Inclusive upper bound on the daily rate
    pub max_price: Option<f64>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

/// Review request, shared by listings and completed bookings
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReview {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub comment: Option<String>,
}
