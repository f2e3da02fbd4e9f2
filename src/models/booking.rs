//! Booking model, pricing and lifecycle rules

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{AvailabilityStatus, BookingStatus, DeliveryType, PaymentStatus};
use super::equipment::{Equipment, EquipmentSummary};
use super::user::{UserClaims, UserShort};
use crate::error::{AppError, AppResult};

/// One day in milliseconds
pub const DAY_MS: i64 = 86_400_000;

pub const DEFAULT_CANCELLATION_REASON: &str = "No reason provided";

/// Price snapshot taken when the booking is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingPricing {
    pub base_rate: Decimal,
    pub operator_charge: Decimal,
    pub deposit: Decimal,
    pub total_amount: Decimal,
}

impl BookingPricing {
    /// Daily rate times duration, plus the operator charge when requested and
    /// offered, plus the deposit.
    pub fn quote(equipment: &Equipment, duration: i32, operator_required: bool) -> Self {
        let days = Decimal::from(duration);
        let base_rate = equipment.pricing.daily * days;
        let operator_charge = if operator_required && equipment.operator_included {
            equipment.operator_charge.unwrap_or(Decimal::ZERO) * days
        } else {
            Decimal::ZERO
        };
        let deposit = equipment.deposit;

        Self {
            base_rate,
            operator_charge,
            deposit,
            total_amount: base_rate + operator_charge + deposit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookingReview {
    pub rating: i16,
    pub comment: Option<String>,
    pub date: DateTime<Utc>,
}

/// Internal row structure for booking queries
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    id: i32,
    equipment_id: Option<i32>,
    renter_id: i32,
    owner_id: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    duration_days: i32,
    base_rate: Decimal,
    operator_charge: Decimal,
    deposit: Decimal,
    total_amount: Decimal,
    operator_required: bool,
    status: BookingStatus,
    payment_method: Option<String>,
    payment_status: PaymentStatus,
    transaction_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    delivery_street: Option<String>,
    delivery_village: Option<String>,
    delivery_district: Option<String>,
    delivery_pincode: Option<String>,
    delivery_type: DeliveryType,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    review_rating: Option<i16>,
    review_comment: Option<String>,
    review_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        let review = match (row.review_rating, row.review_date) {
            (Some(rating), Some(date)) => Some(BookingReview {
                rating,
                comment: row.review_comment,
                date,
            }),
            _ => None,
        };

        Booking {
            id: row.id,
            equipment_id: row.equipment_id,
            renter_id: row.renter_id,
            owner_id: row.owner_id,
            start_date: row.start_date,
            end_date: row.end_date,
            duration: row.duration_days,
            pricing: BookingPricing {
                base_rate: row.base_rate,
                operator_charge: row.operator_charge,
                deposit: row.deposit,
                total_amount: row.total_amount,
            },
            operator_required: row.operator_required,
            status: row.status,
            payment: Payment {
                method: row.payment_method,
                status: row.payment_status,
                transaction_id: row.transaction_id,
                paid_at: row.paid_at,
            },
            delivery_address: DeliveryAddress {
                street: row.delivery_street,
                village: row.delivery_village,
                district: row.delivery_district,
                pincode: row.delivery_pincode,
            },
            delivery_type: row.delivery_type,
            notes: row.notes,
            cancellation_reason: row.cancellation_reason,
            review,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Booking record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i32,
    /// Null once the listing has been deleted
    pub equipment_id: Option<i32>,
    pub renter_id: i32,
    pub owner_id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Whole days, rounded up
    pub duration: i32,
    pub pricing: BookingPricing,
    pub operator_required: bool,
    pub status: BookingStatus,
    pub payment: Payment,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub review: Option<BookingReview>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking with its references expanded for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub equipment: Option<EquipmentSummary>,
    pub renter: Option<UserShort>,
    pub owner: Option<UserShort>,
}

/// Lifecycle operations driven by the owner or the renter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingAction {
    Confirm,
    Start,
    Reject,
    Cancel { reason: Option<String> },
    Complete,
}

impl BookingAction {
    pub fn name(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Start => "start",
            BookingAction::Reject => "reject",
            BookingAction::Cancel { .. } => "cancel",
            BookingAction::Complete => "complete",
        }
    }
}

/// Changes to write for one lifecycle step, on the booking and on its equipment
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: BookingStatus,
    /// New equipment availability, if the equipment is touched
    pub availability: Option<AvailabilityStatus>,
    /// Increment the equipment's completed-bookings counter
    pub count_completion: bool,
    pub cancellation_reason: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

impl Transition {
    fn to(status: BookingStatus) -> Self {
        Self {
            status,
            availability: None,
            count_completion: false,
            cancellation_reason: None,
            payment_status: None,
        }
    }
}

impl Booking {
    fn ensure_owner(&self, user_id: i32) -> AppResult<()> {
        if self.owner_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization("Not authorized".to_string()))
        }
    }

    fn ensure_renter(&self, user_id: i32) -> AppResult<()> {
        if self.renter_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization("Not authorized".to_string()))
        }
    }

    fn ensure_party(&self, user_id: i32) -> AppResult<()> {
        if self.renter_id == user_id || self.owner_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization("Not authorized".to_string()))
        }
    }

    /// Renter, owner and admins may read a booking
    pub fn ensure_visible_to(&self, claims: &UserClaims) -> AppResult<()> {
        if claims.is_admin() {
            return Ok(());
        }
        self.ensure_party(claims.user_id)
    }

    fn ensure_status(&self, allowed: &[BookingStatus], action: &str) -> AppResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "Cannot {} a {} booking",
                action,
                self.status.as_str().to_lowercase()
            )))
        }
    }

    /// Decide the outcome of a lifecycle action against the locked booking and
    /// the current availability of its equipment (`None` when the listing no
    /// longer exists). Identity is checked before state.
    pub fn plan(
        &self,
        action: &BookingAction,
        user_id: i32,
        equipment: Option<AvailabilityStatus>,
    ) -> AppResult<Transition> {
        match action {
            BookingAction::Confirm => {
                self.ensure_owner(user_id)?;
                self.ensure_status(&[BookingStatus::Pending], "confirm")?;
                match equipment {
                    None => Err(AppError::NotFound("Equipment no longer exists".to_string())),
                    Some(AvailabilityStatus::Available) => Ok(Transition {
                        availability: Some(AvailabilityStatus::Rented),
                        ..Transition::to(BookingStatus::Confirmed)
                    }),
                    Some(other) => Err(AppError::InvalidState(format!(
                        "Equipment is {} and cannot be rented",
                        other.as_str().to_lowercase()
                    ))),
                }
            }
            BookingAction::Start => {
                self.ensure_owner(user_id)?;
                self.ensure_status(&[BookingStatus::Confirmed], "start")?;
                Ok(Transition::to(BookingStatus::Active))
            }
            BookingAction::Reject => {
                self.ensure_owner(user_id)?;
                self.ensure_status(&[BookingStatus::Pending], "reject")?;
                Ok(Transition::to(BookingStatus::Rejected))
            }
            BookingAction::Cancel { reason } => {
                self.ensure_party(user_id)?;
                let reason = reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_CANCELLATION_REASON);
                let payment_status = (self.payment.status == PaymentStatus::Paid)
                    .then_some(PaymentStatus::Refunded);
                Ok(Transition {
                    availability: equipment.map(|_| AvailabilityStatus::Available),
                    cancellation_reason: Some(reason.to_string()),
                    payment_status,
                    ..Transition::to(BookingStatus::Cancelled)
                })
            }
            BookingAction::Complete => {
                self.ensure_owner(user_id)?;
                self.ensure_status(&[BookingStatus::Confirmed, BookingStatus::Active], "complete")?;
                Ok(Transition {
                    availability: equipment.map(|_| AvailabilityStatus::Available),
                    count_completion: equipment.is_some(),
                    ..Transition::to(BookingStatus::Completed)
                })
            }
        }
    }

    /// Payment the renter records against the booking
    pub fn plan_payment(&self, user_id: i32, request: RecordPayment) -> AppResult<Payment> {
        self.ensure_renter(user_id)?;
        if matches!(self.status, BookingStatus::Cancelled | BookingStatus::Rejected) {
            return Err(AppError::InvalidState(format!(
                "Cannot pay for a {} booking",
                self.status.as_str().to_lowercase()
            )));
        }
        if self.payment.status != PaymentStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Payment is already {}",
                self.payment.status.as_str().to_lowercase()
            )));
        }

        let transaction_id = request
            .transaction_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("txn_{}", uuid::Uuid::new_v4().simple()));

        Ok(Payment {
            method: Some(request.method),
            status: PaymentStatus::Paid,
            transaction_id: Some(transaction_id),
            paid_at: Some(Utc::now()),
        })
    }

    /// Only the renter of a completed booking may review it, once
    pub fn ensure_reviewable_by(&self, user_id: i32) -> AppResult<()> {
        self.ensure_renter(user_id)?;
        if self.status != BookingStatus::Completed {
            return Err(AppError::InvalidState(
                "Can only review completed bookings".to_string(),
            ));
        }
        if self.review.is_some() {
            return Err(AppError::InvalidState("Booking already reviewed".to_string()));
        }
        Ok(())
    }
}

/// Whole days between two instants, rounded up. The end must be after the start.
pub fn duration_days(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<i32> {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return Err(AppError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    let days = (millis + DAY_MS - 1) / DAY_MS;
    i32::try_from(days).map_err(|_| AppError::Validation("Booking period is too long".to_string()))
}

/// Accepts RFC 3339 instants, `YYYY-MM-DDTHH:MM[:SS]` (UTC) and plain
/// `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_booking_date(value: &str) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid date: {}", value)))
}

/// Create booking request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub equipment_id: i32,
    /// RFC 3339 or YYYY-MM-DD
    pub start_date: String,
    /// RFC 3339 or YYYY-MM-DD
    pub end_date: String,
    #[serde(default)]
    pub operator_required: bool,
    pub delivery_address: Option<DeliveryAddress>,
    pub delivery_type: Option<DeliveryType>,
    #[validate(length(max = 2000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

/// Booking data ready to insert
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub equipment_id: i32,
    pub renter_id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration: i32,
    pub operator_required: bool,
    pub delivery_address: DeliveryAddress,
    pub delivery_type: DeliveryType,
    pub notes: Option<String>,
}

/// Cancel booking request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBooking {
    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
}

/// Record payment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub method: String,
    /// Generated when omitted
    pub transaction_id: Option<String>,
}

/// Query parameters for booking lists
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::tests::sample_equipment;
    use chrono::Duration;

    const OWNER: i32 = 10;
    const RENTER: i32 = 20;
    const STRANGER: i32 = 30;

    fn booking(status: BookingStatus) -> Booking {
        let start = Utc::now();
        Booking {
            id: 1,
            equipment_id: Some(1),
            renter_id: RENTER,
            owner_id: OWNER,
            start_date: start,
            end_date: start + Duration::days(3),
            duration: 3,
            pricing: BookingPricing {
                base_rate: Decimal::from(150),
                operator_charge: Decimal::ZERO,
                deposit: Decimal::from(20),
                total_amount: Decimal::from(170),
            },
            operator_required: false,
            status,
            payment: Payment {
                method: None,
                status: PaymentStatus::Pending,
                transaction_id: None,
                paid_at: None,
            },
            delivery_address: DeliveryAddress::default(),
            delivery_type: DeliveryType::Pickup,
            notes: None,
            cancellation_reason: None,
            review: None,
            created_at: start,
            updated_at: start,
        }
    }

    const AVAILABLE: Option<AvailabilityStatus> = Some(AvailabilityStatus::Available);
    const RENTED: Option<AvailabilityStatus> = Some(AvailabilityStatus::Rented);

    #[test]
    fn test_quote_without_operator() {
        let equipment = sample_equipment();
        let pricing = BookingPricing::quote(&equipment, 3, false);
        assert_eq!(pricing.base_rate, Decimal::from(150));
        assert_eq!(pricing.operator_charge, Decimal::ZERO);
        assert_eq!(pricing.deposit, Decimal::from(20));
        assert_eq!(pricing.total_amount, Decimal::from(170));
    }

    #[test]
    fn test_operator_charge_needs_request_and_offer() {
        let mut equipment = sample_equipment();
        equipment.operator_charge = Some(Decimal::from(15));

        // Requested but not offered
        assert_eq!(
            BookingPricing::quote(&equipment, 2, true).operator_charge,
            Decimal::ZERO
        );

        equipment.operator_included = true;
        // Offered but not requested
        assert_eq!(
            BookingPricing::quote(&equipment, 2, false).operator_charge,
            Decimal::ZERO
        );

        let pricing = BookingPricing::quote(&equipment, 2, true);
        assert_eq!(pricing.operator_charge, Decimal::from(30));
        assert_eq!(pricing.total_amount, Decimal::from(100 + 30 + 20));
    }

    #[test]
    fn test_operator_included_without_charge_costs_nothing() {
        let mut equipment = sample_equipment();
        equipment.operator_included = true;
        equipment.operator_charge = None;
        assert_eq!(
            BookingPricing::quote(&equipment, 4, true).operator_charge,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_duration_rounds_partial_days_up() {
        let start = parse_booking_date("2024-06-01").unwrap();
        assert_eq!(duration_days(start, start + Duration::days(3)).unwrap(), 3);
        assert_eq!(duration_days(start, start + Duration::hours(60)).unwrap(), 3);
        assert_eq!(duration_days(start, start + Duration::milliseconds(1)).unwrap(), 1);
    }

    #[test]
    fn test_duration_rejects_empty_or_reversed_period() {
        let start = parse_booking_date("2024-06-01").unwrap();
        assert!(matches!(duration_days(start, start), Err(AppError::Validation(_))));
        assert!(matches!(
            duration_days(start, start - Duration::days(1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_booking_date_formats() {
        let midnight = parse_booking_date("2024-06-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        let offset = parse_booking_date("2024-06-01T10:00:00+05:30").unwrap();
        assert_eq!(offset.to_rfc3339(), "2024-06-01T04:30:00+00:00");
        let local = parse_booking_date("2024-06-01T08:15").unwrap();
        assert_eq!(local.to_rfc3339(), "2024-06-01T08:15:00+00:00");
        assert!(parse_booking_date("next tuesday").is_err());
    }

    #[test]
    fn test_confirm_is_owner_only_and_rents_equipment() {
        let pending = booking(BookingStatus::Pending);
        for caller in [RENTER, STRANGER] {
            assert!(matches!(
                pending.plan(&BookingAction::Confirm, caller, AVAILABLE),
                Err(AppError::Authorization(_))
            ));
        }

        let transition = pending.plan(&BookingAction::Confirm, OWNER, AVAILABLE).unwrap();
        assert_eq!(transition.status, BookingStatus::Confirmed);
        assert_eq!(transition.availability, Some(AvailabilityStatus::Rented));
        assert!(!transition.count_completion);
    }

    #[test]
    fn test_double_confirm_is_rejected() {
        let confirmed = booking(BookingStatus::Confirmed);
        assert!(matches!(
            confirmed.plan(&BookingAction::Confirm, OWNER, RENTED),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_confirm_requires_available_equipment() {
        let pending = booking(BookingStatus::Pending);
        assert!(matches!(
            pending.plan(&BookingAction::Confirm, OWNER, RENTED),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            pending.plan(
                &BookingAction::Confirm,
                OWNER,
                Some(AvailabilityStatus::Maintenance)
            ),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            pending.plan(&BookingAction::Confirm, OWNER, None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_cancel_by_either_party_from_any_status_reopens_equipment() {
        let statuses = [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Active,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::Rejected,
        ];
        for status in statuses {
            for caller in [RENTER, OWNER] {
                let transition = booking(status)
                    .plan(&BookingAction::Cancel { reason: None }, caller, RENTED)
                    .unwrap();
                assert_eq!(transition.status, BookingStatus::Cancelled);
                assert_eq!(transition.availability, Some(AvailabilityStatus::Available));
            }
        }
    }

    #[test]
    fn test_cancel_reason_defaults_and_stranger_is_refused() {
        let pending = booking(BookingStatus::Pending);
        let transition = pending
            .plan(&BookingAction::Cancel { reason: Some("  ".into()) }, RENTER, AVAILABLE)
            .unwrap();
        assert_eq!(
            transition.cancellation_reason.as_deref(),
            Some(DEFAULT_CANCELLATION_REASON)
        );

        let transition = pending
            .plan(
                &BookingAction::Cancel { reason: Some("Rain delayed sowing".into()) },
                OWNER,
                AVAILABLE,
            )
            .unwrap();
        assert_eq!(transition.cancellation_reason.as_deref(), Some("Rain delayed sowing"));

        assert!(matches!(
            pending.plan(&BookingAction::Cancel { reason: None }, STRANGER, AVAILABLE),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_cancel_refunds_paid_booking() {
        let mut paid = booking(BookingStatus::Confirmed);
        paid.payment.status = PaymentStatus::Paid;
        let transition = paid
            .plan(&BookingAction::Cancel { reason: None }, RENTER, RENTED)
            .unwrap();
        assert_eq!(transition.payment_status, Some(PaymentStatus::Refunded));

        let unpaid = booking(BookingStatus::Confirmed);
        let transition = unpaid
            .plan(&BookingAction::Cancel { reason: None }, RENTER, RENTED)
            .unwrap();
        assert_eq!(transition.payment_status, None);
    }

    #[test]
    fn test_complete_counts_booking_and_reopens_equipment() {
        for status in [BookingStatus::Confirmed, BookingStatus::Active] {
            let transition = booking(status)
                .plan(&BookingAction::Complete, OWNER, RENTED)
                .unwrap();
            assert_eq!(transition.status, BookingStatus::Completed);
            assert_eq!(transition.availability, Some(AvailabilityStatus::Available));
            assert!(transition.count_completion);
        }
    }

    #[test]
    fn test_complete_guards() {
        assert!(matches!(
            booking(BookingStatus::Confirmed).plan(&BookingAction::Complete, RENTER, RENTED),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            booking(BookingStatus::Pending).plan(&BookingAction::Complete, OWNER, AVAILABLE),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_start_and_reject() {
        let transition = booking(BookingStatus::Confirmed)
            .plan(&BookingAction::Start, OWNER, RENTED)
            .unwrap();
        assert_eq!(transition.status, BookingStatus::Active);
        assert_eq!(transition.availability, None);

        let transition = booking(BookingStatus::Pending)
            .plan(&BookingAction::Reject, OWNER, AVAILABLE)
            .unwrap();
        assert_eq!(transition.status, BookingStatus::Rejected);
        assert_eq!(transition.availability, None);

        assert!(matches!(
            booking(BookingStatus::Confirmed).plan(&BookingAction::Reject, OWNER, RENTED),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            booking(BookingStatus::Pending).plan(&BookingAction::Start, RENTER, AVAILABLE),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_end_to_end_lifecycle() {
        let equipment = sample_equipment();
        let start = parse_booking_date("2024-06-01").unwrap();
        let end = parse_booking_date("2024-06-04").unwrap();
        let duration = duration_days(start, end).unwrap();
        let pricing = BookingPricing::quote(&equipment, duration, false);
        assert_eq!(pricing.total_amount, Decimal::from(170));

        let mut current = booking(BookingStatus::Pending);
        let mut availability = equipment.availability_status;
        let mut total_bookings = equipment.total_bookings;

        let confirm = current
            .plan(&BookingAction::Confirm, OWNER, Some(availability))
            .unwrap();
        current.status = confirm.status;
        availability = confirm.availability.unwrap();
        assert_eq!(availability, AvailabilityStatus::Rented);

        let complete = current
            .plan(&BookingAction::Complete, OWNER, Some(availability))
            .unwrap();
        current.status = complete.status;
        availability = complete.availability.unwrap();
        if complete.count_completion {
            total_bookings += 1;
        }
        assert_eq!(current.status, BookingStatus::Completed);
        assert_eq!(availability, AvailabilityStatus::Available);
        assert_eq!(total_bookings, 1);
    }

    #[test]
    fn test_review_requires_completed_and_only_once() {
        for status in [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled] {
            assert!(matches!(
                booking(status).ensure_reviewable_by(RENTER),
                Err(AppError::InvalidState(_))
            ));
        }

        let mut completed = booking(BookingStatus::Completed);
        assert!(matches!(
            completed.ensure_reviewable_by(OWNER),
            Err(AppError::Authorization(_))
        ));
        assert!(completed.ensure_reviewable_by(RENTER).is_ok());

        completed.review = Some(BookingReview {
            rating: 5,
            comment: None,
            date: Utc::now(),
        });
        assert!(matches!(
            completed.ensure_reviewable_by(RENTER),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_payment_rules() {
        let request = || RecordPayment {
            method: "UPI".to_string(),
            transaction_id: None,
        };

        let payment = booking(BookingStatus::Confirmed)
            .plan_payment(RENTER, request())
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(payment.transaction_id.unwrap().starts_with("txn_"));
        assert!(payment.paid_at.is_some());

        assert!(matches!(
            booking(BookingStatus::Confirmed).plan_payment(OWNER, request()),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            booking(BookingStatus::Cancelled).plan_payment(RENTER, request()),
            Err(AppError::InvalidState(_))
        ));

        let mut paid = booking(BookingStatus::Confirmed);
        paid.payment.status = PaymentStatus::Paid;
        assert!(matches!(
            paid.plan_payment(RENTER, request()),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_visibility() {
        let pending = booking(BookingStatus::Pending);
        let claims = |user_id, role| UserClaims {
            sub: String::new(),
            user_id,
            role,
            exp: 0,
            iat: 0,
        };
        use crate::models::user::Role;
        assert!(pending.ensure_visible_to(&claims(RENTER, Role::Renter)).is_ok());
        assert!(pending.ensure_visible_to(&claims(OWNER, Role::Owner)).is_ok());
        assert!(pending.ensure_visible_to(&claims(STRANGER, Role::Admin)).is_ok());
        assert!(matches!(
            pending.ensure_visible_to(&claims(STRANGER, Role::Renter)),
            Err(AppError::Authorization(_))
        ));
    }
}
