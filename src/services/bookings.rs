//! Booking lifecycle service

use crate::{
    error::AppResult,
    models::{
        booking::{
            duration_days, parse_booking_date, Booking, BookingAction, BookingDetails,
            CreateBooking, NewBooking, RecordPayment,
        },
        equipment::CreateReview,
        pagination::PageRequest,
        user::{Role, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
}

impl BookingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check the requested period. Runs before any database access.
    pub fn prepare(claims: &UserClaims, data: CreateBooking) -> AppResult<NewBooking> {
        let start_date = parse_booking_date(&data.start_date)?;
        let end_date = parse_booking_date(&data.end_date)?;
        let duration = duration_days(start_date, end_date)?;

        Ok(NewBooking {
            equipment_id: data.equipment_id,
            renter_id: claims.user_id,
            start_date,
            end_date,
            duration,
            operator_required: data.operator_required,
            delivery_address: data.delivery_address.unwrap_or_default(),
            delivery_type: data.delivery_type.unwrap_or_default(),
            notes: data.notes,
        })
    }

    /// Request a booking; the caller becomes the renter
    pub async fn create(&self, claims: &UserClaims, data: CreateBooking) -> AppResult<BookingDetails> {
        let new_booking = Self::prepare(claims, data)?;
        let booking = self.repository.bookings.create(&new_booking).await?;
        tracing::info!(
            booking_id = booking.id,
            equipment_id = new_booking.equipment_id,
            renter_id = claims.user_id,
            total = %booking.pricing.total_amount,
            "Booking requested"
        );
        self.repository.bookings.get_details(booking.id).await
    }

    /// Owners see bookings on their listings, everyone else their own rentals
    pub async fn list(
        &self,
        claims: &UserClaims,
        page: PageRequest,
    ) -> AppResult<(Vec<BookingDetails>, i64)> {
        let as_owner = claims.role == Role::Owner;
        self.repository
            .bookings
            .list_for_user(claims.user_id, as_owner, page)
            .await
    }

    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<BookingDetails> {
        let details = self.repository.bookings.get_details(id).await?;
        details.booking.ensure_visible_to(claims)?;
        Ok(details)
    }

    /// Run a lifecycle action as the caller
    pub async fn apply(
        &self,
        claims: &UserClaims,
        id: i32,
        action: BookingAction,
    ) -> AppResult<Booking> {
        let (booking, transition) = self
            .repository
            .bookings
            .transition(id, claims.user_id, &action)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    booking_id = id,
                    user_id = claims.user_id,
                    action = action.name(),
                    "Booking transition refused: {}",
                    e
                )
            })?;

        tracing::info!(
            booking_id = id,
            user_id = claims.user_id,
            action = action.name(),
            status = %transition.status,
            availability = ?transition.availability,
            "Booking updated"
        );
        Ok(booking)
    }

    pub async fn record_payment(
        &self,
        claims: &UserClaims,
        id: i32,
        request: RecordPayment,
    ) -> AppResult<Booking> {
        let booking = self
            .repository
            .bookings
            .record_payment(id, claims.user_id, request)
            .await?;
        tracing::info!(
            booking_id = id,
            transaction_id = booking.payment.transaction_id.as_deref().unwrap_or_default(),
            "Payment recorded"
        );
        Ok(booking)
    }

    pub async fn add_review(
        &self,
        claims: &UserClaims,
        id: i32,
        review: &CreateReview,
    ) -> AppResult<Booking> {
        let booking = self
            .repository
            .bookings
            .add_review(id, claims.user_id, review)
            .await?;
        tracing::info!(booking_id = id, rating = review.rating, "Booking reviewed");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn claims() -> UserClaims {
        UserClaims {
            sub: "renter@example.com".to_string(),
            user_id: 20,
            role: Role::Renter,
            exp: 0,
            iat: 0,
        }
    }

    fn request(start: &str, end: &str) -> CreateBooking {
        CreateBooking {
            equipment_id: 1,
            start_date: start.to_string(),
            end_date: end.to_string(),
            operator_required: false,
            delivery_address: None,
            delivery_type: None,
            notes: None,
        }
    }

    #[test]
    fn test_prepare_sets_renter_and_duration() {
        let booking = BookingsService::prepare(&claims(), request("2024-06-01", "2024-06-04")).unwrap();
        assert_eq!(booking.renter_id, 20);
        assert_eq!(booking.duration, 3);
        assert_eq!(booking.delivery_type, crate::models::enums::DeliveryType::Pickup);
    }

    #[test]
    fn test_prepare_rejects_bad_periods() {
        assert!(matches!(
            BookingsService::prepare(&claims(), request("2024-06-04", "2024-06-01")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            BookingsService::prepare(&claims(), request("2024-06-01", "2024-06-01")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            BookingsService::prepare(&claims(), request("soon", "2024-06-01")),
            Err(AppError::Validation(_))
        ));
    }
}
