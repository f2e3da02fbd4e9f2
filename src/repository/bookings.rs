//! Bookings repository for database operations

use sqlx::{postgres::PgRow, FromRow, PgConnection, Pool, Postgres, Row};

use super::equipment::{insert_review, lock_equipment, refresh_average_rating, EQUIPMENT_SELECT};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            Booking, BookingAction, BookingDetails, BookingPricing, BookingRow, NewBooking,
            RecordPayment, Transition,
        },
        enums::{AvailabilityStatus, EquipmentCategory},
        equipment::{CreateReview, Equipment, EquipmentRow, EquipmentSummary, Pricing},
        pagination::PageRequest,
        user::UserShort,
    },
};

/// Booking columns with equipment summary, renter and owner expanded
const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.*,
           e.name AS equipment_name, e.equipment_type AS equipment_kind,
           e.category AS equipment_category, e.images AS equipment_images,
           e.hourly_rate AS equipment_hourly_rate, e.daily_rate AS equipment_daily_rate,
           e.weekly_rate AS equipment_weekly_rate, e.monthly_rate AS equipment_monthly_rate,
           r.name AS renter_name, r.phone AS renter_phone, r.email AS renter_email,
           o.name AS owner_name, o.phone AS owner_phone, o.email AS owner_email
    FROM bookings b
    LEFT JOIN equipment e ON e.id = b.equipment_id
    LEFT JOIN users r ON r.id = b.renter_id
    LEFT JOIN users o ON o.id = b.owner_id
"#;

fn details_from_row(row: &PgRow) -> AppResult<BookingDetails> {
    let booking: Booking = BookingRow::from_row(row)?.into();

    let equipment_name: Option<String> = row.try_get("equipment_name")?;
    let equipment = match (booking.equipment_id, equipment_name) {
        (Some(id), Some(name)) => {
            let category: EquipmentCategory = row.try_get("equipment_category")?;
            Some(EquipmentSummary {
                id,
                name,
                equipment_type: row.try_get("equipment_kind")?,
                category,
                images: row.try_get("equipment_images")?,
                pricing: Pricing {
                    hourly: row.try_get("equipment_hourly_rate")?,
                    daily: row.try_get("equipment_daily_rate")?,
                    weekly: row.try_get("equipment_weekly_rate")?,
                    monthly: row.try_get("equipment_monthly_rate")?,
                },
            })
        }
        _ => None,
    };

    let renter = Some(UserShort {
        id: booking.renter_id,
        name: row.try_get("renter_name")?,
        phone: row.try_get("renter_phone")?,
        email: row.try_get("renter_email")?,
    });
    let owner = Some(UserShort {
        id: booking.owner_id,
        name: row.try_get("owner_name")?,
        phone: row.try_get("owner_phone")?,
        email: row.try_get("owner_email")?,
    });

    Ok(BookingDetails {
        booking,
        equipment,
        renter,
        owner,
    })
}

/// Lock a booking row for the rest of the transaction
async fn lock_booking(conn: &mut PgConnection, id: i32) -> AppResult<Booking> {
    sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Booking::from)
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
}

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID with its references expanded
    pub async fn get_details(&self, id: i32) -> AppResult<BookingDetails> {
        let query = format!("{} WHERE b.id = $1", BOOKING_DETAILS_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?;
        details_from_row(&row)
    }

    /// Bookings where the user is the owner (`as_owner`) or the renter, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        as_owner: bool,
        page: PageRequest,
    ) -> AppResult<(Vec<BookingDetails>, i64)> {
        let column = if as_owner { "owner_id" } else { "renter_id" };

        let count_query = format!("SELECT COUNT(*) FROM bookings WHERE {} = $1", column);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} WHERE b.{} = $1 ORDER BY b.created_at DESC, b.id DESC LIMIT {} OFFSET {}",
            BOOKING_DETAILS_SELECT,
            column,
            page.limit(),
            page.offset()
        );
        let rows = sqlx::query(&select_query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let bookings = rows
            .iter()
            .map(details_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((bookings, total))
    }

    /// Create a Pending booking. The equipment row is share-locked so it
    /// cannot be confirmed away or deleted during the availability check.
    pub async fn create(&self, data: &NewBooking) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let query = format!("{} WHERE e.id = $1 FOR SHARE OF e", EQUIPMENT_SELECT);
        let equipment = sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(data.equipment_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound("Equipment not found".to_string()))?;

        equipment.ensure_bookable()?;
        let pricing = BookingPricing::quote(&equipment, data.duration, data.operator_required);

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (
                equipment_id, renter_id, owner_id, start_date, end_date, duration_days,
                base_rate, operator_charge, deposit, total_amount, operator_required,
                delivery_street, delivery_village, delivery_district, delivery_pincode,
                delivery_type, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(equipment.id)
        .bind(data.renter_id)
        .bind(equipment.owner_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.duration)
        .bind(pricing.base_rate)
        .bind(pricing.operator_charge)
        .bind(pricing.deposit)
        .bind(pricing.total_amount)
        .bind(data.operator_required)
        .bind(&data.delivery_address.street)
        .bind(&data.delivery_address.village)
        .bind(&data.delivery_address.district)
        .bind(&data.delivery_address.pincode)
        .bind(data.delivery_type)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Apply a lifecycle action. Booking then equipment are locked, the
    /// transition is planned on the locked state and both rows are written
    /// in the same transaction.
    pub async fn transition(
        &self,
        id: i32,
        user_id: i32,
        action: &BookingAction,
    ) -> AppResult<(Booking, Transition)> {
        let mut tx = self.pool.begin().await?;

        let booking = lock_booking(&mut tx, id).await?;

        let availability: Option<AvailabilityStatus> = match booking.equipment_id {
            Some(equipment_id) => sqlx::query_scalar(
                "SELECT availability_status FROM equipment WHERE id = $1 FOR UPDATE",
            )
            .bind(equipment_id)
            .fetch_optional(&mut *tx)
            .await?,
            None => None,
        };

        let transition = booking.plan(action, user_id, availability)?;

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings SET
                status = $2,
                cancellation_reason = COALESCE($3, cancellation_reason),
                payment_status = COALESCE($4, payment_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transition.status)
        .bind(&transition.cancellation_reason)
        .bind(transition.payment_status)
        .fetch_one(&mut *tx)
        .await?;

        if let (Some(equipment_id), Some(status)) = (booking.equipment_id, transition.availability) {
            sqlx::query(
                r#"
                UPDATE equipment SET
                    availability_status = $2,
                    total_bookings = total_bookings + $3,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(equipment_id)
            .bind(status)
            .bind(i32::from(transition.count_completion))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((row.into(), transition))
    }

    /// Record the renter's payment
    pub async fn record_payment(
        &self,
        id: i32,
        user_id: i32,
        request: RecordPayment,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let booking = lock_booking(&mut tx, id).await?;
        let payment = booking.plan_payment(user_id, request)?;

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings SET
                payment_method = $2, payment_status = $3, transaction_id = $4, paid_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&payment.method)
        .bind(payment.status)
        .bind(&payment.transaction_id)
        .bind(payment.paid_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Review a completed booking. The review is mirrored on the equipment
    /// and its average rating recomputed.
    pub async fn add_review(
        &self,
        id: i32,
        user_id: i32,
        review: &CreateReview,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let booking = lock_booking(&mut tx, id).await?;
        booking.ensure_reviewable_by(user_id)?;

        let equipment_id = booking
            .equipment_id
            .ok_or_else(|| AppError::NotFound("Equipment no longer exists".to_string()))?;
        lock_equipment(&mut tx, equipment_id).await?;

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings SET
                review_rating = $2, review_comment = $3, review_date = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&mut *tx)
        .await?;

        insert_review(&mut tx, equipment_id, user_id, Some(id), review).await?;
        refresh_average_rating(&mut tx, equipment_id).await?;

        tx.commit().await?;
        Ok(row.into())
    }
}
