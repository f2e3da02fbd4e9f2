//! Equipment repository for database operations

use std::collections::HashMap;

use sqlx::{FromRow, PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{AvailabilityStatus, BookingStatus},
        equipment::{
            average_rating, CreateEquipment, CreateReview, Equipment, EquipmentQuery,
            EquipmentReview, EquipmentRow,
        },
        pagination::PageRequest,
    },
};

/// Listing columns joined with the owner's directory entry
pub(crate) const EQUIPMENT_SELECT: &str = r#"
    SELECT e.*, u.name AS owner_name, u.phone AS owner_phone, u.email AS owner_email
    FROM equipment e
    LEFT JOIN users u ON u.id = e.owner_id
"#;

/// Escape LIKE metacharacters so user input is matched literally
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

enum FilterArg {
    Text(String),
    Number(f64),
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search listings with filters and pagination, newest first
    pub async fn search(
        &self,
        query: &EquipmentQuery,
        page: PageRequest,
    ) -> AppResult<(Vec<Equipment>, i64)> {
        let mut conditions = vec!["1=1".to_string()];
        let mut args: Vec<FilterArg> = Vec::new();

        macro_rules! push_arg {
            ($arg:expr) => {{
                args.push($arg);
                args.len()
            }};
        }

        if let Some(category) = query.category {
            let idx = push_arg!(FilterArg::Text(category.as_str().to_string()));
            conditions.push(format!("e.category = ${}", idx));
        }

        if let Some(district) = query.district.as_deref().filter(|d| !d.trim().is_empty()) {
            let idx = push_arg!(FilterArg::Text(format!("%{}%", escape_like(district.trim()))));
            conditions.push(format!("e.district ILIKE ${}", idx));
        }

        if query.available == Some(true) {
            let idx = push_arg!(FilterArg::Text(
                AvailabilityStatus::Available.as_str().to_string()
            ));
            conditions.push(format!("e.availability_status = ${}", idx));
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let idx = push_arg!(FilterArg::Text(format!("%{}%", escape_like(search.trim()))));
            conditions.push(format!(
                "(e.name ILIKE ${i} OR e.equipment_type ILIKE ${i} OR e.description ILIKE ${i})",
                i = idx
            ));
        }

        if let Some(min) = query.min_price {
            let idx = push_arg!(FilterArg::Number(min));
            conditions.push(format!("e.daily_rate >= ${}", idx));
        }

        if let Some(max) = query.max_price {
            let idx = push_arg!(FilterArg::Number(max));
            conditions.push(format!("e.daily_rate <= ${}", idx));
        }

        let where_clause = conditions.join(" AND ");

        macro_rules! bind_args {
            ($builder:expr) => {{
                let mut builder = $builder;
                for arg in &args {
                    builder = match arg {
                        FilterArg::Text(value) => builder.bind(value.clone()),
                        FilterArg::Number(value) => builder.bind(*value),
                    };
                }
                builder
            }};
        }

        let count_query = format!("SELECT COUNT(*) FROM equipment e WHERE {}", where_clause);
        let total: i64 = bind_args!(sqlx::query_scalar::<Postgres, i64>(&count_query))
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} WHERE {} ORDER BY e.created_at DESC, e.id DESC LIMIT {} OFFSET {}",
            EQUIPMENT_SELECT,
            where_clause,
            page.limit(),
            page.offset()
        );
        let rows: Vec<EquipmentRow> = bind_args!(sqlx::query_as::<Postgres, EquipmentRow>(&select_query))
            .fetch_all(&self.pool)
            .await?;

        let items = self.with_reviews(rows).await?;
        Ok((items, total))
    }

    /// Listings of one owner, newest first
    pub async fn list_by_owner(&self, owner_id: i32) -> AppResult<Vec<Equipment>> {
        let query = format!(
            "{} WHERE e.owner_id = $1 ORDER BY e.created_at DESC, e.id DESC",
            EQUIPMENT_SELECT
        );
        let rows = sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_reviews(rows).await
    }

    /// Get listing by ID with its reviews
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        let query = format!("{} WHERE e.id = $1", EQUIPMENT_SELECT);
        let row = sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))?;

        let mut items = self.with_reviews(vec![row]).await?;
        items
            .pop()
            .ok_or_else(|| AppError::Internal("Equipment row vanished".to_string()))
    }

    /// Create a listing owned by `owner_id`
    pub async fn create(&self, owner_id: i32, data: &CreateEquipment) -> AppResult<Equipment> {
        let specifications = data.specifications.clone().unwrap_or_default();
        let location = data.location.clone().unwrap_or_default();

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO equipment (
                owner_id, name, category, equipment_type, description,
                brand, model, model_year, horsepower, capacity, equipment_condition,
                hourly_rate, daily_rate, weekly_rate, monthly_rate, availability_status,
                address, village, district, state, pincode, latitude, longitude,
                images, operator_included, operator_charge, deposit, min_rental_period, features
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&data.name)
        .bind(data.category)
        .bind(&data.equipment_type)
        .bind(&data.description)
        .bind(&specifications.brand)
        .bind(&specifications.model)
        .bind(specifications.year)
        .bind(&specifications.horsepower)
        .bind(&specifications.capacity)
        .bind(specifications.condition)
        .bind(data.pricing.hourly)
        .bind(data.pricing.daily)
        .bind(data.pricing.weekly)
        .bind(data.pricing.monthly)
        .bind(data.availability_status.unwrap_or_default())
        .bind(&location.address)
        .bind(&location.village)
        .bind(&location.district)
        .bind(&location.state)
        .bind(&location.pincode)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(data.images.clone().unwrap_or_default())
        .bind(data.operator_included.unwrap_or(false))
        .bind(data.operator_charge)
        .bind(data.deposit)
        .bind(data.min_rental_period.as_deref().unwrap_or("1 day"))
        .bind(data.features.clone().unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Lock a listing, let `change` check and modify it, then write it back
    pub async fn modify<F>(&self, id: i32, change: F) -> AppResult<Equipment>
    where
        F: FnOnce(&mut Equipment) -> AppResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let mut equipment = lock_equipment(&mut tx, id).await?;
        change(&mut equipment)?;

        sqlx::query(
            r#"
            UPDATE equipment SET
                name = $2, category = $3, equipment_type = $4, description = $5,
                brand = $6, model = $7, model_year = $8, horsepower = $9, capacity = $10,
                equipment_condition = $11,
                hourly_rate = $12, daily_rate = $13, weekly_rate = $14, monthly_rate = $15,
                availability_status = $16,
                address = $17, village = $18, district = $19, state = $20, pincode = $21,
                latitude = $22, longitude = $23,
                images = $24, operator_included = $25, operator_charge = $26, deposit = $27,
                min_rental_period = $28, features = $29, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&equipment.name)
        .bind(equipment.category)
        .bind(&equipment.equipment_type)
        .bind(&equipment.description)
        .bind(&equipment.specifications.brand)
        .bind(&equipment.specifications.model)
        .bind(equipment.specifications.year)
        .bind(&equipment.specifications.horsepower)
        .bind(&equipment.specifications.capacity)
        .bind(equipment.specifications.condition)
        .bind(equipment.pricing.hourly)
        .bind(equipment.pricing.daily)
        .bind(equipment.pricing.weekly)
        .bind(equipment.pricing.monthly)
        .bind(equipment.availability_status)
        .bind(&equipment.location.address)
        .bind(&equipment.location.village)
        .bind(&equipment.location.district)
        .bind(&equipment.location.state)
        .bind(&equipment.location.pincode)
        .bind(equipment.location.latitude)
        .bind(equipment.location.longitude)
        .bind(&equipment.images)
        .bind(equipment.operator_included)
        .bind(equipment.operator_charge)
        .bind(equipment.deposit)
        .bind(&equipment.min_rental_period)
        .bind(&equipment.features)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a listing after `authorize` accepts it. Refused while open
    /// bookings reference it; past bookings keep their record.
    pub async fn delete<F>(&self, id: i32, authorize: F) -> AppResult<()>
    where
        F: FnOnce(&Equipment) -> AppResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        // Bookings before equipment, same order as lifecycle transitions
        sqlx::query("SELECT id FROM bookings WHERE equipment_id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let equipment = lock_equipment(&mut tx, id).await?;
        authorize(&equipment)?;

        // Counted under the equipment lock: new bookings need a share lock on
        // the listing, so none can be committed past this point.
        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE equipment_id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(
            BookingStatus::OPEN
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
        )
        .fetch_one(&mut *tx)
        .await?;
        equipment.ensure_deletable(open)?;

        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add a direct review. One review per user per listing.
    pub async fn add_review(
        &self,
        id: i32,
        user_id: i32,
        review: &CreateReview,
    ) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        lock_equipment(&mut tx, id).await?;

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM equipment_reviews WHERE equipment_id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Err(AppError::InvalidState("Equipment already reviewed".to_string()));
        }

        insert_review(&mut tx, id, user_id, None, review).await?;
        refresh_average_rating(&mut tx, id).await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Attach reviews to listing rows in one query
    async fn with_reviews(&self, rows: Vec<EquipmentRow>) -> AppResult<Vec<Equipment>> {
        let mut items: Vec<Equipment> = rows.into_iter().map(Equipment::from).collect();
        if items.is_empty() {
            return Ok(items);
        }

        let ids: Vec<i32> = items.iter().map(|e| e.id).collect();
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.equipment_id, r.user_id, u.name AS user_name, r.booking_id,
                   r.rating, r.comment, r.created_at
            FROM equipment_reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.equipment_id = ANY($1)
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_equipment: HashMap<i32, Vec<EquipmentReview>> = HashMap::new();
        for row in rows {
            let equipment_id: i32 = row.try_get("equipment_id")?;
            by_equipment
                .entry(equipment_id)
                .or_default()
                .push(EquipmentReview::from_row(&row)?);
        }

        for item in &mut items {
            item.reviews = by_equipment.remove(&item.id).unwrap_or_default();
        }

        Ok(items)
    }
}

/// Lock a listing row for the rest of the transaction
pub(crate) async fn lock_equipment(conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
    let query = format!("{} WHERE e.id = $1 FOR UPDATE OF e", EQUIPMENT_SELECT);
    sqlx::query_as::<_, EquipmentRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Equipment::from)
        .ok_or_else(|| AppError::NotFound(format!("Equipment with id {} not found", id)))
}

pub(crate) async fn insert_review(
    conn: &mut PgConnection,
    equipment_id: i32,
    user_id: i32,
    booking_id: Option<i32>,
    review: &CreateReview,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO equipment_reviews (equipment_id, user_id, booking_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(equipment_id)
    .bind(user_id)
    .bind(booking_id)
    .bind(review.rating)
    .bind(&review.comment)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Recompute the stored average from all reviews of the listing
pub(crate) async fn refresh_average_rating(conn: &mut PgConnection, equipment_id: i32) -> AppResult<f64> {
    let ratings: Vec<i16> =
        sqlx::query_scalar("SELECT rating FROM equipment_reviews WHERE equipment_id = $1")
            .bind(equipment_id)
            .fetch_all(&mut *conn)
            .await?;

    let average = average_rating(&ratings);

    sqlx::query("UPDATE equipment SET average_rating = $2, updated_at = NOW() WHERE id = $1")
        .bind(equipment_id)
        .bind(average)
        .execute(&mut *conn)
        .await?;

    Ok(average)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("rotavator"), "rotavator");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
