//! Equipment catalog service

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, CreateReview, Equipment, EquipmentQuery, UpdateEquipment},
        pagination::PageRequest,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search the catalog
    pub async fn search(&self, query: &EquipmentQuery) -> AppResult<(Vec<Equipment>, i64)> {
        let page = PageRequest::new(query.page, query.per_page);
        self.repository.equipment.search(query, page).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    /// Listings owned by the caller
    pub async fn my_listings(&self, claims: &UserClaims) -> AppResult<Vec<Equipment>> {
        claims.require_owner_role()?;
        self.repository.equipment.list_by_owner(claims.user_id).await
    }

    /// Create a listing owned by the caller
    pub async fn create(&self, claims: &UserClaims, data: CreateEquipment) -> AppResult<Equipment> {
        claims.require_owner_role()?;
        let data = data.normalize()?;
        let equipment = self.repository.equipment.create(claims.user_id, &data).await?;
        tracing::info!(
            equipment_id = equipment.id,
            owner_id = claims.user_id,
            "Equipment listed"
        );
        Ok(equipment)
    }

    pub async fn update(
        &self,
        claims: &UserClaims,
        id: i32,
        data: UpdateEquipment,
    ) -> AppResult<Equipment> {
        claims.require_owner_role()?;
        data.check()?;
        let equipment = self
            .repository
            .equipment
            .modify(id, |equipment| {
                equipment.ensure_manageable_by(claims)?;
                equipment.apply_update(data);
                Ok(())
            })
            .await?;
        tracing::info!(equipment_id = id, user_id = claims.user_id, "Equipment updated");
        Ok(equipment)
    }

    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        claims.require_owner_role()?;
        self.repository
            .equipment
            .delete(id, |equipment| equipment.ensure_manageable_by(claims))
            .await
            .inspect_err(|e| tracing::warn!(equipment_id = id, "Equipment not deleted: {}", e))?;
        tracing::info!(equipment_id = id, user_id = claims.user_id, "Equipment deleted");
        Ok(())
    }

    /// Review a listing directly
    pub async fn add_review(
        &self,
        claims: &UserClaims,
        id: i32,
        review: &CreateReview,
    ) -> AppResult<Equipment> {
        let equipment = self
            .repository
            .equipment
            .add_review(id, claims.user_id, review)
            .await?;
        tracing::info!(
            equipment_id = id,
            rating = review.rating,
            average = equipment.average_rating,
            "Equipment reviewed"
        );
        Ok(equipment)
    }
}
