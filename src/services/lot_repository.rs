//! Lot Repository
//!
//! Scoped query access to lot rows for an item. Candidate filtering stops at
//! "active with stock remaining"; ordering beyond the deterministic base key
//! is the Allocation Planner's concern.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_lot::{self, Entity as InventoryLotEntity};
use crate::errors::InventoryError;

/// Read access to lot records, shared by the planner and the projector.
#[derive(Clone)]
pub struct LotRepository {
    db_pool: Arc<DatabaseConnection>,
}

impl LotRepository {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Active lots with stock remaining for an item, optionally restricted to
    /// a storage location, ordered by `(received_date, created_at)` so that
    /// downstream planning is deterministic.
    #[instrument(skip(self))]
    pub async fn active_lots(
        &self,
        item_id: Uuid,
        location_filter: Option<&str>,
    ) -> Result<Vec<inventory_lot::Model>, InventoryError> {
        let db = &*self.db_pool;

        let mut query = InventoryLotEntity::find()
            .filter(inventory_lot::Column::ItemId.eq(item_id))
            .filter(inventory_lot::Column::IsActive.eq(true))
            .filter(inventory_lot::Column::QuantityRemaining.gt(Decimal::ZERO));

        if let Some(location) = location_filter {
            query = query.filter(inventory_lot::Column::StorageLocation.eq(location));
        }

        query
            .order_by_asc(inventory_lot::Column::ReceivedDate)
            .order_by_asc(inventory_lot::Column::CreatedAt)
            .all(db)
            .await
            .map_err(InventoryError::db_error)
    }

    /// Point lookup by lot id.
    #[instrument(skip(self))]
    pub async fn find_lot(
        &self,
        lot_id: Uuid,
    ) -> Result<Option<inventory_lot::Model>, InventoryError> {
        let db = &*self.db_pool;

        InventoryLotEntity::find_by_id(lot_id)
            .one(db)
            .await
            .map_err(InventoryError::db_error)
    }

    /// Resolves a lot and verifies it belongs to the stated item.
    #[instrument(skip(self))]
    pub async fn find_lot_for_item(
        &self,
        item_id: Uuid,
        lot_id: Uuid,
    ) -> Result<inventory_lot::Model, InventoryError> {
        let lot = self
            .find_lot(lot_id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("Lot {} not found", lot_id)))?;

        if lot.item_id != item_id {
            return Err(InventoryError::InvalidAdjustment(format!(
                "Lot {} does not belong to item {}",
                lot_id, item_id
            )));
        }

        Ok(lot)
    }

    /// All lots for an item, newest receipt first, including depleted and
    /// deactivated lots. Audit and dashboard listing.
    #[instrument(skip(self))]
    pub async fn lots_for_item(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<inventory_lot::Model>, InventoryError> {
        let db = &*self.db_pool;

        InventoryLotEntity::find()
            .filter(inventory_lot::Column::ItemId.eq(item_id))
            .order_by_desc(inventory_lot::Column::ReceivedDate)
            .order_by_desc(inventory_lot::Column::CreatedAt)
            .all(db)
            .await
            .map_err(InventoryError::db_error)
    }
}
