//! Adjustment Handler
//!
//! Thin orchestration over the ledger's adjustment commit: resolves whether a
//! correction targets a specific lot or the item cache, turns an
//! increase/decrease pair into a signed delta, and enforces the
//! notes-on-decrease rule before delegating. Previews are advisory; the
//! ledger transaction is the authority at commit time.

use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_item::Entity as InventoryItemEntity;
use crate::entities::inventory_movement;
use crate::errors::InventoryError;
use crate::events::EventSender;
use crate::services::ledger::{AdjustmentReason, MovementLedger};
use crate::services::lot_repository::LotRepository;

/// Direction of a manual correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentType {
    Increase,
    Decrease,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Increase => "increase",
            AdjustmentType::Decrease => "decrease",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "increase" => Some(AdjustmentType::Increase),
            "decrease" => Some(AdjustmentType::Decrease),
            _ => None,
        }
    }
}

/// A manual correction request.
///
/// `lot_id` present targets a specific lot; absent it is a general item-level
/// correction that touches no lot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustmentRequest {
    pub item_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub adjustment_type: AdjustmentType,
    pub magnitude: Decimal,
    pub reason: AdjustmentReason,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub performed_by: String,
}

/// Advisory preview of an adjustment's effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentPreview {
    pub item_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub current_quantity: Decimal,
    pub resulting_quantity: Decimal,
    pub signed_delta: Decimal,
}

/// Validates and executes manual corrections.
#[derive(Clone)]
pub struct AdjustmentService {
    db_pool: Arc<DatabaseConnection>,
    lots: LotRepository,
    ledger: MovementLedger,
}

impl AdjustmentService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        let lots = LotRepository::new(db_pool.clone());
        let ledger = MovementLedger::new(db_pool.clone(), event_sender);
        Self {
            db_pool,
            lots,
            ledger,
        }
    }

    /// Computes the quantity an adjustment would leave behind, without
    /// committing anything.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        item_id: Uuid,
        lot_id: Option<Uuid>,
        adjustment_type: AdjustmentType,
        magnitude: Decimal,
    ) -> Result<AdjustmentPreview, InventoryError> {
        let signed_delta = signed_delta(adjustment_type, magnitude)?;

        let current_quantity = match lot_id {
            Some(lot_id) => {
                self.lots
                    .find_lot_for_item(item_id, lot_id)
                    .await?
                    .quantity_remaining
            }
            None => {
                let db = &*self.db_pool;
                InventoryItemEntity::find_by_id(item_id)
                    .one(db)
                    .await
                    .map_err(InventoryError::db_error)?
                    .ok_or_else(|| {
                        InventoryError::NotFound(format!("Item {} not found", item_id))
                    })?
                    .current_quantity
            }
        };

        Ok(AdjustmentPreview {
            item_id,
            lot_id,
            current_quantity,
            resulting_quantity: current_quantity + signed_delta,
            signed_delta,
        })
    }

    /// Validates the request and delegates to the ledger for the atomic
    /// commit.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn commit(
        &self,
        request: AdjustmentRequest,
    ) -> Result<inventory_movement::Model, InventoryError> {
        request.validate()?;

        let delta = signed_delta(request.adjustment_type, request.magnitude)?;

        let has_notes = request
            .notes
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        if request.adjustment_type == AdjustmentType::Decrease && !has_notes {
            return Err(InventoryError::Validation(
                "A decrease adjustment requires notes".to_string(),
            ));
        }

        self.ledger
            .commit_adjustment(
                request.item_id,
                request.lot_id,
                delta,
                request.reason,
                request.notes,
                &request.performed_by,
            )
            .await
    }
}

fn signed_delta(
    adjustment_type: AdjustmentType,
    magnitude: Decimal,
) -> Result<Decimal, InventoryError> {
    if magnitude <= Decimal::ZERO {
        return Err(InventoryError::Validation(format!(
            "Adjustment magnitude must be positive, got {}",
            magnitude
        )));
    }

    Ok(match adjustment_type {
        AdjustmentType::Increase => magnitude,
        AdjustmentType::Decrease => -magnitude,
    })
}
