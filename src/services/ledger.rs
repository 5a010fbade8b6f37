//! Movement Ledger Writer
//!
//! Applies consumption, receipt and adjustment plans as single atomic units:
//! every lot mutation and movement insert in a call commits together or not
//! at all. Consumption commits re-read each referenced lot inside the
//! transaction and compare against the plan's recorded availability, so two
//! concurrent issues can never both draw the last units of a lot.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_item::{self, Entity as InventoryItemEntity};
use crate::entities::inventory_lot::{self, Entity as InventoryLotEntity};
use crate::entities::inventory_movement::{self, MovementType};
use crate::errors::InventoryError;
use crate::events::{Event, EventSender};
use crate::services::allocation::ConsumptionPlan;

/// Where consumed stock goes. Exactly one destination per commit.
///
/// A location destination is a relocation, recorded as a `transfer` movement:
/// lots at the source are drawn down but the item's on-hand cache is
/// unchanged. Batch and task destinations are true consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Destination {
    Batch(Uuid),
    Task(Uuid),
    Location(String),
}

impl Destination {
    /// Builds a destination from loose optional fields, enforcing the
    /// exactly-one rule.
    pub fn from_parts(
        batch_id: Option<Uuid>,
        task_id: Option<Uuid>,
        to_location: Option<String>,
    ) -> Result<Self, InventoryError> {
        match (batch_id, task_id, to_location) {
            (Some(batch), None, None) => Ok(Destination::Batch(batch)),
            (None, Some(task), None) => Ok(Destination::Task(task)),
            (None, None, Some(location)) => Ok(Destination::Location(location)),
            (None, None, None) => Err(InventoryError::Validation(
                "A destination is required: batch, task or location".to_string(),
            )),
            _ => Err(InventoryError::Validation(
                "Exactly one destination may be set".to_string(),
            )),
        }
    }

    fn movement_type(&self) -> MovementType {
        match self {
            Destination::Location(_) => MovementType::Transfer,
            Destination::Batch(_) | Destination::Task(_) => MovementType::Consume,
        }
    }
}

/// Attribution attached to every movement written by a commit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MovementMetadata {
    #[validate(length(min = 1, max = 120))]
    pub performed_by: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Lot attributes for a receipt that creates a new lot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewLotFields {
    #[validate(length(min = 1, max = 64))]
    pub lot_code: String,
    /// Defaults to today when absent.
    pub received_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub manufacture_date: Option<NaiveDate>,
    #[validate(length(max = 120))]
    pub storage_location: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    /// Defaults to the item's unit; an explicit mismatch is rejected.
    pub unit_of_measure: Option<String>,
}

/// Result of a receipt commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptOutcome {
    pub movement: inventory_movement::Model,
    pub lot: Option<inventory_lot::Model>,
}

/// Why a manual correction was made. Disposal decreases are recorded as
/// `dispose` movements; everything else is an `adjust`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentReason {
    CountCorrection,
    Damage,
    Loss,
    Recovery,
    Disposal,
    Other,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::CountCorrection => "count_correction",
            AdjustmentReason::Damage => "damage",
            AdjustmentReason::Loss => "loss",
            AdjustmentReason::Recovery => "recovery",
            AdjustmentReason::Disposal => "disposal",
            AdjustmentReason::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "count_correction" => Some(AdjustmentReason::CountCorrection),
            "damage" => Some(AdjustmentReason::Damage),
            "loss" => Some(AdjustmentReason::Loss),
            "recovery" => Some(AdjustmentReason::Recovery),
            "disposal" => Some(AdjustmentReason::Disposal),
            "other" => Some(AdjustmentReason::Other),
            _ => None,
        }
    }
}

/// Writes the movement ledger and maintains the derived quantity caches.
#[derive(Clone)]
pub struct MovementLedger {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl MovementLedger {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Applies a consumption plan atomically.
    ///
    /// Re-fetches every referenced lot inside the transaction; if any lot no
    /// longer covers its planned quantity the whole commit fails with
    /// `StaleAllocation` and the caller is expected to re-plan. On success
    /// each lot is decremented (and deactivated at zero), one movement is
    /// inserted per line, and for true consumption the item's on-hand cache
    /// is reduced by the plan total.
    #[instrument(skip(self, plan), fields(item_id = %plan.item_id, lines = plan.lines.len()))]
    pub async fn commit_consumption(
        &self,
        plan: &ConsumptionPlan,
        destination: Destination,
        metadata: MovementMetadata,
    ) -> Result<Vec<inventory_movement::Model>, InventoryError> {
        metadata.validate()?;

        if plan.lines.is_empty() {
            return Err(InventoryError::Validation(
                "Consumption plan has no lines".to_string(),
            ));
        }
        if plan.lines.iter().any(|l| l.quantity <= Decimal::ZERO) {
            return Err(InventoryError::Validation(
                "Consumption plan lines must have positive quantities".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let plan = plan.clone();
        let item_id = plan.item_id;
        let total = plan.total();
        let movement_type = destination.movement_type();
        let destination_for_event = destination.clone();

        let (movements, depleted) = db
            .transaction::<_, (Vec<inventory_movement::Model>, Vec<(Uuid, String)>), InventoryError>(
                move |txn| {
                    Box::pin(async move {
                        let now = Utc::now();

                        let item = InventoryItemEntity::find_by_id(item_id)
                            .one(txn)
                            .await
                            .map_err(InventoryError::db_error)?
                            .ok_or_else(|| {
                                InventoryError::NotFound(format!("Item {} not found", item_id))
                            })?;

                        if !item.is_active {
                            return Err(InventoryError::NotFound(format!(
                                "Item {} is not active",
                                item_id
                            )));
                        }

                        let mut movements = Vec::with_capacity(plan.lines.len());
                        let mut depleted = Vec::new();

                        for line in &plan.lines {
                            let lot = InventoryLotEntity::find_by_id(line.lot_id)
                                .one(txn)
                                .await
                                .map_err(InventoryError::db_error)?
                                .ok_or_else(|| {
                                    InventoryError::NotFound(format!(
                                        "Lot {} not found",
                                        line.lot_id
                                    ))
                                })?;

                            if lot.item_id != item_id {
                                return Err(InventoryError::Validation(format!(
                                    "Lot {} does not belong to item {}",
                                    lot.id, item_id
                                )));
                            }

                            // Compare-and-commit: the snapshot the plan was
                            // built against may have moved.
                            if lot.quantity_remaining < line.quantity {
                                return Err(InventoryError::StaleAllocation {
                                    lot_id: lot.id,
                                    planned: line.quantity,
                                    available: lot.quantity_remaining,
                                });
                            }

                            let new_remaining = lot.quantity_remaining - line.quantity;
                            let from_location = lot.storage_location.clone();
                            let lot_code = lot.lot_code.clone();

                            let mut active_lot: inventory_lot::ActiveModel = lot.into();
                            active_lot.quantity_remaining = Set(new_remaining);
                            if new_remaining == Decimal::ZERO {
                                active_lot.is_active = Set(false);
                            }
                            active_lot.updated_at = Set(now);

                            let updated_lot = active_lot
                                .update(txn)
                                .await
                                .map_err(InventoryError::db_error)?;

                            if new_remaining == Decimal::ZERO {
                                depleted.push((updated_lot.id, lot_code));
                            }

                            let (batch_id, task_id, to_location) = match &destination {
                                Destination::Batch(batch) => (Some(*batch), None, None),
                                Destination::Task(task) => (None, Some(*task), None),
                                Destination::Location(location) => {
                                    (None, None, Some(location.clone()))
                                }
                            };

                            let movement = inventory_movement::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                item_id: Set(item_id),
                                lot_id: Set(Some(updated_lot.id)),
                                movement_type: Set(movement_type),
                                quantity: Set(line.quantity),
                                from_location: Set(from_location),
                                to_location: Set(to_location),
                                batch_id: Set(batch_id),
                                task_id: Set(task_id),
                                notes: Set(metadata.notes.clone()),
                                performed_by: Set(metadata.performed_by.clone()),
                                created_at: Set(now),
                            };

                            movements.push(
                                movement
                                    .insert(txn)
                                    .await
                                    .map_err(InventoryError::db_error)?,
                            );
                        }

                        // Relocation keeps the on-hand cache intact; only
                        // true consumption draws it down.
                        if movement_type == MovementType::Consume {
                            let current = item.current_quantity;
                            let mut active_item: inventory_item::ActiveModel = item.into();
                            active_item.current_quantity = Set(current - total);
                            active_item.updated_at = Set(now);
                            active_item
                                .update(txn)
                                .await
                                .map_err(InventoryError::db_error)?;
                        }

                        Ok((movements, depleted))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => InventoryError::db_error(db_err),
                TransactionError::Transaction(inventory_err) => inventory_err,
            })?;

        let lot_ids: Vec<Uuid> = movements.iter().filter_map(|m| m.lot_id).collect();
        let event = match destination_for_event {
            Destination::Batch(batch) => Event::StockConsumed {
                item_id,
                quantity: total,
                batch_id: Some(batch),
                task_id: None,
                lots: lot_ids,
            },
            Destination::Task(task) => Event::StockConsumed {
                item_id,
                quantity: total,
                batch_id: None,
                task_id: Some(task),
                lots: lot_ids,
            },
            Destination::Location(location) => Event::StockTransferred {
                item_id,
                quantity: total,
                to_location: location,
                lots: lot_ids,
            },
        };
        self.event_sender
            .send(event)
            .await
            .map_err(InventoryError::Event)?;

        for (lot_id, lot_code) in depleted {
            info!(%item_id, %lot_id, %lot_code, "Lot depleted");
            self.event_sender
                .send(Event::LotDepleted {
                    item_id,
                    lot_id,
                    lot_code,
                })
                .await
                .map_err(InventoryError::Event)?;
        }

        info!(%item_id, %total, movements = movements.len(), "Committed consumption");

        Ok(movements)
    }

    /// Records a receipt, optionally creating a new lot.
    ///
    /// A lot is created exactly once per receipt event; the receipt movement
    /// links to it when present. The item's on-hand cache is incremented by
    /// the received quantity either way.
    #[instrument(skip(self, lot_fields, metadata))]
    pub async fn commit_receipt(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        lot_fields: Option<NewLotFields>,
        metadata: MovementMetadata,
    ) -> Result<ReceiptOutcome, InventoryError> {
        metadata.validate()?;
        if let Some(fields) = &lot_fields {
            fields.validate()?;
        }
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::Validation(format!(
                "Received quantity must be positive, got {}",
                quantity
            )));
        }

        let db = self.db_pool.as_ref();

        let outcome = db
            .transaction::<_, ReceiptOutcome, InventoryError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let item = InventoryItemEntity::find_by_id(item_id)
                        .one(txn)
                        .await
                        .map_err(InventoryError::db_error)?
                        .ok_or_else(|| {
                            InventoryError::NotFound(format!("Item {} not found", item_id))
                        })?;

                    if !item.is_active {
                        return Err(InventoryError::NotFound(format!(
                            "Item {} is not active",
                            item_id
                        )));
                    }

                    let lot = match lot_fields {
                        Some(fields) => {
                            let unit = fields
                                .unit_of_measure
                                .unwrap_or_else(|| item.unit_of_measure.clone());
                            if unit != item.unit_of_measure {
                                return Err(InventoryError::Validation(format!(
                                    "Lot unit '{}' does not match item unit '{}'",
                                    unit, item.unit_of_measure
                                )));
                            }

                            let duplicates = InventoryLotEntity::find()
                                .filter(inventory_lot::Column::ItemId.eq(item_id))
                                .filter(inventory_lot::Column::LotCode.eq(fields.lot_code.clone()))
                                .count(txn)
                                .await
                                .map_err(InventoryError::db_error)?;
                            if duplicates > 0 {
                                return Err(InventoryError::Validation(format!(
                                    "Lot code '{}' already exists for item {}",
                                    fields.lot_code, item_id
                                )));
                            }

                            let lot = inventory_lot::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                item_id: Set(item_id),
                                lot_code: Set(fields.lot_code),
                                quantity_received: Set(quantity),
                                quantity_remaining: Set(quantity),
                                unit_of_measure: Set(unit),
                                received_date: Set(fields
                                    .received_date
                                    .unwrap_or_else(|| now.date_naive())),
                                expiry_date: Set(fields.expiry_date),
                                manufacture_date: Set(fields.manufacture_date),
                                storage_location: Set(fields
                                    .storage_location
                                    .or_else(|| item.default_location.clone())),
                                cost_per_unit: Set(fields.cost_per_unit),
                                is_active: Set(true),
                                created_at: Set(now),
                                updated_at: Set(now),
                            };

                            Some(lot.insert(txn).await.map_err(InventoryError::db_error)?)
                        }
                        None => None,
                    };

                    let movement = inventory_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item_id),
                        lot_id: Set(lot.as_ref().map(|l| l.id)),
                        movement_type: Set(MovementType::Receive),
                        quantity: Set(quantity),
                        from_location: Set(None),
                        to_location: Set(lot
                            .as_ref()
                            .and_then(|l| l.storage_location.clone())
                            .or_else(|| item.default_location.clone())),
                        batch_id: Set(None),
                        task_id: Set(None),
                        notes: Set(metadata.notes.clone()),
                        performed_by: Set(metadata.performed_by.clone()),
                        created_at: Set(now),
                    };
                    let movement = movement
                        .insert(txn)
                        .await
                        .map_err(InventoryError::db_error)?;

                    let current = item.current_quantity;
                    let mut active_item: inventory_item::ActiveModel = item.into();
                    active_item.current_quantity = Set(current + quantity);
                    active_item.updated_at = Set(now);
                    active_item
                        .update(txn)
                        .await
                        .map_err(InventoryError::db_error)?;

                    Ok(ReceiptOutcome { movement, lot })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => InventoryError::db_error(db_err),
                TransactionError::Transaction(inventory_err) => inventory_err,
            })?;

        self.event_sender
            .send(Event::StockReceived {
                item_id,
                lot_id: outcome.lot.as_ref().map(|l| l.id),
                quantity,
                received_at: outcome.movement.created_at,
            })
            .await
            .map_err(InventoryError::Event)?;

        info!(%item_id, %quantity, lot_created = outcome.lot.is_some(), "Committed receipt");

        Ok(outcome)
    }

    /// Applies a signed manual correction against a lot or the item cache.
    ///
    /// Decreases require notes: the ledger is the audit trail, and a
    /// shrinkage entry with no explanation is not acceptable. Lot-level
    /// corrections move the lot and the item cache together; general
    /// corrections touch only the item cache.
    #[instrument(skip(self, notes))]
    pub async fn commit_adjustment(
        &self,
        item_id: Uuid,
        lot_id: Option<Uuid>,
        signed_delta: Decimal,
        reason: AdjustmentReason,
        notes: Option<String>,
        performed_by: &str,
    ) -> Result<inventory_movement::Model, InventoryError> {
        if signed_delta == Decimal::ZERO {
            return Err(InventoryError::Validation(
                "Adjustment delta must be non-zero".to_string(),
            ));
        }
        if performed_by.trim().is_empty() {
            return Err(InventoryError::Validation(
                "performed_by is required".to_string(),
            ));
        }
        let has_notes = notes.as_deref().is_some_and(|n| !n.trim().is_empty());
        if signed_delta < Decimal::ZERO && !has_notes {
            return Err(InventoryError::Validation(
                "A decrease adjustment requires notes".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let performed_by = performed_by.to_string();

        let movement_type = if reason == AdjustmentReason::Disposal && signed_delta < Decimal::ZERO
        {
            MovementType::Dispose
        } else {
            MovementType::Adjust
        };

        let formatted_notes = match notes.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => format!("{}: {}", reason.as_str(), n),
            _ => reason.as_str().to_string(),
        };

        let movement = db
            .transaction::<_, inventory_movement::Model, InventoryError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let item = InventoryItemEntity::find_by_id(item_id)
                        .one(txn)
                        .await
                        .map_err(InventoryError::db_error)?
                        .ok_or_else(|| {
                            InventoryError::NotFound(format!("Item {} not found", item_id))
                        })?;

                    if !item.is_active {
                        return Err(InventoryError::NotFound(format!(
                            "Item {} is not active",
                            item_id
                        )));
                    }

                    let mut movement_location = None;

                    if let Some(lot_id) = lot_id {
                        let lot = InventoryLotEntity::find_by_id(lot_id)
                            .one(txn)
                            .await
                            .map_err(InventoryError::db_error)?
                            .ok_or_else(|| {
                                InventoryError::NotFound(format!("Lot {} not found", lot_id))
                            })?;

                        if lot.item_id != item_id {
                            return Err(InventoryError::InvalidAdjustment(format!(
                                "Lot {} does not belong to item {}",
                                lot_id, item_id
                            )));
                        }

                        let new_remaining = lot.quantity_remaining + signed_delta;
                        if new_remaining < Decimal::ZERO {
                            return Err(InventoryError::InvalidAdjustment(format!(
                                "Adjustment of {} would drive lot {} below zero (remaining {})",
                                signed_delta, lot_id, lot.quantity_remaining
                            )));
                        }

                        movement_location = lot.storage_location.clone();

                        let mut active_lot: inventory_lot::ActiveModel = lot.into();
                        active_lot.quantity_remaining = Set(new_remaining);
                        active_lot.is_active = Set(new_remaining > Decimal::ZERO);
                        active_lot.updated_at = Set(now);
                        active_lot
                            .update(txn)
                            .await
                            .map_err(InventoryError::db_error)?;
                    }

                    let new_item_quantity = item.current_quantity + signed_delta;
                    if new_item_quantity < Decimal::ZERO {
                        return Err(InventoryError::InvalidAdjustment(format!(
                            "Adjustment of {} would drive item {} below zero (on hand {})",
                            signed_delta, item_id, item.current_quantity
                        )));
                    }

                    // Active lot totals must never exceed the cached item
                    // quantity, so a general decrease cannot cut below them.
                    if lot_id.is_none() && signed_delta < Decimal::ZERO {
                        let active_lots = InventoryLotEntity::find()
                            .filter(inventory_lot::Column::ItemId.eq(item_id))
                            .filter(inventory_lot::Column::IsActive.eq(true))
                            .all(txn)
                            .await
                            .map_err(InventoryError::db_error)?;
                        let lot_total: Decimal =
                            active_lots.iter().map(|l| l.quantity_remaining).sum();
                        if new_item_quantity < lot_total {
                            return Err(InventoryError::InvalidAdjustment(format!(
                                "General decrease would leave item {} below its active lot total {}",
                                item_id, lot_total
                            )));
                        }
                    }

                    let mut active_item: inventory_item::ActiveModel = item.into();
                    active_item.current_quantity = Set(new_item_quantity);
                    active_item.updated_at = Set(now);
                    active_item
                        .update(txn)
                        .await
                        .map_err(InventoryError::db_error)?;

                    let movement = inventory_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item_id),
                        lot_id: Set(lot_id),
                        movement_type: Set(movement_type),
                        quantity: Set(signed_delta),
                        from_location: Set(movement_location),
                        to_location: Set(None),
                        batch_id: Set(None),
                        task_id: Set(None),
                        notes: Set(Some(formatted_notes)),
                        performed_by: Set(performed_by),
                        created_at: Set(now),
                    };

                    movement.insert(txn).await.map_err(InventoryError::db_error)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => InventoryError::db_error(db_err),
                TransactionError::Transaction(inventory_err) => inventory_err,
            })?;

        self.event_sender
            .send(Event::StockAdjusted {
                item_id,
                lot_id,
                delta: signed_delta,
                reason: reason.as_str().to_string(),
            })
            .await
            .map_err(InventoryError::Event)?;

        info!(%item_id, ?lot_id, %signed_delta, reason = reason.as_str(), "Committed adjustment");

        Ok(movement)
    }
}
