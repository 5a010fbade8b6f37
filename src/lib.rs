//! Canopy Inventory
//!
//! Lot-based inventory allocation and movement ledgering for a cultivation
//! facility: deciding which physical lots of a stocked item are consumed to
//! satisfy an issue or transfer request under a selectable ordering policy
//! (FIFO/LIFO/FEFO/manual), while keeping per-lot and per-item quantities
//! consistent under concurrent writers.
//!
//! The crate is a library-level contract intended to sit behind whatever API
//! or CLI layer a caller builds. Persistence is a transactional relational
//! store handed in at construction; planning is pure and advisory, and every
//! commit re-validates its plan inside a transaction before mutating
//! anything.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

pub use crate::config::AppConfig;
pub use crate::errors::InventoryError;
pub use crate::events::{Event, EventSender};
pub use crate::services::{
    AdjustmentPreview, AdjustmentReason, AdjustmentRequest, AdjustmentType, AllocationStrategy,
    ConsumptionPlan, Destination, ExpiryStatus, LotExpiry, MovementMetadata, NewLotFields,
    PlanLine, ReceiptOutcome, StockBalance, StockStatus,
};

use crate::entities::{inventory_lot, inventory_movement};
use crate::services::{
    AdjustmentService, AllocationPlanner, LotRepository, MovementLedger, StockBalanceService,
};

/// Facade wiring the allocation planner, movement ledger, balance projector
/// and adjustment handler over one shared connection pool.
///
/// The injected [`DatabaseConnection`] is the pluggable persistence boundary;
/// the core holds no global state of its own.
#[derive(Clone)]
pub struct InventoryCore {
    planner: AllocationPlanner,
    ledger: MovementLedger,
    balances: StockBalanceService,
    adjustments: AdjustmentService,
    lots: LotRepository,
}

impl InventoryCore {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self {
            planner: AllocationPlanner::new(db.clone()),
            ledger: MovementLedger::new(db.clone(), event_sender.clone()),
            balances: StockBalanceService::new(db.clone(), config.expiry_horizon_days),
            adjustments: AdjustmentService::new(db.clone(), event_sender),
            lots: LotRepository::new(db),
        }
    }

    /// Plans a consumption under a FIFO/LIFO/FEFO strategy. Advisory; commit
    /// with [`InventoryCore::commit_consumption`].
    pub async fn plan_consumption(
        &self,
        item_id: Uuid,
        requested: Decimal,
        strategy: AllocationStrategy,
        location_filter: Option<&str>,
    ) -> Result<ConsumptionPlan, InventoryError> {
        self.planner
            .plan_consumption(item_id, requested, strategy, location_filter)
            .await
    }

    /// Plans a consumption against a single caller-named lot.
    pub async fn plan_manual(
        &self,
        item_id: Uuid,
        lot_id: Uuid,
        requested: Decimal,
    ) -> Result<ConsumptionPlan, InventoryError> {
        self.planner.plan_manual(item_id, lot_id, requested).await
    }

    /// Atomically applies a consumption plan toward a batch, task or
    /// location destination.
    pub async fn commit_consumption(
        &self,
        plan: &ConsumptionPlan,
        destination: Destination,
        metadata: MovementMetadata,
    ) -> Result<Vec<inventory_movement::Model>, InventoryError> {
        self.ledger
            .commit_consumption(plan, destination, metadata)
            .await
    }

    /// Records a receipt, creating a lot when lot fields are supplied.
    pub async fn commit_receipt(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        lot_fields: Option<NewLotFields>,
        metadata: MovementMetadata,
    ) -> Result<ReceiptOutcome, InventoryError> {
        self.ledger
            .commit_receipt(item_id, quantity, lot_fields, metadata)
            .await
    }

    /// Validates and applies a manual correction.
    pub async fn commit_adjustment(
        &self,
        request: AdjustmentRequest,
    ) -> Result<inventory_movement::Model, InventoryError> {
        self.adjustments.commit(request).await
    }

    /// Advisory preview of an adjustment's resulting quantity.
    pub async fn preview_adjustment(
        &self,
        item_id: Uuid,
        lot_id: Option<Uuid>,
        adjustment_type: AdjustmentType,
        magnitude: Decimal,
    ) -> Result<AdjustmentPreview, InventoryError> {
        self.adjustments
            .preview(item_id, lot_id, adjustment_type, magnitude)
            .await
    }

    /// Current projected balance for an item.
    pub async fn get_stock_balance(&self, item_id: Uuid) -> Result<StockBalance, InventoryError> {
        self.balances.get_stock_balance(item_id).await
    }

    /// Expiry classification for an item's active lots.
    pub async fn get_expiry_status(&self, item_id: Uuid) -> Result<Vec<LotExpiry>, InventoryError> {
        self.balances.get_expiry_status(item_id).await
    }

    /// All lots for an item, newest first, including depleted ones.
    pub async fn lots_for_item(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<inventory_lot::Model>, InventoryError> {
        self.lots.lots_for_item(item_id).await
    }
}
