//! Allocation Planner
//!
//! Decides which lots of an item are consumed to satisfy an issue or transfer
//! request. Planning is pure and side-effect free: it operates on a snapshot
//! of candidate lots and produces an advisory plan that the Movement Ledger
//! re-validates at commit time. Callers must never reimplement lot ordering;
//! this module is the single authority for it.

use std::cmp::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_item::Entity as InventoryItemEntity;
use crate::entities::inventory_lot;
use crate::errors::InventoryError;
use crate::services::lot_repository::LotRepository;

/// Ordering policy applied to candidate lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStrategy {
    /// Oldest stock first, by received date.
    Fifo,
    /// Newest stock first, by received date.
    Lifo,
    /// Soonest-to-expire first; lots without an expiry date go last.
    Fefo,
    /// Caller names a single target lot; no ordering applies.
    Manual,
}

impl AllocationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::Fifo => "fifo",
            AllocationStrategy::Lifo => "lifo",
            AllocationStrategy::Fefo => "fefo",
            AllocationStrategy::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fifo" => Some(AllocationStrategy::Fifo),
            "lifo" => Some(AllocationStrategy::Lifo),
            "fefo" => Some(AllocationStrategy::Fefo),
            "manual" => Some(AllocationStrategy::Manual),
            _ => None,
        }
    }
}

/// One proposed draw against a lot.
///
/// `lot_available` records the lot's `quantity_remaining` at planning time;
/// the ledger compares it against the re-read value to detect concurrent
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLine {
    pub lot_id: Uuid,
    pub lot_code: String,
    pub quantity: Decimal,
    pub lot_available: Decimal,
}

/// An ordered consumption proposal for a single item.
///
/// Advisory only: computed against a snapshot, authoritative validation
/// happens inside the commit transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    pub item_id: Uuid,
    pub strategy: AllocationStrategy,
    pub requested: Decimal,
    pub lines: Vec<PlanLine>,
}

impl ConsumptionPlan {
    /// Sum of all planned line quantities. Equals `requested` for any plan
    /// returned by the planner.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Total order used for FIFO: receipt date, then creation sequence, then lot
/// code. The trailing keys settle ties deterministically.
fn fifo_key(lot: &inventory_lot::Model) -> (chrono::NaiveDate, chrono::DateTime<chrono::Utc>, &str) {
    (lot.received_date, lot.created_at, lot.lot_code.as_str())
}

fn order_candidates(lots: &mut [inventory_lot::Model], strategy: AllocationStrategy) {
    match strategy {
        AllocationStrategy::Fifo => lots.sort_by(|a, b| fifo_key(a).cmp(&fifo_key(b))),
        AllocationStrategy::Lifo => lots.sort_by(|a, b| fifo_key(b).cmp(&fifo_key(a))),
        AllocationStrategy::Fefo => lots.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| fifo_key(a).cmp(&fifo_key(b))),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => fifo_key(a).cmp(&fifo_key(b)),
        }),
        // Manual plans never reach the ordering step.
        AllocationStrategy::Manual => {}
    }
}

/// Builds a consumption plan from a candidate snapshot.
///
/// Pure: no I/O, no clock. Walks the ordered candidates greedily, drawing
/// `min(remaining, lot.quantity_remaining)` from each until the request is
/// covered or candidates run out.
pub fn build_plan(
    item_id: Uuid,
    mut candidates: Vec<inventory_lot::Model>,
    requested: Decimal,
    strategy: AllocationStrategy,
) -> Result<ConsumptionPlan, InventoryError> {
    if requested <= Decimal::ZERO {
        return Err(InventoryError::Validation(format!(
            "Requested quantity must be positive, got {}",
            requested
        )));
    }

    order_candidates(&mut candidates, strategy);

    let mut remaining = requested;
    let mut lines = Vec::new();

    for lot in &candidates {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.quantity_remaining <= Decimal::ZERO {
            continue;
        }
        let quantity = remaining.min(lot.quantity_remaining);
        lines.push(PlanLine {
            lot_id: lot.id,
            lot_code: lot.lot_code.clone(),
            quantity,
            lot_available: lot.quantity_remaining,
        });
        remaining -= quantity;
    }

    if remaining > Decimal::ZERO {
        return Err(InventoryError::InsufficientStock {
            requested,
            available: requested - remaining,
            shortfall: remaining,
        });
    }

    Ok(ConsumptionPlan {
        item_id,
        strategy,
        requested,
        lines,
    })
}

/// Service wrapper that snapshots candidates and delegates to [`build_plan`].
#[derive(Clone)]
pub struct AllocationPlanner {
    db_pool: Arc<DatabaseConnection>,
    lots: LotRepository,
}

impl AllocationPlanner {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        let lots = LotRepository::new(db_pool.clone());
        Self { db_pool, lots }
    }

    /// Plans a consumption for `item_id` under the given strategy.
    ///
    /// `Manual` is not valid here; use [`AllocationPlanner::plan_manual`] with
    /// an explicit target lot instead.
    #[instrument(skip(self))]
    pub async fn plan_consumption(
        &self,
        item_id: Uuid,
        requested: Decimal,
        strategy: AllocationStrategy,
        location_filter: Option<&str>,
    ) -> Result<ConsumptionPlan, InventoryError> {
        if strategy == AllocationStrategy::Manual {
            return Err(InventoryError::Validation(
                "Manual strategy requires an explicit target lot; use plan_manual".to_string(),
            ));
        }

        self.require_active_item(item_id).await?;

        let candidates = self.lots.active_lots(item_id, location_filter).await?;
        build_plan(item_id, candidates, requested, strategy)
    }

    /// Builds a one-line plan against a caller-named lot, subject to the same
    /// validation and sufficiency checks as strategy planning.
    #[instrument(skip(self))]
    pub async fn plan_manual(
        &self,
        item_id: Uuid,
        lot_id: Uuid,
        requested: Decimal,
    ) -> Result<ConsumptionPlan, InventoryError> {
        self.require_active_item(item_id).await?;

        let lot = self.lots.find_lot_for_item(item_id, lot_id).await?;
        if !lot.is_active {
            return Err(InventoryError::NotFound(format!(
                "Lot {} is not active",
                lot_id
            )));
        }

        build_plan(item_id, vec![lot], requested, AllocationStrategy::Manual)
    }

    async fn require_active_item(&self, item_id: Uuid) -> Result<(), InventoryError> {
        let db = &*self.db_pool;
        let item = InventoryItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(InventoryError::db_error)?
            .ok_or_else(|| InventoryError::NotFound(format!("Item {} not found", item_id)))?;

        if !item.is_active {
            return Err(InventoryError::NotFound(format!(
                "Item {} is not active",
                item_id
            )));
        }

        Ok(())
    }
}
