//! Stock Balance Projector
//!
//! Read-only derivation of item availability and lot expiry state. Balances
//! are recomputed on every read rather than cached, so concurrent ledger
//! writes can never leave a stale figure behind. No other component derives
//! availability independently.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_item::{self, Entity as InventoryItemEntity};
use crate::entities::inventory_lot;
use crate::errors::InventoryError;
use crate::services::lot_repository::LotRepository;

/// Availability classification for an item, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    OutOfStock,
    Reorder,
    BelowPar,
    Ok,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Reorder => "reorder",
            StockStatus::BelowPar => "below_par",
            StockStatus::Ok => "ok",
        }
    }
}

/// Projected availability for a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub item_id: Uuid,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub available: Decimal,
    pub status: StockStatus,
}

/// Projects an item's cached quantities into a balance.
///
/// `available = max(0, on_hand - reserved)`. Status precedence:
/// out_of_stock > reorder > below_par > ok.
pub fn project(item: &inventory_item::Model) -> StockBalance {
    let on_hand = item.current_quantity;
    let reserved = item.reserved_quantity;
    let available = (on_hand - reserved).max(Decimal::ZERO);

    let status = if on_hand <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if item
        .reorder_point
        .is_some_and(|point| available > Decimal::ZERO && available < point)
    {
        StockStatus::Reorder
    } else if item.minimum_quantity.is_some_and(|par| available < par) {
        StockStatus::BelowPar
    } else {
        StockStatus::Ok
    };

    StockBalance {
        item_id: item.id,
        on_hand,
        reserved,
        available,
        status,
    }
}

/// Expiry classification for a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Ok,
}

impl ExpiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::ExpiringSoon => "expiring_soon",
            ExpiryStatus::Ok => "ok",
        }
    }
}

/// Classifies a lot's expiry relative to `today`.
///
/// Lots with no expiry date are never expired or expiring.
pub fn classify_expiry(
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
    horizon_days: i64,
) -> ExpiryStatus {
    match expiry_date {
        None => ExpiryStatus::Ok,
        Some(date) if date < today => ExpiryStatus::Expired,
        Some(date) if date <= today + Duration::days(horizon_days) => ExpiryStatus::ExpiringSoon,
        Some(_) => ExpiryStatus::Ok,
    }
}

/// Per-lot expiry summary for dashboards and FEFO candidate display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotExpiry {
    pub lot_id: Uuid,
    pub lot_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity_remaining: Decimal,
    pub status: ExpiryStatus,
}

impl LotExpiry {
    fn from_lot(lot: &inventory_lot::Model, today: NaiveDate, horizon_days: i64) -> Self {
        Self {
            lot_id: lot.id,
            lot_code: lot.lot_code.clone(),
            expiry_date: lot.expiry_date,
            quantity_remaining: lot.quantity_remaining,
            status: classify_expiry(lot.expiry_date, today, horizon_days),
        }
    }
}

/// Read-only projection service over items and lots.
#[derive(Clone)]
pub struct StockBalanceService {
    db_pool: Arc<DatabaseConnection>,
    lots: LotRepository,
    expiry_horizon_days: i64,
}

impl StockBalanceService {
    pub fn new(db_pool: Arc<DatabaseConnection>, expiry_horizon_days: i64) -> Self {
        let lots = LotRepository::new(db_pool.clone());
        Self {
            db_pool,
            lots,
            expiry_horizon_days,
        }
    }

    /// Current balance for an item.
    #[instrument(skip(self))]
    pub async fn get_stock_balance(&self, item_id: Uuid) -> Result<StockBalance, InventoryError> {
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

        Ok(project(&item))
    }

    /// Expiry classification for every active lot of an item.
    #[instrument(skip(self))]
    pub async fn get_expiry_status(&self, item_id: Uuid) -> Result<Vec<LotExpiry>, InventoryError> {
        let today = Utc::now().date_naive();
        let lots = self.lots.active_lots(item_id, None).await?;

        Ok(lots
            .iter()
            .map(|lot| LotExpiry::from_lot(lot, today, self.expiry_horizon_days))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn item(
        on_hand: Decimal,
        reserved: Decimal,
        reorder_point: Option<Decimal>,
        minimum: Option<Decimal>,
    ) -> inventory_item::Model {
        inventory_item::Model {
            id: Uuid::new_v4(),
            name: "Nutrient Solution".to_string(),
            sku: "NUTR-001".to_string(),
            unit_of_measure: "L".to_string(),
            item_type: "nutrient".to_string(),
            current_quantity: on_hand,
            reserved_quantity: reserved,
            minimum_quantity: minimum,
            reorder_point,
            default_location: None,
            lot_tracked: true,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn available_clamps_at_zero() {
        let balance = project(&item(dec!(5), dec!(8), None, None));
        assert_eq!(balance.available, Decimal::ZERO);
        assert_eq!(balance.status, StockStatus::Ok);
    }

    #[test]
    fn out_of_stock_takes_precedence() {
        let balance = project(&item(dec!(0), dec!(0), Some(dec!(10)), Some(dec!(20))));
        assert_eq!(balance.status, StockStatus::OutOfStock);
    }

    #[test]
    fn reorder_beats_below_par() {
        let balance = project(&item(dec!(5), dec!(0), Some(dec!(10)), Some(dec!(20))));
        assert_eq!(balance.status, StockStatus::Reorder);
    }

    #[test]
    fn below_par_when_no_reorder_point() {
        let balance = project(&item(dec!(5), dec!(0), None, Some(dec!(20))));
        assert_eq!(balance.status, StockStatus::BelowPar);
    }

    #[test]
    fn healthy_item_is_ok() {
        let balance = project(&item(dec!(100), dec!(10), Some(dec!(20)), Some(dec!(30))));
        assert_eq!(balance.status, StockStatus::Ok);
        assert_eq!(balance.available, dec!(90));
    }

    #[test]
    fn expiry_classification_boundaries() {
        let today = day(15);
        assert_eq!(classify_expiry(None, today, 30), ExpiryStatus::Ok);
        assert_eq!(
            classify_expiry(Some(day(14)), today, 30),
            ExpiryStatus::Expired
        );
        assert_eq!(
            classify_expiry(Some(day(15)), today, 30),
            ExpiryStatus::ExpiringSoon
        );
        assert_eq!(
            classify_expiry(Some(day(20)), today, 3),
            ExpiryStatus::Ok
        );
        assert_eq!(
            classify_expiry(Some(day(18)), today, 3),
            ExpiryStatus::ExpiringSoon
        );
    }
}
