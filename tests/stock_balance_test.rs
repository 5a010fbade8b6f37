mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use canopy_inventory::entities::inventory_item::{self, Entity as InventoryItemEntity};
use canopy_inventory::{ExpiryStatus, InventoryError, StockStatus};
use common::{metadata, TestCore};

async fn set_thresholds(
    harness: &TestCore,
    item_id: Uuid,
    reorder_point: Option<rust_decimal::Decimal>,
    minimum: Option<rust_decimal::Decimal>,
    reserved: rust_decimal::Decimal,
) {
    let item = InventoryItemEntity::find_by_id(item_id)
        .one(harness.db.as_ref())
        .await
        .expect("query")
        .expect("item");
    let mut active: inventory_item::ActiveModel = item.into();
    active.reorder_point = Set(reorder_point);
    active.minimum_quantity = Set(minimum);
    active.reserved_quantity = Set(reserved);
    active.update(harness.db.as_ref()).await.expect("update");
}

#[tokio::test]
async fn balance_reflects_thresholds_and_reservations() {
    let harness = TestCore::new().await;
    let item_id = harness.seed_item("CO2 Canisters", "unit").await;

    let balance = harness.core.get_stock_balance(item_id).await.expect("balance");
    assert_eq!(balance.status, StockStatus::OutOfStock);

    harness
        .core
        .commit_receipt(item_id, dec!(50), None, metadata("receiving"))
        .await
        .expect("receipt");

    set_thresholds(&harness, item_id, Some(dec!(20)), Some(dec!(60)), dec!(35)).await;

    // 50 on hand, 35 reserved: 15 available, under the reorder point.
    let balance = harness.core.get_stock_balance(item_id).await.expect("balance");
    assert_eq!(balance.on_hand, dec!(50));
    assert_eq!(balance.reserved, dec!(35));
    assert_eq!(balance.available, dec!(15));
    assert_eq!(balance.status, StockStatus::Reorder);

    // With no reorder point the same figures fall back to below-par.
    set_thresholds(&harness, item_id, None, Some(dec!(60)), dec!(35)).await;
    let balance = harness.core.get_stock_balance(item_id).await.expect("balance");
    assert_eq!(balance.status, StockStatus::BelowPar);

    set_thresholds(&harness, item_id, None, None, dec!(0)).await;
    let balance = harness.core.get_stock_balance(item_id).await.expect("balance");
    assert_eq!(balance.status, StockStatus::Ok);
    assert_eq!(balance.available, dec!(50));
}

#[tokio::test]
async fn unknown_item_has_no_balance() {
    let harness = TestCore::new().await;
    let err = harness
        .core
        .get_stock_balance(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, InventoryError::NotFound(_));
}

#[tokio::test]
async fn expiry_status_classifies_active_lots() {
    let harness = TestCore::new().await;
    let item_id = harness.seed_item("Beneficial Nematodes", "pack").await;

    let today = Utc::now().date_naive();
    harness
        .receive_lot(
            item_id,
            "LOT-PAST",
            dec!(5),
            today - Duration::days(90),
            Some(today - Duration::days(1)),
        )
        .await;
    harness
        .receive_lot(
            item_id,
            "LOT-SOON",
            dec!(5),
            today - Duration::days(30),
            Some(today + Duration::days(10)),
        )
        .await;
    harness
        .receive_lot(
            item_id,
            "LOT-FAR",
            dec!(5),
            today - Duration::days(10),
            Some(today + Duration::days(200)),
        )
        .await;
    harness
        .receive_lot(item_id, "LOT-NONE", dec!(5), today, None)
        .await;

    let statuses = harness.core.get_expiry_status(item_id).await.expect("expiry");
    assert_eq!(statuses.len(), 4);

    let by_code = |code: &str| {
        statuses
            .iter()
            .find(|s| s.lot_code == code)
            .unwrap_or_else(|| panic!("missing {code}"))
    };
    assert_eq!(by_code("LOT-PAST").status, ExpiryStatus::Expired);
    assert_eq!(by_code("LOT-SOON").status, ExpiryStatus::ExpiringSoon);
    assert_eq!(by_code("LOT-FAR").status, ExpiryStatus::Ok);
    assert_eq!(by_code("LOT-NONE").status, ExpiryStatus::Ok);
}
