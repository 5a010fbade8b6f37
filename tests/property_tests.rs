//! Property-based tests for the allocation planner and the ledger.
//!
//! These use proptest to verify invariants across a wide range of inputs:
//! plans never over-allocate, and no interleaving of receipts, consumptions
//! and adjustments can drive a lot negative or break ledger replay.

mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use canopy_inventory::entities::{inventory_lot, inventory_movement, MovementType};
use canopy_inventory::services::allocation::build_plan;
use canopy_inventory::{
    AdjustmentReason, AdjustmentRequest, AdjustmentType, AllocationStrategy, Destination,
    InventoryError,
};
use common::{metadata, TestCore};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn snapshot_lot(seq: usize, received_offset: i64, expiry_offset: Option<i64>, remaining: u32) -> inventory_lot::Model {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seq as i64);
    inventory_lot::Model {
        id: Uuid::new_v4(),
        item_id: Uuid::nil(),
        lot_code: format!("LOT-{seq:03}"),
        quantity_received: Decimal::from(remaining),
        quantity_remaining: Decimal::from(remaining),
        unit_of_measure: "g".to_string(),
        received_date: base_date() + Duration::days(received_offset),
        expiry_date: expiry_offset.map(|o| base_date() + Duration::days(o)),
        manufacture_date: None,
        storage_location: None,
        cost_per_unit: None,
        is_active: true,
        created_at: created,
        updated_at: created,
    }
}

fn lot_strategy() -> impl Strategy<Value = (i64, Option<i64>, u32)> {
    (0i64..60, proptest::option::of(0i64..120), 1u32..100)
}

fn strategy_strategy() -> impl Strategy<Value = AllocationStrategy> {
    prop_oneof![
        Just(AllocationStrategy::Fifo),
        Just(AllocationStrategy::Lifo),
        Just(AllocationStrategy::Fefo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn plans_cover_exactly_what_they_promise(
        lots in proptest::collection::vec(lot_strategy(), 0..8),
        requested in 1u32..500,
        strategy in strategy_strategy(),
    ) {
        let candidates: Vec<inventory_lot::Model> = lots
            .iter()
            .enumerate()
            .map(|(seq, (recv, expiry, remaining))| snapshot_lot(seq, *recv, *expiry, *remaining))
            .collect();
        let available: Decimal = candidates.iter().map(|l| l.quantity_remaining).sum();
        let requested = Decimal::from(requested);

        match build_plan(Uuid::nil(), candidates, requested, strategy) {
            Ok(plan) => {
                prop_assert_eq!(plan.total(), requested);
                // No line draws more than its snapshot allows, and no lot
                // appears twice.
                for line in &plan.lines {
                    prop_assert!(line.quantity > Decimal::ZERO);
                    prop_assert!(line.quantity <= line.lot_available);
                }
                let mut ids: Vec<Uuid> = plan.lines.iter().map(|l| l.lot_id).collect();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), plan.lines.len());
            }
            Err(InventoryError::InsufficientStock { requested: r, available: a, shortfall }) => {
                prop_assert!(available < requested);
                prop_assert_eq!(r, requested);
                prop_assert_eq!(a, available);
                prop_assert_eq!(shortfall, requested - available);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    #[test]
    fn fefo_never_draws_undated_before_dated(
        lots in proptest::collection::vec(lot_strategy(), 2..8),
        requested in 1u32..400,
    ) {
        let candidates: Vec<inventory_lot::Model> = lots
            .iter()
            .enumerate()
            .map(|(seq, (recv, expiry, remaining))| snapshot_lot(seq, *recv, *expiry, *remaining))
            .collect();
        let dated: std::collections::HashSet<Uuid> = candidates
            .iter()
            .filter(|l| l.expiry_date.is_some())
            .map(|l| l.id)
            .collect();

        if let Ok(plan) = build_plan(
            Uuid::nil(),
            candidates,
            Decimal::from(requested),
            AllocationStrategy::Fefo,
        ) {
            let first_undated = plan.lines.iter().position(|l| !dated.contains(&l.lot_id));
            if let Some(pos) = first_undated {
                // Once an undated lot is drawn, every dated lot is exhausted
                // behind it.
                for line in &plan.lines[..pos] {
                    prop_assert!(dated.contains(&line.lot_id));
                    prop_assert_eq!(line.quantity, line.lot_available);
                }
            }
        }
    }
}

/// One randomized step against the live core.
#[derive(Debug, Clone)]
enum LedgerOp {
    Receive(u32),
    Consume(u32),
    AdjustLot { pick: usize, delta: i32 },
    AdjustGeneral { delta: i32 },
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1u32..50).prop_map(LedgerOp::Receive),
        (1u32..60).prop_map(LedgerOp::Consume),
        (0usize..4, -10i32..10).prop_map(|(pick, delta)| LedgerOp::AdjustLot { pick, delta }),
        (-10i32..10).prop_map(|delta| LedgerOp::AdjustGeneral { delta }),
    ]
}

async fn apply_ops(ops: Vec<LedgerOp>) -> Result<(), TestCaseError> {
    let harness = TestCore::new().await;
    let item_id = harness.seed_item("Property Item", "g").await;
    let mut receipt_seq = 0u32;

    for op in ops {
        match op {
            LedgerOp::Receive(quantity) => {
                receipt_seq += 1;
                harness
                    .receive_lot(
                        item_id,
                        &format!("LOT-{receipt_seq:03}"),
                        Decimal::from(quantity),
                        base_date() + Duration::days(receipt_seq as i64),
                        None,
                    )
                    .await;
            }
            LedgerOp::Consume(quantity) => {
                let plan = match harness
                    .core
                    .plan_consumption(
                        item_id,
                        Decimal::from(quantity),
                        AllocationStrategy::Fifo,
                        None,
                    )
                    .await
                {
                    Ok(plan) => plan,
                    Err(InventoryError::InsufficientStock { .. }) => continue,
                    Err(e) => return Err(TestCaseError::fail(format!("plan: {e}"))),
                };
                harness
                    .core
                    .commit_consumption(&plan, Destination::Batch(Uuid::new_v4()), metadata("p"))
                    .await
                    .map_err(|e| TestCaseError::fail(format!("consume: {e}")))?;
            }
            LedgerOp::AdjustLot { pick, delta } => {
                if delta == 0 {
                    continue;
                }
                let lots = harness
                    .core
                    .lots_for_item(item_id)
                    .await
                    .map_err(|e| TestCaseError::fail(format!("lots: {e}")))?;
                if lots.is_empty() {
                    continue;
                }
                let lot = &lots[pick % lots.len()];
                let (adjustment_type, magnitude) = if delta > 0 {
                    (AdjustmentType::Increase, Decimal::from(delta))
                } else {
                    (AdjustmentType::Decrease, Decimal::from(-delta))
                };
                let result = harness
                    .core
                    .commit_adjustment(AdjustmentRequest {
                        item_id,
                        lot_id: Some(lot.id),
                        adjustment_type,
                        magnitude,
                        reason: AdjustmentReason::CountCorrection,
                        notes: Some("randomized correction".to_string()),
                        performed_by: "prop".to_string(),
                    })
                    .await;
                match result {
                    Ok(_) => {}
                    // Rejected decreases below zero leave no trace.
                    Err(InventoryError::InvalidAdjustment(_)) => {}
                    Err(e) => return Err(TestCaseError::fail(format!("adjust lot: {e}"))),
                }
            }
            LedgerOp::AdjustGeneral { delta } => {
                if delta == 0 {
                    continue;
                }
                let (adjustment_type, magnitude) = if delta > 0 {
                    (AdjustmentType::Increase, Decimal::from(delta))
                } else {
                    (AdjustmentType::Decrease, Decimal::from(-delta))
                };
                let result = harness
                    .core
                    .commit_adjustment(AdjustmentRequest {
                        item_id,
                        lot_id: None,
                        adjustment_type,
                        magnitude,
                        reason: AdjustmentReason::CountCorrection,
                        notes: Some("randomized correction".to_string()),
                        performed_by: "prop".to_string(),
                    })
                    .await;
                match result {
                    Ok(_) => {}
                    Err(InventoryError::InvalidAdjustment(_)) => {}
                    Err(e) => return Err(TestCaseError::fail(format!("adjust item: {e}"))),
                }
            }
        }
    }

    // Invariants, regardless of the interleaving above.
    let lots = harness
        .core
        .lots_for_item(item_id)
        .await
        .map_err(|e| TestCaseError::fail(format!("lots: {e}")))?;
    for lot in &lots {
        prop_assert!(lot.quantity_remaining >= Decimal::ZERO);
        prop_assert_eq!(lot.is_active, lot.quantity_remaining > Decimal::ZERO);
    }

    let balance = harness
        .core
        .get_stock_balance(item_id)
        .await
        .map_err(|e| TestCaseError::fail(format!("balance: {e}")))?;
    let lot_sum: Decimal = lots
        .iter()
        .filter(|l| l.is_active)
        .map(|l| l.quantity_remaining)
        .sum();
    prop_assert!(lot_sum <= balance.on_hand);

    // Ledger replay reproduces every lot's remaining quantity.
    for lot in &lots {
        let movements = inventory_movement::Entity::find()
            .filter(inventory_movement::Column::LotId.eq(lot.id))
            .all(harness.db.as_ref())
            .await
            .map_err(|e| TestCaseError::fail(format!("movements: {e}")))?;
        let replayed: Decimal = movements
            .iter()
            .map(|m| match m.movement_type {
                MovementType::Receive => m.quantity,
                MovementType::Consume | MovementType::Transfer => -m.quantity,
                MovementType::Adjust | MovementType::Dispose => m.quantity,
            })
            .sum();
        prop_assert_eq!(replayed, lot.quantity_remaining);
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn interleaved_operations_never_break_lot_invariants(
        ops in proptest::collection::vec(ledger_op_strategy(), 1..16),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        if let Err(e) = rt.block_on(apply_ops(ops)) {
            panic!("property violated: {e}");
        }
    }
}
