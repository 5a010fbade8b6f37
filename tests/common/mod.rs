#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use canopy_inventory::entities::inventory_item;
use canopy_inventory::events::{event_channel, process_events};
use canopy_inventory::migrator::Migrator;
use canopy_inventory::{AppConfig, InventoryCore, MovementMetadata, NewLotFields};

/// Harness wrapping an [`InventoryCore`] over a fresh in-memory SQLite
/// database with migrations applied.
pub struct TestCore {
    pub core: InventoryCore,
    pub db: Arc<DatabaseConnection>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestCore {
    /// Construct a core with fresh database state.
    pub async fn new() -> Self {
        // A single pooled connection keeps every statement on the same
        // in-memory database.
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).sqlx_logging(false);

        let db = Database::connect(opt).await.expect("db connect");
        Migrator::up(&db, None).await.expect("migrations");
        let db = Arc::new(db);

        let (sender, rx) = event_channel(64);
        let event_task = tokio::spawn(process_events(rx));

        let core = InventoryCore::new(db.clone(), sender, &AppConfig::default());

        Self {
            core,
            db,
            _event_task: event_task,
        }
    }

    /// Inserts a catalog item with zeroed quantity caches.
    pub async fn seed_item(&self, name: &str, unit: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let item = inventory_item::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            sku: Set(format!("SKU-{}", &id.simple().to_string()[..8])),
            unit_of_measure: Set(unit.to_string()),
            item_type: Set("raw_material".to_string()),
            current_quantity: Set(Decimal::ZERO),
            reserved_quantity: Set(Decimal::ZERO),
            minimum_quantity: Set(None),
            reorder_point: Set(None),
            default_location: Set(None),
            lot_tracked: Set(true),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        item.insert(self.db.as_ref()).await.expect("seed item");

        id
    }

    /// Receives a lot through the real ledger path so quantity caches stay
    /// consistent with the movement history.
    pub async fn receive_lot(
        &self,
        item_id: Uuid,
        lot_code: &str,
        quantity: Decimal,
        received: NaiveDate,
        expiry: Option<NaiveDate>,
    ) -> Uuid {
        let outcome = self
            .core
            .commit_receipt(
                item_id,
                quantity,
                Some(NewLotFields {
                    lot_code: lot_code.to_string(),
                    received_date: Some(received),
                    expiry_date: expiry,
                    manufacture_date: None,
                    storage_location: None,
                    cost_per_unit: None,
                    unit_of_measure: None,
                }),
                metadata("receiving"),
            )
            .await
            .expect("receipt");

        outcome.lot.expect("lot created").id
    }
}

/// Movement attribution used across the integration tests.
pub fn metadata(actor: &str) -> MovementMetadata {
    MovementMetadata {
        performed_by: actor.to_string(),
        notes: None,
    }
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
