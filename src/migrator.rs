use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_inventory_items_table::Migration),
            Box::new(m20240301_000002_create_inventory_lots_table::Migration),
            Box::new(m20240301_000003_create_inventory_movements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_inventory_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Sku).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::UnitOfMeasure)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::ItemType).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::CurrentQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ReservedQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::MinimumQuantity)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ReorderPoint)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::DefaultLocation)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::LotTracked)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::IsActive)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_items_sku")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum InventoryItems {
        Table,
        Id,
        Name,
        Sku,
        UnitOfMeasure,
        ItemType,
        CurrentQuantity,
        ReservedQuantity,
        MinimumQuantity,
        ReorderPoint,
        DefaultLocation,
        LotTracked,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_inventory_lots_table {

    use sea_orm_migration::prelude::*;

    use super::m20240301_000001_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_inventory_lots_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryLots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLots::ItemId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLots::LotCode).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLots::QuantityReceived)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::QuantityRemaining)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::UnitOfMeasure)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::ReceivedDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLots::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(InventoryLots::ManufactureDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::StorageLocation)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::CostPerUnit)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryLots::IsActive).boolean().not_null())
                        .col(
                            ColumnDef::new(InventoryLots::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLots::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_lots_item")
                                .from(InventoryLots::Table, InventoryLots::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_lots_item_code")
                        .table(InventoryLots::Table)
                        .col(InventoryLots::ItemId)
                        .col(InventoryLots::LotCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_lots_item_active")
                        .table(InventoryLots::Table)
                        .col(InventoryLots::ItemId)
                        .col(InventoryLots::IsActive)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryLots::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum InventoryLots {
        Table,
        Id,
        ItemId,
        LotCode,
        QuantityReceived,
        QuantityRemaining,
        UnitOfMeasure,
        ReceivedDate,
        ExpiryDate,
        ManufactureDate,
        StorageLocation,
        CostPerUnit,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_inventory_movements_table {

    use sea_orm_migration::prelude::*;

    use super::m20240301_000001_create_inventory_items_table::InventoryItems;
    use super::m20240301_000002_create_inventory_lots_table::InventoryLots;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_inventory_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::ItemId).uuid().not_null())
                        .col(ColumnDef::new(InventoryMovements::LotId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::FromLocation)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::ToLocation)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::BatchId).uuid().null())
                        .col(ColumnDef::new(InventoryMovements::TaskId).uuid().null())
                        .col(ColumnDef::new(InventoryMovements::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryMovements::PerformedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_movements_item")
                                .from(InventoryMovements::Table, InventoryMovements::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_movements_lot")
                                .from(InventoryMovements::Table, InventoryMovements::LotId)
                                .to(InventoryLots::Table, InventoryLots::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_movements_item")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_movements_lot")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::LotId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum InventoryMovements {
        Table,
        Id,
        ItemId,
        LotId,
        MovementType,
        Quantity,
        FromLocation,
        ToLocation,
        BatchId,
        TaskId,
        Notes,
        PerformedBy,
        CreatedAt,
    }
}
