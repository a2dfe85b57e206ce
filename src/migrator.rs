use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_parties_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_orders_tables::Migration),
            Box::new(m20240301_000004_create_billing_tables::Migration),
            Box::new(m20240301_000005_create_banking_tables::Migration),
            Box::new(m20240301_000006_create_client_inventory_tables::Migration),
            Box::new(m20240301_000007_create_purchase_tables::Migration),
            Box::new(m20240301_000008_create_engagement_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_parties_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_parties_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(
                            ColumnDef::new(Customers::CreditLimit)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::AvailableCredit)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::PointsBalance)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::LifetimePoints)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Customers::ReferredById).uuid().null())
                        .col(
                            ColumnDef::new(Customers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sellers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sellers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sellers::Name).string().not_null())
                        .col(ColumnDef::new(Sellers::Phone).string().null())
                        .col(
                            ColumnDef::new(Sellers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Sellers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_referred_by_id")
                        .table(Customers::Table)
                        .col(Customers::ReferredById)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sellers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Name,
        Phone,
        CreditLimit,
        AvailableCredit,
        PointsBalance,
        LifetimePoints,
        ReferredById,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sellers {
        Table,
        Id,
        Name,
        Phone,
        Active,
        CreatedAt,
    }
}

mod m20240301_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Price).decimal_len(14, 2).not_null())
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Suppliers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::Document).string().null())
                        .col(
                            ColumnDef::new(Suppliers::IsInternal)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Sku,
        Price,
        CostPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        Document,
        IsInternal,
        CreatedAt,
    }
}

mod m20240301_000003_create_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).big_integer().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::SellerId).uuid().null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Orders::Total)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::BankAccountId).uuid().null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TotalPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        SellerId,
        Status,
        PaymentStatus,
        Total,
        BankAccountId,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Quantity,
        UnitPrice,
        TotalPrice,
    }
}

mod m20240301_000004_create_billing_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_billing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receivables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Receivables::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Receivables::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Receivables::Amount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Receivables::DueDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::BankAccountId).uuid().null())
                        .col(
                            ColumnDef::new(Receivables::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Receivables::Description).string().not_null())
                        .col(
                            ColumnDef::new(Receivables::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Receivables::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receivables_order_id")
                        .table(Receivables::Table)
                        .col(Receivables::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Boletos::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Boletos::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Boletos::OrderId).uuid().null())
                        .col(ColumnDef::new(Boletos::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Boletos::InstallmentNumber)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Boletos::Amount).decimal_len(14, 2).not_null())
                        .col(
                            ColumnDef::new(Boletos::DueDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Boletos::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Boletos::PixPaymentId).string().null())
                        .col(
                            ColumnDef::new(Boletos::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Boletos::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_boletos_order_id")
                        .table(Boletos::Table)
                        .col(Boletos::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Boletos::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Receivables::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Receivables {
        Table,
        Id,
        OrderId,
        CustomerId,
        Amount,
        Status,
        DueDate,
        BankAccountId,
        PaidAt,
        Description,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Boletos {
        Table,
        Id,
        OrderId,
        CustomerId,
        InstallmentNumber,
        Amount,
        DueDate,
        Status,
        PixPaymentId,
        CancelledAt,
        CreatedAt,
    }
}

mod m20240301_000005_create_banking_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_banking_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BankAccounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BankAccounts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BankAccounts::Name).string().not_null())
                        .col(
                            ColumnDef::new(BankAccounts::Balance)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BankAccounts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BankAccounts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::BankAccountId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::Kind).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Transactions::Amount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Description).string().not_null())
                        .col(ColumnDef::new(Transactions::ReferenceId).uuid().null())
                        .col(ColumnDef::new(Transactions::ReferenceType).string_len(32).null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_account_created")
                        .table(Transactions::Table)
                        .col(Transactions::BankAccountId)
                        .col(Transactions::CreatedAt)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_reference_id")
                        .table(Transactions::Table)
                        .col(Transactions::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BankAccounts {
        Table,
        Id,
        Name,
        Balance,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        BankAccountId,
        Kind,
        Amount,
        Description,
        ReferenceId,
        ReferenceType,
        CreatedAt,
    }
}

mod m20240301_000006_create_client_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_client_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ClientProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClientProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClientProducts::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(ClientProducts::SourceProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClientProducts::Name).string().not_null())
                        .col(
                            ColumnDef::new(ClientProducts::CostPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientProducts::SalePrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_client_products_customer_source")
                        .table(ClientProducts::Table)
                        .col(ClientProducts::CustomerId)
                        .col(ClientProducts::SourceProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClientInventories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClientInventories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClientInventories::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(ClientInventories::ClientProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventories::CurrentStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ClientInventories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_client_inventories_product")
                        .table(ClientInventories::Table)
                        .col(ClientInventories::ClientProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClientInventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClientInventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::ClientInventoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::Kind)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::Reason)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::ReferenceId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ClientInventoryMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_client_inventory_movements_reference")
                        .table(ClientInventoryMovements::Table)
                        .col(ClientInventoryMovements::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(ClientInventoryMovements::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(ClientInventories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ClientProducts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ClientProducts {
        Table,
        Id,
        CustomerId,
        SourceProductId,
        Name,
        CostPrice,
        SalePrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ClientInventories {
        Table,
        Id,
        CustomerId,
        ClientProductId,
        CurrentStock,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ClientInventoryMovements {
        Table,
        Id,
        ClientInventoryId,
        Kind,
        Quantity,
        Reason,
        ReferenceId,
        CreatedAt,
    }
}

mod m20240301_000007_create_purchase_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_purchase_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Purchases::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Purchases::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Purchases::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Purchases::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(Purchases::InvoiceNumber).string().not_null())
                        .col(ColumnDef::new(Purchases::OrderId).uuid().null())
                        .col(ColumnDef::new(Purchases::Total).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Purchases::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Purchases::BankAccountId).uuid().null())
                        .col(
                            ColumnDef::new(Purchases::PurchasedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Purchases::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Purchases::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchases_customer_invoice")
                        .table(Purchases::Table)
                        .col(Purchases::CustomerId)
                        .col(Purchases::InvoiceNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseItems::PurchaseId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseItems::ClientProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(PurchaseItems::UnitCost)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseItems::TotalCost)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Expenses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Expenses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Expenses::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Expenses::PurchaseId).uuid().null())
                        .col(ColumnDef::new(Expenses::Description).string().not_null())
                        .col(ColumnDef::new(Expenses::Amount).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Expenses::BankAccountId).uuid().null())
                        .col(
                            ColumnDef::new(Expenses::PaidAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_expenses_purchase_id")
                        .table(Expenses::Table)
                        .col(Expenses::PurchaseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Expenses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Purchases::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Purchases {
        Table,
        Id,
        CustomerId,
        SupplierId,
        InvoiceNumber,
        OrderId,
        Total,
        Status,
        BankAccountId,
        PurchasedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseItems {
        Table,
        Id,
        PurchaseId,
        ClientProductId,
        Quantity,
        UnitCost,
        TotalCost,
    }

    #[derive(DeriveIden)]
    enum Expenses {
        Table,
        Id,
        CustomerId,
        PurchaseId,
        Description,
        Amount,
        BankAccountId,
        PaidAt,
    }
}

mod m20240301_000008_create_engagement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000008_create_engagement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PointTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PointTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PointTransactions::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(PointTransactions::OrderId).uuid().null())
                        .col(ColumnDef::new(PointTransactions::Kind).string_len(32).not_null())
                        .col(
                            ColumnDef::new(PointTransactions::Points)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PointTransactions::Description)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PointTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_point_transactions_order_kind")
                        .table(PointTransactions::Table)
                        .col(PointTransactions::OrderId)
                        .col(PointTransactions::Kind)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::RecipientType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::RecipientId).uuid().not_null())
                        .col(ColumnDef::new(Notifications::Category).string_len(32).not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(
                            ColumnDef::new(Notifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_recipient")
                        .table(Notifications::Table)
                        .col(Notifications::RecipientType)
                        .col(Notifications::RecipientId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PointTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PointTransactions {
        Table,
        Id,
        CustomerId,
        OrderId,
        Kind,
        Points,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        RecipientType,
        RecipientId,
        Category,
        Title,
        Message,
        IsRead,
        CreatedAt,
    }
}
