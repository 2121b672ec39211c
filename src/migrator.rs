use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_orders_tables::Migration),
            Box::new(m20240101_000002_create_procurement_tables::Migration),
            Box::new(m20240101_000003_create_shipment_tables::Migration),
            Box::new(m20240101_000004_create_catalog_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_orders_tables"
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
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::EmployeeId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Orders::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ParentOrderId).uuid().null())
                        .col(ColumnDef::new(Orders::VendorId).uuid().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::PrStatus).string().not_null())
                        .col(ColumnDef::new(Orders::PrNumber).string().null())
                        .col(ColumnDef::new(Orders::PrDate).timestamp().null())
                        .col(ColumnDef::new(Orders::RejectionReason).string().null())
                        .col(
                            ColumnDef::new(Orders::RequiresSiteAdminApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::RequiresCompanyAdminApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_pr_status_location")
                        .table(Orders::Table)
                        .col(Orders::PrStatus)
                        .col(Orders::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_parent")
                        .table(Orders::Table)
                        .col(Orders::ParentOrderId)
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
                        .col(ColumnDef::new(OrderItems::Size).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::LineTotal).decimal().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order")
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
        EmployeeId,
        CompanyId,
        LocationId,
        ParentOrderId,
        VendorId,
        Status,
        PrStatus,
        PrNumber,
        PrDate,
        RejectionReason,
        RequiresSiteAdminApproval,
        RequiresCompanyAdminApproval,
        TotalAmount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Size,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20240101_000002_create_procurement_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_procurement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ApprovalPolicies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ApprovalPolicies::CompanyId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalPolicies::PrEnabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ApprovalPolicies::SiteAdminApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ApprovalPolicies::CompanyAdminApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ApprovalPolicies::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::PoNumber).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::VendorId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::IssuedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_purchase_orders_order")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GoodsReceipts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GoodsReceipts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::Status).string().not_null())
                        .col(
                            ColumnDef::new(GoodsReceipts::AcknowledgedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::AcknowledgedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_goods_receipts_po")
                        .table(GoodsReceipts::Table)
                        .col(GoodsReceipts::PurchaseOrderId)
                        // One GRN per purchase order; concurrent
                        // acknowledgements cannot double-insert.
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GoodsReceipts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ApprovalPolicies::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ApprovalPolicies {
        Table,
        CompanyId,
        PrEnabled,
        SiteAdminApproval,
        CompanyAdminApproval,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        OrderId,
        VendorId,
        CompanyId,
        Status,
        IssuedAt,
    }

    #[derive(DeriveIden)]
    enum GoodsReceipts {
        Table,
        Id,
        PurchaseOrderId,
        Status,
        AcknowledgedBy,
        AcknowledgedAt,
    }
}

mod m20240101_000003_create_shipment_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_shipment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::PrNumber).string().null())
                        .col(ColumnDef::new(Shipments::ShipmentMode).string().not_null())
                        .col(ColumnDef::new(Shipments::ProviderId).uuid().null())
                        .col(
                            ColumnDef::new(Shipments::ProviderReference)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::TrackingNumber).string().null())
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(ColumnDef::new(Shipments::FailureReason).string().null())
                        // Legacy AWB columns, load-time fallback only.
                        .col(ColumnDef::new(Shipments::CourierAwb).string().null())
                        .col(ColumnDef::new(Shipments::AwbNumber).string().null())
                        .col(ColumnDef::new(Shipments::ShipmentNumber).string().null())
                        .col(ColumnDef::new(Shipments::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Shipments::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_shipments_order")
                        .table(Shipments::Table)
                        .col(Shipments::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProviderCredentials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProviderCredentials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::CompanyId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::Provider)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::SealedPayload)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::Enabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProviderCredentials::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProviderCredentials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        OrderId,
        PrNumber,
        ShipmentMode,
        ProviderId,
        ProviderReference,
        TrackingNumber,
        Status,
        FailureReason,
        CourierAwb,
        AwbNumber,
        ShipmentNumber,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProviderCredentials {
        Table,
        Id,
        CompanyId,
        Provider,
        SealedPayload,
        Enabled,
        IsDefault,
        UpdatedAt,
    }
}

mod m20240101_000004_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_catalog_tables"
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
                        .col(ColumnDef::new(Products::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Products::VendorId).uuid().null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::CurrentPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Vendors::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vendors::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vendors::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Vendors::Name).string().not_null())
                        .col(ColumnDef::new(Vendors::PickupAddress).string().not_null())
                        .col(ColumnDef::new(Vendors::PickupCity).string().not_null())
                        .col(ColumnDef::new(Vendors::PickupState).string().not_null())
                        .col(ColumnDef::new(Vendors::PickupPincode).string().not_null())
                        .col(ColumnDef::new(Vendors::ContactPhone).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Employees::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Employees::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Employees::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Employees::Name).string().not_null())
                        .col(
                            ColumnDef::new(Employees::ShippingAddress)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Employees::City).string().not_null())
                        .col(ColumnDef::new(Employees::State).string().not_null())
                        .col(ColumnDef::new(Employees::Pincode).string().not_null())
                        .col(ColumnDef::new(Employees::Phone).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SiteAdminLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SiteAdminLocations::AdminId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SiteAdminLocations::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(SiteAdminLocations::AdminId)
                                .col(SiteAdminLocations::LocationId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SiteAdminLocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vendors::Table).to_owned())
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
        CompanyId,
        VendorId,
        Sku,
        Name,
        CurrentPrice,
    }

    #[derive(DeriveIden)]
    enum Vendors {
        Table,
        Id,
        CompanyId,
        Name,
        PickupAddress,
        PickupCity,
        PickupState,
        PickupPincode,
        ContactPhone,
    }

    #[derive(DeriveIden)]
    enum Employees {
        Table,
        Id,
        CompanyId,
        LocationId,
        Name,
        ShippingAddress,
        City,
        State,
        Pincode,
        Phone,
    }

    #[derive(DeriveIden)]
    enum SiteAdminLocations {
        Table,
        AdminId,
        LocationId,
    }
}
