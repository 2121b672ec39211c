#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uniflow_api::{
    config::AppConfig,
    db::{self, DbPool},
    entities::approval_policy,
    entities::employee,
    entities::order::{self, OrderStatus, PrStatus},
    entities::order_item,
    entities::product,
    entities::provider_credential::{self, ProviderKind},
    entities::site_admin_location,
    entities::vendor,
    events::{self, EventSender},
    handlers::AppServices,
    providers::credentials::ProviderCredentialBundle,
    providers::mock::MockProvider,
    providers::registry::ProviderRegistry,
    services::orders::OrderService,
    services::procurement::ProcurementService,
    services::shipments::ShipmentService,
};
use uuid::Uuid;

const TEST_CREDENTIAL_KEY: &str = "test-credential-sealing-key-0123456789ab";

/// Helper harness: application services over a fresh file-backed SQLite
/// database, with a scriptable mock shipping provider installed.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub event_sender: Arc<EventSender>,
    pub mock: Arc<MockProvider>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("uniflow_test_{}.db", Uuid::new_v4()));
        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_CREDENTIAL_KEY.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = Arc::new(
            db::establish_connection_from_app_config(&cfg)
                .await
                .expect("failed to create test database"),
        );
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let (event_sender, event_rx) = events::channel(256);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let registry = Arc::new(ProviderRegistry::new(
            pool.clone(),
            TEST_CREDENTIAL_KEY,
            std::time::Duration::from_secs(5),
        ));
        let mock = Arc::new(MockProvider::new());
        registry.install_mock(mock.clone());

        let services = AppServices {
            order: Arc::new(OrderService::new(pool.clone(), event_sender.clone())),
            shipments: Arc::new(ShipmentService::new(
                pool.clone(),
                event_sender.clone(),
                registry.clone(),
            )),
            procurement: Arc::new(ProcurementService::new(pool.clone(), event_sender.clone())),
        };

        Self {
            db: pool,
            services,
            event_sender,
            mock,
            _event_task: event_task,
        }
    }

    pub async fn seed_policy(
        &self,
        company_id: Uuid,
        pr_enabled: bool,
        site_admin: bool,
        company_admin: bool,
    ) {
        approval_policy::ActiveModel {
            company_id: Set(company_id),
            pr_enabled: Set(pr_enabled),
            site_admin_approval: Set(site_admin),
            company_admin_approval: Set(company_admin),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed approval policy");
    }

    pub async fn seed_vendor(&self, company_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        vendor::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            name: Set(name.to_string()),
            pickup_address: Set("12 Industrial Estate".to_string()),
            pickup_city: Set("Pune".to_string()),
            pickup_state: Set("MH".to_string()),
            pickup_pincode: Set("411001".to_string()),
            contact_phone: Set("9800000000".to_string()),
        }
        .insert(&*self.db)
        .await
        .expect("seed vendor");
        id
    }

    pub async fn seed_product(
        &self,
        company_id: Uuid,
        vendor_id: Option<Uuid>,
        sku: &str,
        price: Decimal,
    ) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            vendor_id: Set(vendor_id),
            sku: Set(sku.to_string()),
            name: Set(format!("Uniform {sku}")),
            current_price: Set(price),
        }
        .insert(&*self.db)
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_employee(&self, company_id: Uuid, location_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        employee::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            location_id: Set(location_id),
            name: Set("Asha Verma".to_string()),
            shipping_address: Set("Flat 4, Rose Apartments".to_string()),
            city: Set("Mumbai".to_string()),
            state: Set("MH".to_string()),
            pincode: Set("400001".to_string()),
            phone: Set("9811111111".to_string()),
        }
        .insert(&*self.db)
        .await
        .expect("seed employee");
        id
    }

    pub async fn seed_site_admin_location(&self, admin_id: Uuid, location_id: Uuid) {
        site_admin_location::ActiveModel {
            admin_id: Set(admin_id),
            location_id: Set(location_id),
        }
        .insert(&*self.db)
        .await
        .expect("seed site admin location");
    }

    /// A submitted cart order with one line per (product, quantity) pair.
    pub async fn seed_parent_order(
        &self,
        company_id: Uuid,
        location_id: Uuid,
        employee_id: Uuid,
        lines: &[(Uuid, i32, Decimal)],
    ) -> Uuid {
        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let mut total = Decimal::ZERO;
        for (_, quantity, price) in lines {
            total += *price * Decimal::from(*quantity);
        }
        order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!("UO-{}", &order_id.simple().to_string()[..8])),
            employee_id: Set(employee_id),
            company_id: Set(company_id),
            location_id: Set(location_id),
            parent_order_id: Set(None),
            vendor_id: Set(None),
            status: Set(OrderStatus::AwaitingApproval),
            pr_status: Set(PrStatus::NotRequired),
            pr_number: Set(None),
            pr_date: Set(None),
            rejection_reason: Set(None),
            requires_site_admin_approval: Set(false),
            requires_company_admin_approval: Set(false),
            total_amount: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed parent order");

        for (product_id, quantity, price) in lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(*product_id),
                size: Set("L".to_string()),
                quantity: Set(*quantity),
                unit_price: Set(*price),
                line_total: Set(*price * Decimal::from(*quantity)),
            }
            .insert(&*self.db)
            .await
            .expect("seed order item");
        }

        order_id
    }

    /// An enabled default Mock provider credential for the company.
    pub async fn seed_mock_provider(&self, company_id: Uuid) -> Uuid {
        let sealed = self
            .services
            .shipments
            .registry()
            .cipher()
            .seal(&ProviderCredentialBundle {
                account: "test@uniflow.local".to_string(),
                api_token: "mock-token".to_string(),
                pickup_location: None,
                base_url: None,
            })
            .expect("seal credentials");

        let id = Uuid::new_v4();
        provider_credential::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            provider: Set(ProviderKind::Mock),
            sealed_payload: Set(sealed),
            enabled: Set(true),
            is_default: Set(true),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed provider credential");
        id
    }

    pub async fn get_order(&self, order_id: Uuid) -> order::Model {
        self.services
            .order
            .get_order(order_id)
            .await
            .expect("order must exist")
    }
}
