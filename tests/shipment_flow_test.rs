mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uniflow_api::entities::shipment::{ShipmentMode, ShipmentStatus};
use uniflow_api::errors::ServiceError;
use uniflow_api::identity::{Approver, ApproverRole};
use uniflow_api::providers::ServiceabilityRequest;
use uuid::Uuid;

struct Fulfillment {
    app: TestApp,
    company_id: Uuid,
    sub_order_id: Uuid,
}

/// A fully approved (bypass policy) fulfillment unit with a Mock provider
/// configured for its company.
async fn seed_fulfillment() -> Fulfillment {
    let app = TestApp::new().await;
    let company_id = Uuid::new_v4();
    let location_id = Uuid::new_v4();
    app.seed_policy(company_id, false, false, false).await;
    app.seed_mock_provider(company_id).await;

    let vendor = app.seed_vendor(company_id, "Stitchworks").await;
    let shirt = app
        .seed_product(company_id, Some(vendor), "SHIRT-01", dec!(450.00))
        .await;
    let employee_id = app.seed_employee(company_id, location_id).await;
    let parent_id = app
        .seed_parent_order(company_id, location_id, employee_id, &[(shirt, 2, dec!(450.00))])
        .await;
    let sub_ids = app.services.order.split_order(parent_id).await.unwrap();

    Fulfillment {
        app,
        company_id,
        sub_order_id: sub_ids[0],
    }
}

#[tokio::test]
async fn create_and_reconcile_keep_one_canonical_tracking_number() {
    let f = seed_fulfillment().await;

    let shipment = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Created);
    assert_eq!(shipment.shipment_mode, ShipmentMode::Api);
    let awb = shipment.tracking_number.clone().expect("mock assigns AWB at create");

    let snapshot = f
        .app
        .services
        .shipments
        .reconcile_tracking(shipment.id)
        .await
        .unwrap();
    // Reconciliation reports the same number the carrier assigned at create.
    assert_eq!(snapshot.tracking_number.as_deref(), Some(awb.as_str()));
    assert_eq!(snapshot.status, ShipmentStatus::PickedUp);

    let stored = f
        .app
        .services
        .shipments
        .get_shipment(shipment.id)
        .await
        .unwrap();
    assert_eq!(stored.tracking_number.as_deref(), Some(awb.as_str()));
    assert_eq!(stored.status, ShipmentStatus::PickedUp);
}

#[tokio::test]
async fn delayed_awb_is_filled_in_by_reconciliation() {
    let f = seed_fulfillment().await;
    f.app.mock.set_delay_awb(true);

    let shipment = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Created);
    assert!(shipment.tracking_number.is_none(), "AWB not yet assigned");

    let snapshot = f
        .app
        .services
        .shipments
        .reconcile_tracking(shipment.id)
        .await
        .unwrap();
    assert!(snapshot.tracking_number.is_some());

    let stored = f
        .app
        .services
        .shipments
        .get_shipment(shipment.id)
        .await
        .unwrap();
    assert_eq!(stored.tracking_number, snapshot.tracking_number);
}

#[tokio::test]
async fn carrier_failure_is_persisted_and_a_retry_creates_a_second_record() {
    let f = seed_fulfillment().await;
    f.app.mock.set_fail_create(true);

    let failed = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .expect("carrier failure still returns the persisted record");
    assert_eq!(failed.status, ShipmentStatus::Failed);
    assert!(failed
        .failure_reason
        .as_deref()
        .is_some_and(|r| r.contains("scripted create failure")));
    assert!(failed.tracking_number.is_none());

    // An explicit second attempt is allowed and produces a fresh record.
    f.app.mock.set_fail_create(false);
    let second = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .unwrap();
    assert_eq!(second.status, ShipmentStatus::Created);
    assert_ne!(second.id, failed.id);

    let all = f
        .app
        .services
        .shipments
        .list_shipments_for_order(f.sub_order_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn manual_shipments_never_reconcile() {
    let f = seed_fulfillment().await;

    let err = f
        .app
        .services
        .shipments
        .create_manual_shipment(f.sub_order_id, "  ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let manual = f
        .app
        .services
        .shipments
        .create_manual_shipment(f.sub_order_id, "SLIP-4471".into())
        .await
        .unwrap();
    assert_eq!(manual.shipment_mode, ShipmentMode::Manual);
    assert_eq!(manual.tracking_number.as_deref(), Some("SLIP-4471"));

    let err = f
        .app
        .services
        .shipments
        .reconcile_tracking(manual.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StateConflict(_)));
}

#[tokio::test]
async fn status_never_regresses_and_terminal_shipments_stop_reconciling() {
    let f = seed_fulfillment().await;

    let shipment = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .unwrap();

    // Polls advance PickedUp -> InTransit -> Delivered.
    let mut last_rank = ShipmentStatus::Created.rank();
    for _ in 0..3 {
        let snapshot = f
            .app
            .services
            .shipments
            .reconcile_tracking(shipment.id)
            .await
            .unwrap();
        assert!(snapshot.status.rank() >= last_rank);
        last_rank = snapshot.status.rank();
    }
    assert_eq!(last_rank, ShipmentStatus::Delivered.rank());

    let err = f
        .app
        .services
        .shipments
        .reconcile_tracking(shipment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StateConflict(_)));
}

#[tokio::test]
async fn overlapping_reconciles_cannot_write_back_a_stale_status() {
    let f = seed_fulfillment().await;

    let shipment = f
        .app
        .services
        .shipments
        .create_shipment(f.sub_order_id, None)
        .await
        .unwrap();

    // Two reconciles race: each reads the same stored status, but the
    // carrier answers them with different polls. Whichever commits
    // second holds a stale view and must not clobber the fresher row.
    let (a, b) = tokio::join!(
        f.app.services.shipments.reconcile_tracking(shipment.id),
        f.app.services.shipments.reconcile_tracking(shipment.id),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert!(a.status.rank() >= ShipmentStatus::PickedUp.rank());
    assert!(b.status.rank() >= ShipmentStatus::PickedUp.rank());

    let stored = f
        .app
        .services
        .shipments
        .get_shipment(shipment.id)
        .await
        .unwrap();
    assert!(stored.status.rank() >= ShipmentStatus::PickedUp.rank());
    assert!(stored.status.rank() <= ShipmentStatus::InTransit.rank());

    // The pipeline keeps moving after the contention.
    let mut last_rank = stored.status.rank();
    loop {
        let snapshot = f
            .app
            .services
            .shipments
            .reconcile_tracking(shipment.id)
            .await
            .unwrap();
        assert!(snapshot.status.rank() >= last_rank);
        last_rank = snapshot.status.rank();
        if snapshot.status == ShipmentStatus::Delivered {
            break;
        }
    }
}

#[tokio::test]
async fn shipment_creation_requires_an_approved_unit_and_a_provider() {
    let app = TestApp::new().await;
    let company_id = Uuid::new_v4();
    let location_id = Uuid::new_v4();
    // Approval required, so the sub-order is not yet fulfillable.
    app.seed_policy(company_id, true, false, true).await;
    app.seed_mock_provider(company_id).await;

    let vendor = app.seed_vendor(company_id, "Stitchworks").await;
    let shirt = app
        .seed_product(company_id, Some(vendor), "SHIRT-01", dec!(450.00))
        .await;
    let employee_id = app.seed_employee(company_id, location_id).await;
    let parent_id = app
        .seed_parent_order(company_id, location_id, employee_id, &[(shirt, 1, dec!(450.00))])
        .await;
    let sub_ids = app.services.order.split_order(parent_id).await.unwrap();
    let sub_id = sub_ids[0];

    let err = app
        .services
        .shipments
        .create_shipment(sub_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StateConflict(_)));

    // A rejected unit stays unshippable forever.
    let admin = Approver {
        id: Uuid::new_v4(),
        role: ApproverRole::CompanyAdmin,
        company_id: Some(company_id),
    };
    app.services
        .order
        .reject(sub_id, admin, "budget withdrawn".into())
        .await
        .unwrap();
    let err = app
        .services
        .shipments
        .create_shipment(sub_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StateConflict(_)));

    assert!(app
        .services
        .shipments
        .list_shipments_for_order(sub_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn missing_provider_configuration_is_its_own_error() {
    let f = seed_fulfillment().await;

    // A company with no provider rows at all.
    let bare_company = Uuid::new_v4();
    let err = f
        .app
        .services
        .shipments
        .check_serviceability(
            bare_company,
            None,
            ServiceabilityRequest {
                origin_pincode: "411001".into(),
                dest_pincode: "400001".into(),
                weight_kg: 0.6,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NoShippingProvider(_)));

    // The configured company resolves and quotes normally.
    let quote = f
        .app
        .services
        .shipments
        .check_serviceability(
            f.company_id,
            None,
            ServiceabilityRequest {
                origin_pincode: "411001".into(),
                dest_pincode: "400001".into(),
                weight_kg: 0.6,
            },
        )
        .await
        .unwrap();
    assert!(quote.serviceable);
    assert!(!quote.couriers.is_empty());

    let health = f
        .app
        .services
        .shipments
        .provider_health(f.company_id, None)
        .await
        .unwrap();
    assert!(health.healthy);
}
