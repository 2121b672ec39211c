mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uniflow_api::entities::goods_receipt::GrnStatus;
use uniflow_api::entities::order::{OrderStatus, PrStatus};
use uniflow_api::entities::purchase_order::PurchaseOrderStatus;
use uniflow_api::errors::ServiceError;
use uuid::Uuid;

/// Bypass-policy company with one split sub-order and its issued PO.
async fn seed_open_po(app: &TestApp) -> (Uuid, Uuid) {
    let company_id = Uuid::new_v4();
    let location_id = Uuid::new_v4();
    app.seed_policy(company_id, false, false, false).await;

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

    let po = app
        .services
        .procurement
        .get_purchase_order_for_order(sub_id)
        .await
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Open);
    (sub_id, po.id)
}

#[tokio::test]
async fn acknowledging_a_receipt_closes_the_po_and_fulfills_the_order() {
    let app = TestApp::new().await;
    let (order_id, po_id) = seed_open_po(&app).await;
    let vendor_user = Uuid::new_v4();

    let grn = app
        .services
        .procurement
        .acknowledge_receipt(po_id, vendor_user)
        .await
        .unwrap();
    assert_eq!(grn.status, GrnStatus::Approved);
    assert_eq!(grn.acknowledged_by, vendor_user);
    assert_eq!(grn.purchase_order_id, po_id);

    let po = app
        .services
        .procurement
        .get_purchase_order(po_id)
        .await
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Completed);

    let order = app.get_order(order_id).await;
    assert_eq!(order.status, OrderStatus::Fulfilled);
    assert_eq!(order.pr_status, PrStatus::Fulfilled);
}

#[tokio::test]
async fn double_acknowledgement_is_idempotent() {
    let app = TestApp::new().await;
    let (_, po_id) = seed_open_po(&app).await;
    let vendor_user = Uuid::new_v4();

    let first = app
        .services
        .procurement
        .acknowledge_receipt(po_id, vendor_user)
        .await
        .unwrap();

    // Second call, even from a different user, returns the same receipt.
    let second = app
        .services
        .procurement
        .acknowledge_receipt(po_id, Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.acknowledged_by, vendor_user);

    let stored = app
        .services
        .procurement
        .get_goods_receipt(po_id)
        .await
        .unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.status, GrnStatus::Approved);
}

#[tokio::test]
async fn schema_rejects_a_second_goods_receipt_for_the_same_purchase_order() {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set, SqlErr};
    use uniflow_api::entities::goods_receipt;

    let app = TestApp::new().await;
    let (_, po_id) = seed_open_po(&app).await;

    let receipt = |user: Uuid| goods_receipt::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(po_id),
        status: Set(GrnStatus::Approved),
        acknowledged_by: Set(user),
        acknowledged_at: Set(Utc::now()),
    };

    receipt(Uuid::new_v4()).insert(&*app.db).await.unwrap();

    // Even a writer that bypasses the command's existence check cannot
    // produce a second receipt row.
    let err = receipt(Uuid::new_v4()).insert(&*app.db).await.unwrap_err();
    assert!(matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn acknowledging_an_unknown_purchase_order_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .services
        .procurement
        .acknowledge_receipt(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app
        .services
        .procurement
        .get_goods_receipt(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
