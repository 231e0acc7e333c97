//! Order lifecycle tests: fulfilment transitions, batch operations,
//! public tracking, cancellation and the refund workflow.
//!
//! Tests cover:
//! - Admin status transitions along the fulfilment chain
//! - Batch confirm/ship/deliver counting only eligible orders
//! - Public tracking scoped to the owner when a token is attached
//! - Cancellation rules and stock restoration
//! - Refunds from request through approval to processing

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use medicart_api::entities::{order, Order, OrderStatus, PaymentStatus, Product};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn money(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
}

async fn signed_in_shopper(app: &TestApp, email: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": email,
                "password": "lifecycle-pass-1",
                "full_name": "Order Shopper",
                "phone": "9876540100",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": "lifecycle-pass-1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Place an order for `quantity` units of a fresh product and return
/// `(order_id, order_number)`.
async fn placed_order(
    app: &TestApp,
    token: &str,
    product_id: &str,
    quantity: i32,
) -> (String, String) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product_id, "quantity": quantity })),
            Some(token),
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let response = app
        .request(
            Method::POST,
            "/api/v1/me/addresses",
            Some(json!({
                "label": "home",
                "recipient_name": "Ravi Kumar",
                "phone": "9876509876",
                "line1": "4 Brigade Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pincode": "560025"
            })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let address_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order = &response_json(response).await["data"]["order"];
    (
        order["id"].as_str().unwrap().to_string(),
        order["order_number"].as_str().unwrap().to_string(),
    )
}

async fn set_status(app: &TestApp, admin_token: &str, order_id: &str, status: &str) {
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(json!({ "status": status })),
            Some(admin_token),
        )
        .await;
    assert_eq!(response.status(), 200, "transition to {status} failed");
}

/// Stamp an order as delivered and paid straight in the database, the
/// state a refund becomes possible from.
async fn mark_delivered_and_paid(app: &TestApp, order_number: &str) {
    let stored = Order::find()
        .filter(order::Column::OrderNumber.eq(order_number))
        .one(&*app.state.db)
        .await
        .expect("order lookup")
        .expect("order exists");
    let mut active: order::ActiveModel = stored.into_active_model();
    active.status = Set(OrderStatus::Delivered);
    active.payment_status = Set(PaymentStatus::Paid);
    active.update(&*app.state.db).await.expect("order update");
}

// ==================== Fulfilment Chain Tests ====================

#[tokio::test]
async fn admin_walks_an_order_down_the_fulfilment_chain() {
    let app = TestApp::new().await;
    let product = app.seed_product("Atorvastatin 10mg", dec!(160), 20).await;
    let token = signed_in_shopper(&app, "chain.walker@example.com").await;
    let (order_id, order_number) =
        placed_order(&app, &token, &product.id.to_string(), 1).await;

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    for status in [
        "confirmed",
        "processing",
        "shipped",
        "out_for_delivery",
        "delivered",
    ] {
        set_status(&app, &admin_token, &order_id, status).await;
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_number}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let detail = &body["data"];
    assert_eq!(detail["order"]["status"], "delivered");
    assert!(
        detail["order"]["actual_delivery"].as_str().is_some(),
        "delivery stamps the actual_delivery time"
    );
    // Placement plus five transitions.
    assert_eq!(detail["history"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn status_jumps_outside_the_chain_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Losartan 50mg", dec!(130), 20).await;
    let token = signed_in_shopper(&app, "jump.blocker@example.com").await;
    let (order_id, _) = placed_order(&app, &token, &product.id.to_string(), 1).await;

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(json!({ "status": "shipped" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Invalid status transition from pending to shipped"
    );
}

// ==================== Batch Operation Tests ====================

#[tokio::test]
async fn batch_operations_count_only_eligible_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("Pantoprazole 40mg", dec!(75), 50).await;
    let token = signed_in_shopper(&app, "batch.orders@example.com").await;

    let (first_id, first_number) =
        placed_order(&app, &token, &product.id.to_string(), 1).await;
    let (second_id, _) = placed_order(&app, &token, &product.id.to_string(), 2).await;

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/orders/batch/confirm",
            Some(json!({ "order_ids": [first_id, second_id] })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["updated"], 2);

    // Already confirmed, so a second pass touches nothing.
    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/orders/batch/confirm",
            Some(json!({ "order_ids": [first_id, second_id] })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["updated"], 0);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/orders/batch/ship",
            Some(json!({ "order_ids": [first_id, second_id] })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["updated"], 2);

    // Delivery only applies to orders already out for delivery.
    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/orders/batch/deliver",
            Some(json!({ "order_ids": [first_id, second_id] })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["updated"], 0);

    set_status(&app, &admin_token, &first_id, "out_for_delivery").await;
    set_status(&app, &admin_token, &second_id, "out_for_delivery").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/orders/batch/deliver",
            Some(json!({ "order_ids": [first_id, second_id] })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response_json(response).await["data"]["updated"], 2);

    let stored = Order::find_by_id(first_id.parse::<uuid::Uuid>().unwrap())
        .one(&*app.state.db)
        .await
        .expect("order lookup")
        .expect("order exists");
    assert_eq!(stored.status, OrderStatus::Delivered);
    assert!(stored.actual_delivery.is_some());
    assert!(stored.processed_by.is_some());
    assert!(stored.processed_at.is_some());

    // Placement and batch confirm write history rows, then the single
    // out-for-delivery transition adds one more. Batch ship and deliver
    // leave no trace in the history.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{first_number}"),
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    let history = body["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
}

// ==================== Tracking Tests ====================

#[tokio::test]
async fn tracking_is_public_but_scoped_when_a_token_is_attached() {
    let app = TestApp::new().await;
    let product = app.seed_product("Salbutamol Inhaler", dec!(210), 20).await;
    let owner_token = signed_in_shopper(&app, "track.owner@example.com").await;
    let (_, order_number) =
        placed_order(&app, &owner_token, &product.id.to_string(), 1).await;

    // Anonymous tracking works with just the order number.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/track/{order_number}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let tracking = &body["data"];
    assert_eq!(tracking["order_number"], order_number);
    assert_eq!(tracking["status"], "pending");
    assert!(tracking["estimated_delivery"].as_str().is_some());
    let timeline = tracking["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["status"], "pending");

    // A different account's token must not see the order at all.
    let stranger_token = signed_in_shopper(&app, "track.stranger@example.com").await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/track/{order_number}"),
            None,
            Some(&stranger_token),
        )
        .await;
    assert_eq!(response.status(), 404);

    // The owner's token still works.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/track/{order_number}"),
            None,
            Some(&owner_token),
        )
        .await;
    assert_eq!(response.status(), 200);
}

// ==================== Cancellation Tests ====================

#[tokio::test]
async fn cancelling_a_pending_order_returns_its_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Domperidone 10mg", dec!(55), 10).await;
    let token = signed_in_shopper(&app, "cancel.happy@example.com").await;
    let (_, order_number) = placed_order(&app, &token, &product.id.to_string(), 3).await;

    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    assert_eq!(stored.stock_quantity, 7, "checkout consumed three units");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "cancelled");

    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    assert_eq!(stored.stock_quantity, 10, "cancellation returned the stock");

    // A cancelled order cannot be cancelled again.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "This order cannot be cancelled"
    );
}

#[tokio::test]
async fn cancellation_closes_once_the_order_ships() {
    let app = TestApp::new().await;
    let product = app.seed_product("Montelukast 10mg", dec!(110), 10).await;
    let token = signed_in_shopper(&app, "cancel.window@example.com").await;

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    // A confirmed order is still inside the cancellation window.
    let (first_id, first_number) =
        placed_order(&app, &token, &product.id.to_string(), 2).await;
    set_status(&app, &admin_token, &first_id, "confirmed").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{first_number}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "cancelled");

    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    assert_eq!(stored.stock_quantity, 10, "confirmed cancel returned the stock");

    // Once shipped the window is closed.
    let (second_id, second_number) =
        placed_order(&app, &token, &product.id.to_string(), 1).await;
    for status in ["confirmed", "processing", "shipped"] {
        set_status(&app, &admin_token, &second_id, status).await;
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{second_number}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "This order cannot be cancelled"
    );

    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    assert_eq!(stored.stock_quantity, 9, "shipped stock stays consumed");
}

#[tokio::test]
async fn paid_orders_must_go_through_refunds_not_cancellation() {
    let app = TestApp::new().await;
    let product = app.seed_product("Insulin Glargine", dec!(850), 10).await;
    let token = signed_in_shopper(&app, "cancel.paid@example.com").await;
    let (_, order_number) = placed_order(&app, &token, &product.id.to_string(), 1).await;

    let stored = Order::find()
        .filter(order::Column::OrderNumber.eq(order_number.as_str()))
        .one(&*app.state.db)
        .await
        .expect("order lookup")
        .expect("order exists");
    let mut active: order::ActiveModel = stored.into_active_model();
    active.payment_status = Set(PaymentStatus::Paid);
    active.update(&*app.state.db).await.expect("order update");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "This order cannot be cancelled"
    );
}

// ==================== Refund Tests ====================

#[tokio::test]
async fn refund_journey_from_request_to_processed() {
    let app = TestApp::new().await;
    let product = app.seed_product("CGM Sensor", dec!(520), 10).await;
    let token = signed_in_shopper(&app, "refund.journey@example.com").await;
    let (_, order_number) = placed_order(&app, &token, &product.id.to_string(), 1).await;

    mark_delivered_and_paid(&app, &order_number).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/refund"),
            Some(json!({ "reason": "Sensor arrived with a broken seal" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    let refund = &body["data"];
    assert_eq!(refund["status"], "requested");
    assert_eq!(refund["kind"], "full");
    assert_eq!(money(&refund["amount"]), 520.0);
    let refund_id = refund["id"].as_str().unwrap().to_string();

    // Only one open refund per order.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/refund"),
            Some(json!({ "reason": "second attempt" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 409);
    assert_eq!(
        response_json(response).await["message"],
        "A refund is already in progress for this order"
    );

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/approve"),
            Some(json!({ "note": "verified with the courier" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["decision_note"], "verified with the courier");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/process"),
            Some(json!({ "reference": "RZP-REF-1042" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "processed");
    assert_eq!(body["data"]["reference"], "RZP-REF-1042");

    // A full refund flips the order's payment status.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_number}"),
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["order"]["payment_status"], "refunded");

    // The admin listing shows the processed request.
    let response = app
        .request(Method::GET, "/api/v1/admin/refunds", None, Some(&admin_token))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let listed = body["data"]["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "processed");
}

#[tokio::test]
async fn partial_refunds_keep_the_rest_of_the_payment() {
    let app = TestApp::new().await;
    let product = app.seed_product("BP Monitor", dec!(1600), 5).await;
    let token = signed_in_shopper(&app, "refund.partial@example.com").await;
    let (_, order_number) = placed_order(&app, &token, &product.id.to_string(), 1).await;

    mark_delivered_and_paid(&app, &order_number).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/refund"),
            Some(json!({ "amount": "400", "reason": "Cuff missing from the box" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    assert_eq!(body["data"]["kind"], "partial");
    assert_eq!(money(&body["data"]["amount"]), 400.0);
    let refund_id = body["data"]["id"].as_str().unwrap().to_string();

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/approve"),
            Some(json!({})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/process"),
            Some(json!({})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_number}"),
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(
        body["data"]["order"]["payment_status"],
        "partially_refunded"
    );
}

#[tokio::test]
async fn unpaid_orders_are_not_refund_eligible() {
    let app = TestApp::new().await;
    let product = app.seed_product("Nebulizer Kit", dec!(950), 5).await;
    let token = signed_in_shopper(&app, "refund.unpaid@example.com").await;
    let (order_id, order_number) =
        placed_order(&app, &token, &product.id.to_string(), 1).await;

    // Walk the COD order to delivered; payment stays pending.
    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);
    for status in [
        "confirmed",
        "processing",
        "shipped",
        "out_for_delivery",
        "delivered",
    ] {
        set_status(&app, &admin_token, &order_id, status).await;
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/refund"),
            Some(json!({ "reason": "changed my mind" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "This order is not eligible for a refund"
    );
}

#[tokio::test]
async fn rejected_refunds_cannot_be_processed() {
    let app = TestApp::new().await;
    let product = app.seed_product("Pulse Oximeter", dec!(700), 5).await;
    let token = signed_in_shopper(&app, "refund.rejected@example.com").await;
    let (_, order_number) = placed_order(&app, &token, &product.id.to_string(), 1).await;

    mark_delivered_and_paid(&app, &order_number).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_number}/refund"),
            Some(json!({ "reason": "reading looks off" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let refund_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/reject"),
            Some(json!({ "note": "device reads within tolerance" })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "rejected");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/refunds/{refund_id}/process"),
            Some(json!({})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Only approved refunds can be processed"
    );
}
