mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, decimal, location};
use meu_cupcake::domain::order::OrderStatus;
use meu_cupcake::domain::payment::GatewayStatus;
use rust_decimal_macros::dec;
use serde_json::json;

fn card_payment(amount: f64) -> serde_json::Value {
    json!({
        "token": "card-token-123",
        "issuer_id": "24",
        "payment_method_id": "visa",
        "transaction_amount": amount,
        "installments": 2,
        "description": "Cupcakes",
        "payer": {
            "email": "ana@example.com",
            "identification": { "type": "CPF", "number": "12345678909" }
        }
    })
}

fn pix_payment(amount: f64) -> serde_json::Value {
    json!({
        "transaction_amount": amount,
        "payer": { "email": "ana@example.com" }
    })
}

#[tokio::test]
async fn test_checkout_page_guards_the_cart() {
    let app = TestApp::new().await;
    let coco = app.product("Coco", dec!(6.00)).await;
    let mut browser = app.customer("ana@example.com").await;

    let response = browser.get("/cliente/checkout").await;
    assert_eq!(location(&response), "/carrinho");

    browser.post(&format!("/carrinho/adicionar/{}", coco.id)).await;
    let page = browser.page("/cliente/checkout").await;
    assert_eq!(page["public_key"], "TEST-public-key");
    assert_eq!(page["payer_email"], "ana@example.com");
    assert_eq!(decimal(&page["total"]), dec!(6.00));

    app.state.shop.delete_product(coco.id).await.unwrap();
    let response = browser.get("/cliente/checkout").await;
    assert_eq!(location(&response), "/carrinho");
    let cart = browser.page("/carrinho").await;
    assert_eq!(
        cart["flashes"][0]["message"],
        "Alguns itens no seu carrinho não estão mais disponíveis. Verifique seu carrinho."
    );
}

#[tokio::test]
async fn test_card_payment_approved_clears_cart() {
    let app = TestApp::new().await;
    let morango = app.product("Morango", dec!(8.00)).await;
    let mut browser = app.customer("ana@example.com").await;
    browser.post(&format!("/carrinho/adicionar/{}", morango.id)).await;
    browser.post(&format!("/carrinho/adicionar/{}", morango.id)).await;

    let response = browser
        .post_json("/cliente/processar-pagamento", &card_payment(16.0))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["message"], "Pagamento aprovado!");
    assert!(body["paymentId"].is_i64());

    let cart = browser.page("/carrinho").await;
    assert_eq!(cart["cart_item_count"], 0);

    let orders = browser.page("/cliente/pedidos").await;
    let orders = orders["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "pago");
    assert_eq!(orders[0]["installments"], 2);
    assert_eq!(orders[0]["items"][0]["quantity"], 2);
    assert_eq!(decimal(&orders[0]["total"]), dec!(16.00));

    let requests = app.gateway.requests().await;
    assert_eq!(requests.len(), 1);
    let (request, idempotency_key) = &requests[0];
    assert_eq!(request.transaction_amount, dec!(16.00));
    assert_eq!(&request.external_reference, idempotency_key);
}

#[tokio::test]
async fn test_rejected_card_keeps_cart() {
    let app = TestApp::new().await;
    let morango = app.product("Morango", dec!(8.00)).await;
    let mut browser = app.customer("ana@example.com").await;
    browser.post(&format!("/carrinho/adicionar/{}", morango.id)).await;

    app.gateway
        .script_next(GatewayStatus::Rejected, Some("cc_rejected_insufficient_amount"))
        .await;
    let body = body_json(
        browser
            .post_json("/cliente/processar-pagamento", &card_payment(8.0))
            .await,
    )
    .await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(
        body["message"],
        "Pagamento não aprovado (cc_rejected_insufficient_amount)."
    );

    let cart = browser.page("/carrinho").await;
    assert_eq!(cart["cart_item_count"], 1);
    let orders = browser.page("/cliente/pedidos").await;
    assert_eq!(orders["orders"][0]["status"], "falhou");
}

#[tokio::test]
async fn test_tampered_total_is_refused_without_an_order() {
    let app = TestApp::new().await;
    let morango = app.product("Morango", dec!(8.00)).await;
    let mut browser = app.customer("ana@example.com").await;
    browser.post(&format!("/carrinho/adicionar/{}", morango.id)).await;

    let response = browser
        .post_json("/cliente/processar-pagamento", &card_payment(1.0))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "O valor total do pedido foi modificado."
    );

    let orders = browser.page("/cliente/pedidos").await;
    assert!(orders["orders"].as_array().unwrap().is_empty());
    assert!(app.gateway.requests().await.is_empty());
}

#[tokio::test]
async fn test_empty_cart_cannot_be_paid() {
    let app = TestApp::new().await;
    let mut browser = app.customer("ana@example.com").await;

    let response = browser
        .post_json("/cliente/processar-pagamento-pix", &pix_payment(10.0))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Carrinho vazio ou inválido.");
}

#[tokio::test]
async fn test_pix_charge_and_payment_page() {
    let app = TestApp::new().await;
    let chocolate = app.product("Chocolate", dec!(9.50)).await;
    let mut browser = app.customer("ana@example.com").await;
    browser
        .post(&format!("/carrinho/adicionar/{}", chocolate.id))
        .await;

    let response = browser
        .post_json("/cliente/processar-pagamento-pix", &pix_payment(9.5))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    let payment_id = body["payment_id"].as_i64().unwrap();
    assert!(body["qr_code"].as_str().unwrap().starts_with("00020126"));
    assert!(!body["qr_code_base64"].as_str().unwrap().is_empty());

    let cart = browser.page("/carrinho").await;
    assert_eq!(cart["cart_item_count"], 0);

    let orders = browser.page("/cliente/pedidos").await;
    let order = &orders["orders"][0];
    assert_eq!(order["status"], "pendente");
    assert_eq!(order["payment_method"], "pix");
    let order_id = order["id"].as_u64().unwrap();

    let page = browser
        .page(&format!("/cliente/pedido/pagamento/{order_id}"))
        .await;
    assert_eq!(page["qr_code"], body["qr_code"]);
    assert_eq!(decimal(&page["total"]), dec!(9.50));

    app.gateway
        .set_status(payment_id, GatewayStatus::Approved)
        .await;
    let response = browser
        .get(&format!("/cliente/pedido/pagamento/{order_id}"))
        .await;
    assert_eq!(location(&response), "/cliente/pedidos");

    let orders = browser.page("/cliente/pedidos").await;
    assert_eq!(
        orders["flashes"][0]["message"],
        "O status deste pagamento mudou. Verifique seu histórico."
    );
    assert_eq!(orders["orders"][0]["status"], OrderStatus::Paid.as_str());

    // Settled orders no longer have a payment page.
    let response = browser
        .get(&format!("/cliente/pedido/pagamento/{order_id}"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pix_page_is_private_to_the_owner() {
    let app = TestApp::new().await;
    let chocolate = app.product("Chocolate", dec!(9.50)).await;
    let mut ana = app.customer("ana@example.com").await;
    ana.post(&format!("/carrinho/adicionar/{}", chocolate.id)).await;
    ana.post_json("/cliente/processar-pagamento-pix", &pix_payment(9.5))
        .await;
    let orders = ana.page("/cliente/pedidos").await;
    let order_id = orders["orders"][0]["id"].as_u64().unwrap();

    let mut bia = app.customer("bia@example.com").await;
    let response = bia
        .get(&format!("/cliente/pedido/pagamento/{order_id}"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = bia.get("/cliente/pedido/pagamento/xyz").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pix_gateway_failure_marks_order_failed() {
    let app = TestApp::new().await;
    let chocolate = app.product("Chocolate", dec!(9.50)).await;
    let mut browser = app.customer("ana@example.com").await;
    browser
        .post(&format!("/carrinho/adicionar/{}", chocolate.id))
        .await;

    app.gateway.fail_next().await;
    let response = browser
        .post_json("/cliente/processar-pagamento-pix", &pix_payment(9.5))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"],
        "Erro ao gerar PIX com o provedor."
    );

    let orders = browser.page("/cliente/pedidos").await;
    assert_eq!(orders["orders"][0]["status"], "falhou");
    let cart = browser.page("/carrinho").await;
    assert_eq!(cart["cart_item_count"], 1);
}
