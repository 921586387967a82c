//! Cart mutations, fragments and persistence.

use ayts_integration_tests::{TestApp, badge_count};
use reqwest::StatusCode;

#[tokio::test]
async fn test_add_returns_badge_and_trigger() {
    let app = TestApp::spawn().await;

    let response = app.htmx_post("/cart/add", &[("product_id", "p1")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");
    assert_eq!(badge_count(&response.text().await.unwrap()), 1);
}

#[tokio::test]
async fn test_quantity_adds_repeatedly() {
    let app = TestApp::spawn().await;
    app.select_location().await;

    assert_eq!(app.add_to_cart("p1", 1).await, 1);
    assert_eq!(app.add_to_cart("p1", 2).await, 3);

    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Fresh Mart"));
    assert!(body.contains("₱135.00"));
}

#[tokio::test]
async fn test_update_and_remove() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 2).await;

    let response = app
        .htmx_post(
            "/cart/update",
            &[
                ("product_id", "p1"),
                ("store_id", "s1"),
                ("delta", "-1"),
                ("fragment", "controls"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("qty-controls"));
    assert!(body.contains("<span class=\"qty\">1</span>"));

    app.htmx_post(
        "/cart/update",
        &[("product_id", "p1"), ("store_id", "s1"), ("delta", "-1")],
    )
    .await;
    assert_eq!(app.cart_count().await, 0);

    app.add_to_cart("p2", 1).await;
    let response = app
        .htmx_post("/cart/remove", &[("product_id", "p2"), ("fragment", "cart")])
        .await;
    assert!(response.text().await.unwrap().contains("Your cart is empty"));
}

#[tokio::test]
async fn test_update_requires_store() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;

    let response = app
        .htmx_post(
            "/cart/update",
            &[("product_id", "p1"), ("store_id", " "), ("delta", "1")],
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.cart_count().await, 1);
}

#[tokio::test]
async fn test_add_unknown_product() {
    let app = TestApp::spawn().await;

    let response = app.htmx_post("/cart/add", &[("product_id", "nope")]).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.cart_count().await, 0);
}

#[tokio::test]
async fn test_plain_form_post_redirects_to_cart() {
    let app = TestApp::spawn().await;

    let response = app.post("/cart/add", &[("product_id", "p1")]).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/cart");
    assert_eq!(app.cart_count().await, 1);
}

#[tokio::test]
async fn test_clear() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.add_to_cart("p3", 1).await;

    app.htmx_post("/cart/clear", &[]).await;

    assert_eq!(app.cart_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_adds_are_not_lost() {
    let app = TestApp::spawn().await;
    // Creates the visitor and its cookie.
    assert_eq!(app.cart_count().await, 0);

    let mut adds = tokio::task::JoinSet::new();
    for _ in 0..10 {
        let client = app.client.clone();
        let url = app.url("/cart/add");
        adds.spawn(async move {
            client
                .post(url)
                .header("HX-Request", "true")
                .form(&[("product_id", "p1")])
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    while let Some(status) = adds.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    assert_eq!(app.cart_count().await, 10);
}

#[tokio::test]
async fn test_cart_and_location_survive_restart() {
    let app = TestApp::spawn().await;
    app.select_location().await;
    app.add_to_cart("p1", 3).await;

    let app = app.restart().await;

    assert_eq!(app.cart_count().await, 3);
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
