mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::Value;
use shortcode_service::application::services::CreateLink;
use shortcode_service::domain::caller::Caller;

#[tokio::test]
async fn test_redirect_success() {
    let app = common::create_test_app();
    let link = app
        .service
        .create(&Caller::Guest, CreateLink::new("https://example.com/target"))
        .await
        .unwrap();
    let server = common::create_test_server(&app);

    let response = server.get(&format!("/links/{}", link.code)).await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.header("location").to_str().unwrap(),
        "https://example.com/target"
    );

    let stats = app.service.stats(&link.code).await.unwrap();
    assert_eq!(stats.use_count, 1);
}

#[tokio::test]
async fn test_redirect_not_found() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    let response = server.get("/links/nonexistent").await;

    response.assert_status_not_found();
    let json = response.json::<Value>();
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_redirect_expired_link_is_gone_once() {
    let app = common::create_test_app();
    let link = app
        .service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com/old").expiring_at(Utc::now() - Duration::hours(1)),
        )
        .await
        .unwrap();
    let server = common::create_test_server(&app);

    let response = server.get(&format!("/links/{}", link.code)).await;
    response.assert_status(StatusCode::GONE);
    assert_eq!(response.json::<Value>()["error"]["code"], "expired");

    // The dead link was purged by the first request.
    server
        .get(&format!("/links/{}", link.code))
        .await
        .assert_status_not_found();
    assert!(app.repository.is_empty().await);
}

#[tokio::test]
async fn test_redirect_ignores_caller() {
    let app = common::create_test_app();
    let link = app
        .service
        .create(&Caller::Guest, CreateLink::new("https://example.com"))
        .await
        .unwrap();
    let server = common::create_test_server(&app);

    server
        .get(&format!("/links/{}", link.code))
        .add_header("Authorization", common::BEARER)
        .await
        .assert_status(StatusCode::TEMPORARY_REDIRECT);
}
