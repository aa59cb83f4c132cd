mod common;

use chrono::{Duration, Utc};
use serde_json::Value;
use shortcode_service::application::services::CreateLink;
use shortcode_service::domain::caller::Caller;

async fn create(app: &common::TestApp, request: CreateLink) -> String {
    app.service
        .create(&Caller::Guest, request)
        .await
        .unwrap()
        .code
}

async fn resolve_times(app: &common::TestApp, code: &str, times: usize) {
    for _ in 0..times {
        app.service.resolve(code).await.unwrap();
    }
}

// --- GET /links/{code}/stats -------------------------------------------------

#[tokio::test]
async fn test_stats_success() {
    let app = common::create_test_app();
    let code = create(&app, CreateLink::new("https://example.com/stats")).await;
    resolve_times(&app, &code, 2).await;
    let server = common::create_test_server(&app);

    let response = server.get(&format!("/links/{code}/stats")).await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["code"], code.as_str());
    assert_eq!(json["original_url"], "https://example.com/stats");
    assert_eq!(json["use_count"], 2);
    assert!(json["last_used_at"].is_string());
}

#[tokio::test]
async fn test_stats_unused_link() {
    let app = common::create_test_app();
    let code = create(&app, CreateLink::new("https://example.com")).await;
    let server = common::create_test_server(&app);

    let json = server
        .get(&format!("/links/{code}/stats"))
        .await
        .json::<Value>();

    assert_eq!(json["use_count"], 0);
    assert!(json["last_used_at"].is_null());
}

#[tokio::test]
async fn test_stats_not_found() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    server
        .get("/links/nonexistent/stats")
        .await
        .assert_status_not_found();
}

// --- GET /links/search -------------------------------------------------------

#[tokio::test]
async fn test_search_finds_links_by_target() {
    let app = common::create_test_app();
    let code = create(&app, CreateLink::new("https://example.com/needle")).await;
    create(&app, CreateLink::new("https://example.com/haystack")).await;
    let server = common::create_test_server(&app);

    let response = server
        .get("/links/search")
        .add_query_param("original_url", "https://example.com/needle")
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["code"], code.as_str());
}

#[tokio::test]
async fn test_search_without_match() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    let response = server
        .get("/links/search")
        .add_query_param("original_url", "https://example.com/missing")
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_search_requires_url() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    server
        .get("/links/search")
        .await
        .assert_status_bad_request();
}

// --- GET /links/expired ------------------------------------------------------

#[tokio::test]
async fn test_expired_listing_does_not_purge() {
    let app = common::create_test_app();
    let dead = create(
        &app,
        CreateLink::new("https://example.com/old").expiring_at(Utc::now() - Duration::minutes(5)),
    )
    .await;
    create(&app, CreateLink::new("https://example.com/live")).await;
    let server = common::create_test_server(&app);

    let response = server.get("/links/expired").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["code"], dead.as_str());
    assert_eq!(app.repository.len().await, 2);
}

// --- GET /links/popular ------------------------------------------------------

#[tokio::test]
async fn test_popular_ranking() {
    let app = common::create_test_app();
    let first = create(&app, CreateLink::new("https://example.com/1")).await;
    let second = create(&app, CreateLink::new("https://example.com/2")).await;
    resolve_times(&app, &first, 5).await;
    resolve_times(&app, &second, 3).await;
    let server = common::create_test_server(&app);

    let response = server
        .get("/links/popular")
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["rank"], 1);
    assert_eq!(items[0]["code"], first.as_str());
    assert_eq!(items[0]["use_count"], 5);
    assert_eq!(
        items[0]["short_url"],
        format!("{}/links/{}", common::BASE_URL, first)
    );
    assert_eq!(items[1]["rank"], 2);
    assert_eq!(items[1]["code"], second.as_str());
    assert_eq!(items[1]["use_count"], 3);
}

#[tokio::test]
async fn test_popular_empty() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    let response = server.get("/links/popular").await;

    response.assert_status_ok();
    assert!(response.json::<Value>()["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_popular_limit_out_of_range() {
    let app = common::create_test_app();
    let server = common::create_test_server(&app);

    server
        .get("/links/popular")
        .add_query_param("limit", 500)
        .await
        .assert_status_bad_request();
}
