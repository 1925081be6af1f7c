//! HTTP API integration tests
//!
//! Exercises the router end to end with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::fixtures::{five_countries, mixed_countries, rates, TestApp};

async fn mixed_app() -> TestApp {
    TestApp::start(
        mixed_countries(),
        rates(&[("NGN", 1600.0), ("GHS", 15.0), ("EUR", 0.92)]),
    )
    .await
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_root_welcome() {
    let app = TestApp::start(five_countries(), rates(&[])).await;
    let (status, body) = app.send_json("GET", "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn test_status_before_refresh() {
    let app = TestApp::start(five_countries(), rates(&[])).await;
    let (status, body) = app.send_json("GET", "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_countries"], 0);
    assert!(body["last_refreshed_at"].is_null());
}

#[tokio::test]
async fn test_refresh_endpoint() {
    let app = mixed_app().await;
    let (status, body) = app.send_json("POST", "/countries/refresh").await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["message"], "Refreshed");
    assert_eq!(body["total_countries"], 5);
    assert!(body["image"].as_str().unwrap().ends_with("summary.png"));
    assert!(body.get("warning").is_none());

    let top = body["top_countries"].as_array().unwrap();
    assert_eq!(top.len(), 4);
    assert_eq!(top[0]["name"], "Germany");

    let (_, status_body) = app.send_json("GET", "/status").await;
    assert_eq!(status_body["total_countries"], 5);
    assert_eq!(status_body["last_refreshed_at"], body["last_refreshed_at"]);
}

#[tokio::test]
async fn test_list_sorted_by_gdp_desc() {
    let app = mixed_app().await;
    app.send("POST", "/countries/refresh").await;

    let (status, body) = app.send_json("GET", "/countries?sort=gdp_desc").await;
    assert_eq!(status, StatusCode::OK);

    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 5);
    assert!(list.last().unwrap()["estimated_gdp"].is_null());

    let gdps: Vec<f64> = list
        .iter()
        .filter_map(|c| c["estimated_gdp"].as_f64())
        .collect();
    assert!(gdps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_list_sorted_by_gdp_asc() {
    let app = mixed_app().await;
    app.send("POST", "/countries/refresh").await;

    let (_, body) = app.send_json("GET", "/countries?sort=gdp_asc").await;
    assert_eq!(
        names(&body),
        vec!["Antarctica", "Nigeria", "Ghana", "Germany", "Neverland"]
    );
}

#[tokio::test]
async fn test_list_filters() {
    let app = mixed_app().await;
    app.send("POST", "/countries/refresh").await;

    let (_, africa) = app.send_json("GET", "/countries?region=Africa").await;
    assert_eq!(names(&africa), vec!["Nigeria", "Ghana", "Neverland"]);

    let (_, euro) = app.send_json("GET", "/countries?currency=EUR").await;
    assert_eq!(names(&euro), vec!["Germany"]);

    let (_, both) = app
        .send_json("GET", "/countries?region=Africa&currency=EUR")
        .await;
    assert!(both.as_array().unwrap().is_empty());

    // Empty parameters are ignored
    let (_, all) = app.send_json("GET", "/countries?region=&currency=").await;
    assert_eq!(all.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_list_rejects_unknown_sort() {
    let app = mixed_app().await;
    let (status, body) = app.send_json("GET", "/countries?sort=population").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("population"));
}

#[tokio::test]
async fn test_get_country_case_insensitive() {
    let app = mixed_app().await;
    app.send("POST", "/countries/refresh").await;

    let (status, body) = app.send_json("GET", "/countries/nIgErIa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Nigeria");
    assert_eq!(body["currency_code"], "NGN");
    assert_eq!(body["exchange_rate"], 1600.0);
    assert!(body["id"].as_i64().is_some());
}

#[tokio::test]
async fn test_get_country_with_encoded_name() {
    let countries = serde_json::json!([
        { "name": "United States of America", "population": 10, "currencies": [{ "code": "USD" }] }
    ]);
    let app = TestApp::start(countries, rates(&[("USD", 1.0)])).await;
    app.send("POST", "/countries/refresh").await;

    let (status, body) = app
        .send_json("GET", "/countries/united%20states%20of%20america")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "United States of America");
}

#[tokio::test]
async fn test_get_missing_country() {
    let app = mixed_app().await;
    let (status, body) = app.send_json("GET", "/countries/Atlantis").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn test_delete_country() {
    let app = mixed_app().await;
    app.send("POST", "/countries/refresh").await;

    let (status, body) = app.send("DELETE", "/countries/GERMANY").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _) = app.send("GET", "/countries/Germany").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status_body) = app.send_json("GET", "/status").await;
    assert_eq!(status_body["total_countries"], 4);
}

#[tokio::test]
async fn test_delete_missing_country_on_empty_store() {
    let app = mixed_app().await;
    let (status, body) = app.send_json("DELETE", "/countries/Atlantis").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
    assert_eq!(app.state.repository.count().unwrap(), 0);
}

#[tokio::test]
async fn test_summary_image_lifecycle() {
    let app = mixed_app().await;

    let (status, body) = app.send_json("GET", "/countries/image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Summary image not found");

    app.send("POST", "/countries/refresh").await;

    let request = Request::builder()
        .uri("/countries/image")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_image_route_not_shadowed_by_name() {
    let countries = serde_json::json!([{ "name": "Image", "population": 1, "currencies": [] }]);
    let app = TestApp::start(countries, rates(&[])).await;
    app.send("POST", "/countries/refresh").await;

    let (status, bytes) = app.send("GET", "/countries/image").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..4], b"\x89PNG");
}
