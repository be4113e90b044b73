//! Integration tests for activity records, measurements and CSV export

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

fn feeding(amount_ml: f64, minutes_ago: i64) -> Value {
    json!({
        "started_at": Utc::now() - Duration::minutes(minutes_ago),
        "category": "feeding",
        "feeding_type": "formula",
        "amount_ml": amount_ml,
    })
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_activity_crud() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;
    let baby_id = app.create_baby(&user).await;
    let base = format!("/api/v1/babies/{}/activities", baby_id);

    let (status, response) = app
        .post_auth(&base, &user.access_token, &feeding(120.0, 30).to_string())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", response);
    let created: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(created["category"], "feeding");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, response) = app
        .put_auth(
            &format!("{}/{}", base, id),
            &user.access_token,
            &feeding(150.0, 30).to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", response);
    let updated: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(updated["amount_ml"], 150.0);

    let (status, response) = app
        .get_auth(&format!("{}?category=feeding", base), &user.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(list["count"], 1);

    let (status, _) = app
        .delete_auth(&format!("{}/{}", base, id), &user.access_token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete_auth(&format!("{}/{}", base, id), &user.access_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_out_of_range_temperature_rejected() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;
    let baby_id = app.create_baby(&user).await;

    let body = json!({
        "started_at": Utc::now() - Duration::minutes(5),
        "category": "temperature",
        "celsius": 46.0,
    });
    let (status, response) = app
        .post_auth(
            &format!("/api/v1/babies/{}/activities", baby_id),
            &user.access_token,
            &body.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(error["error"]["field"], "celsius");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_export_is_csv_oldest_first() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;
    let baby_id = app.create_baby(&user).await;
    let base = format!("/api/v1/babies/{}/activities", baby_id);

    app.post_auth(&base, &user.access_token, &feeding(90.0, 120).to_string())
        .await;
    app.post_auth(&base, &user.access_token, &feeding(110.0, 10).to_string())
        .await;

    let (status, csv) = app
        .get_auth(&format!("{}/export", base), &user.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let amounts: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(5).unwrap().to_string())
        .collect();
    assert_eq!(amounts, vec!["90.0", "110.0"]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_measurements_feed_guidelines() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;
    let baby_id = app.create_baby(&user).await;

    let body = json!({ "weight_kg": 6.2, "height_cm": 61.5 });
    let (status, _) = app
        .post_auth(
            &format!("/api/v1/babies/{}/measurements", baby_id),
            &user.access_token,
            &body.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = app
        .get_auth(
            &format!("/api/v1/babies/{}/guidelines", baby_id),
            &user.access_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", response);
    let guidelines: Value = serde_json::from_str(&response).unwrap();
    assert!(!guidelines["feeding"].is_null());
}
