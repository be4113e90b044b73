//! Integration tests for families, invite codes and baby access

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "requires database"]
async fn test_invite_code_grants_access_to_babies() {
    let app = common::TestApp::new().await;
    let owner = app.create_test_user().await;
    let (family_id, invite_code) = app.create_family(&owner).await;

    let partner = app.create_test_user().await;
    let body = json!({ "invite_code": invite_code.to_lowercase() });
    let (status, response) = app
        .post_auth("/api/v1/families/join", &partner.access_token, &body.to_string())
        .await;
    assert_eq!(status, StatusCode::OK, "{}", response);
    let joined: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(joined["id"], family_id.as_str());
    assert_eq!(joined["role"], "member");

    let (status, _) = app
        .get_auth(
            &format!("/api/v1/families/{}/babies", family_id),
            &partner.access_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_unknown_invite_code_is_not_found() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let body = json!({ "invite_code": "ZZZZZZZZ" });
    let (status, _) = app
        .post_auth("/api/v1/families/join", &user.access_token, &body.to_string())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_baby_access_distinguishes_missing_and_foreign() {
    let app = common::TestApp::new().await;
    let owner = app.create_test_user().await;
    let baby_id = app.create_baby(&owner).await;

    let stranger = app.create_test_user().await;
    let (status, _) = app
        .get_auth(&format!("/api/v1/babies/{}", baby_id), &stranger.access_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get_auth(
            &format!("/api/v1/babies/{}", uuid::Uuid::new_v4()),
            &owner.access_token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, response) = app
        .get_auth(&format!("/api/v1/babies/{}", baby_id), &owner.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let baby: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(baby["age_months"], 3);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_future_birth_date_rejected() {
    let app = common::TestApp::new().await;
    let owner = app.create_test_user().await;
    let (family_id, _) = app.create_family(&owner).await;

    let tomorrow = (chrono::Utc::now() + chrono::Duration::days(2)).date_naive();
    let body = json!({ "name": "Soon", "birth_date": tomorrow, "gender": "male" });
    let (status, _) = app
        .post_auth(
            &format!("/api/v1/families/{}/babies", family_id),
            &owner.access_token,
            &body.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
