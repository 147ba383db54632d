mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n0000";

#[tokio::test]
async fn profile_is_created_on_first_read() {
    let app = TestApp::new();
    let (token, user_id) = app.signup("student").await;

    let profile = app.get("/profile", Some(&token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["userId"], user_id.as_str());
    assert_eq!(profile.body["skills"], json!([]));
    assert_eq!(profile.body["education"], json!([]));
    assert!(profile.body["lastUpdated"].is_string());
    assert!(profile.body.get("createdAt").is_none());
}

#[tokio::test]
async fn patch_applies_allow_listed_fields_only() {
    let app = TestApp::new();
    let (token, user_id) = app.signup("student").await;

    let patched = app
        .patch(
            "/profile",
            Some(&token),
            json!({
                "skills": [{ "name": "Go", "category": "Languages", "proficiency": "Expert" }],
                "isAdmin": true,
                "userId": "00000000-0000-7000-8000-000000000000",
            }),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert!(patched.body.get("isAdmin").is_none());
    assert_eq!(patched.body["userId"], user_id.as_str());

    let fetched = app.get("/profile", Some(&token)).await;
    assert_eq!(
        fetched.body["skills"],
        json!([{ "name": "Go", "category": "Languages", "proficiency": "Expert" }])
    );
}

#[tokio::test]
async fn invalid_entries_reject_the_whole_patch() {
    let app = TestApp::new();
    let (token, _) = app.signup("student").await;

    let bad_skill = app
        .patch(
            "/profile",
            Some(&token),
            json!({ "skills": [{ "name": "Go", "category": "Languages", "proficiency": "Guru" }] }),
        )
        .await;
    assert_eq!(bad_skill.status, StatusCode::BAD_REQUEST);

    let missing_institution = app
        .patch(
            "/profile",
            Some(&token),
            json!({
                "experience": [{ "company": "Acme", "position": "Engineer", "startDate": "2020-01" }],
                "education": [{ "institution": " ", "degree": "BSc", "field": "CS", "startDate": "2016" }],
            }),
        )
        .await;
    assert_eq!(missing_institution.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        missing_institution.body["error"]["fields"][0]["field"],
        "education[0].institution"
    );

    let profile = app.get("/profile", Some(&token)).await;
    assert_eq!(profile.body["experience"], json!([]));
}

#[tokio::test]
async fn avatar_alias_sets_image_url() {
    let app = TestApp::new();
    let (token, _) = app.signup("student").await;

    let patched = app
        .patch(
            "/profile",
            Some(&token),
            json!({ "avatar": "https://cdn.example.com/me.png" }),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["imageUrl"], "https://cdn.example.com/me.png");
}

#[tokio::test]
async fn avatar_upload_stores_and_serves_the_image() {
    let app = TestApp::new();
    let (token, _) = app.signup("student").await;

    let uploaded = app
        .upload("/profile/avatar", Some(&token), "file", "me.png", "image/png", PNG)
        .await;
    assert_eq!(uploaded.status, StatusCode::OK, "{}", uploaded.body);
    let url = uploaded.body["imageUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with("-me.png"));

    let served = app.get(&url, None).await;
    assert_eq!(served.status, StatusCode::OK);

    let pdf = app
        .upload("/profile/avatar", Some(&token), "file", "cv.pdf", "application/pdf", b"%PDF")
        .await;
    assert_eq!(pdf.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_avatar_is_rejected() {
    let app = TestApp::with_config(|config| config.uploads.max_image_bytes = 1024);
    let (token, _) = app.signup("student").await;

    let big = vec![0u8; 4096];
    let response = app
        .upload("/profile/avatar", Some(&token), "file", "big.png", "image/png", &big)
        .await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);

    let profile = app.get("/profile", Some(&token)).await;
    assert!(profile.body["imageUrl"].is_null());
}

#[tokio::test]
async fn delete_removes_the_profile() {
    let app = TestApp::new();
    let (token, _) = app.signup("student").await;
    app.patch("/profile", Some(&token), json!({ "skills": [] })).await;

    assert_eq!(app.delete("/profile", Some(&token)).await.status, StatusCode::OK);
    assert_eq!(app.delete("/profile", Some(&token)).await.status, StatusCode::NOT_FOUND);

    let recreated = app.get("/profile", Some(&token)).await;
    assert_eq!(recreated.body["skills"], json!([]));
}
