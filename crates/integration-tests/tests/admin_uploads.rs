//! Integration tests for the upload screen.
//!
//! These tests require a running admin server (cargo run -p saltbox-admin)
//! with valid Cloudinary and Firestore credentials in the environment. The
//! upload test stores a real file at the media host.
//!
//! Run with: cargo test -p saltbox-integration-tests -- --ignored

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

use saltbox_integration_tests::admin_base_url;

/// Smallest valid PNG (1x1, transparent).
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[tokio::test]
#[ignore = "Requires running admin server and live gateway credentials"]
async fn test_upload_page_renders_form() {
    let resp = reqwest::get(admin_base_url())
        .await
        .expect("Failed to get upload page");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");

    assert!(body.contains("multipart/form-data"));
    assert!(body.contains("type=\"file\""));
}

#[tokio::test]
#[ignore = "Requires running admin server and live gateway credentials"]
async fn test_upload_without_file_shows_warning_and_no_preview() {
    let client = reqwest::Client::new();

    // A form without a usable file part must warn before any gateway call.
    let form = Form::new().part("file", Part::bytes(Vec::new()).file_name(""));
    let resp = client
        .post(format!("{}/uploads", admin_base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to post upload");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Please select an image first."));
    assert!(!body.contains("Saved image"));
}

#[tokio::test]
#[ignore = "Requires running admin server and live gateway credentials"]
async fn test_upload_stores_file_and_shows_preview() {
    let client = reqwest::Client::new();

    let form = Form::new().part(
        "file",
        Part::bytes(TINY_PNG.to_vec())
            .file_name("pixel.png")
            .mime_str("image/png")
            .expect("Invalid mime type"),
    );
    let resp = client
        .post(format!("{}/uploads", admin_base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to post upload");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");

    assert!(body.contains("Image uploaded and saved."));
    assert!(body.contains("Saved image"));
    assert!(body.contains("https://"));
}
