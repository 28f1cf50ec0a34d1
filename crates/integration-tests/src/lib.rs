//! Integration tests for Saltbox Admin.
//!
//! # Running Tests
//!
//! These tests drive a running admin server over HTTP and therefore need
//! live gateway credentials:
//!
//! ```bash
//! # Start the server (reads .env for Firestore/Cloudinary config)
//! cargo run -p saltbox-admin
//!
//! # Run the ignored integration tests against it
//! cargo test -p saltbox-integration-tests -- --ignored
//! ```
//!
//! The server under test talks to real Firestore and Cloudinary projects;
//! point it at throwaway ones.

/// Base URL for the admin server (configurable via environment).
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// HTTP client that does not follow redirects, so tests can assert on the
/// redirect responses mutations return.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn manual_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}
