//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health              - Health check (registered in main)
//!
//! # Upload screen
//! GET  /                    - Upload form and result preview
//! POST /uploads             - Upload a file and record its URL
//!
//! # User directory
//! GET  /users               - User listing with search and inline edit
//! POST /users/{id}          - Save an edited user
//! POST /users/{id}/delete   - Delete a user
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod uploads;
pub mod users;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Upload screen
        .route("/", get(uploads::index))
        .route("/uploads", post(uploads::upload))
        // User directory
        .route("/users", get(users::index))
        .route("/users/{id}", post(users::update))
        .route("/users/{id}/delete", post(users::delete))
}
