//! Firestore REST API client for the hosted document database.
//!
//! All durable records live in Firestore collections; this process keeps no
//! local copy. The client speaks the plain REST surface (no gRPC) with a web
//! API key, which is the same access level the hosted SDKs use.
//!
//! # Architecture
//!
//! - Typed field values mirror the REST wire encoding ([`Value`])
//! - Document CRUD keyed by collection name and document id
//! - Server-assigned timestamps via `documents:commit` field transforms
//!
//! # Example
//!
//! ```rust,ignore
//! use saltbox_admin::firestore::{FirestoreClient, Value, WriteValue};
//!
//! let client = FirestoreClient::new(&config.firestore)?;
//!
//! // List a collection
//! let users = client.list_documents("users").await?;
//!
//! // Patch two fields of one document
//! let fields = BTreeMap::from([
//!     ("username".to_string(), Value::string("alice")),
//!     ("email".to_string(), Value::string("a@x.com")),
//! ]);
//! client.patch_document("users", "abc123", fields).await?;
//! ```

mod client;
mod value;

pub use client::FirestoreClient;
pub use value::{ArrayValue, Document, LatLng, MapValue, Value, WriteValue};

use thiserror::Error;

/// Errors that can occur when interacting with the Firestore REST API.
#[derive(Debug, Error)]
pub enum FirestoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Firestore.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Document or collection not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication/authorization failed (invalid key or security rules).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}
