//! Application state shared across handlers.

use std::sync::Arc;

use crate::cloudinary::{CloudinaryClient, CloudinaryError};
use crate::config::AdminConfig;
use crate::firestore::{FirestoreClient, FirestoreError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("document store client: {0}")]
    Firestore(#[from] FirestoreError),
    #[error("media host client: {0}")]
    Cloudinary(#[from] CloudinaryError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the two hosted gateway clients. There
/// is no local database and no other durable state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    firestore: FirestoreClient,
    cloudinary: CloudinaryClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if either gateway client fails to build.
    pub fn new(config: &AdminConfig) -> Result<Self, StateError> {
        let firestore = FirestoreClient::new(&config.firestore)?;
        let cloudinary = CloudinaryClient::new(&config.cloudinary)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                firestore,
                cloudinary,
            }),
        })
    }

    /// Get a reference to the Firestore client.
    #[must_use]
    pub fn firestore(&self) -> &FirestoreClient {
        &self.inner.firestore
    }

    /// Get a reference to the Cloudinary client.
    #[must_use]
    pub fn cloudinary(&self) -> &CloudinaryClient {
        &self.inner.cloudinary
    }
}
