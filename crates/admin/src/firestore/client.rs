//! Document CRUD operations against the Firestore REST API.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use crate::config::FirestoreConfig;

use super::{Document, FirestoreError, Value, WriteValue};

/// Firestore REST API base URL.
const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Page size used when walking a collection to exhaustion.
const LIST_PAGE_SIZE: u32 = 300;

/// Alphabet for client-generated document ids, matching the hosted SDKs.
const AUTO_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const AUTO_ID_LENGTH: usize = 20;

/// Value of the `setToServerTime` field transform.
const SERVER_TIME_REQUEST: &str = "REQUEST_TIME";

/// Firestore REST API client.
///
/// Provides document CRUD keyed by collection name and document id. Cheaply
/// cloneable; all clones share one HTTP connection pool.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    /// `projects/{project}/databases/{database}/documents`
    parent: String,
    api_key: SecretString,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &FirestoreConfig) -> Result<Self, FirestoreError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(FirestoreClientInner {
                client,
                parent: format!(
                    "projects/{}/databases/{}/documents",
                    config.project_id, config.database_id
                ),
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Fetch every document in a collection, following page tokens until the
    /// collection is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_documents(
        &self,
        collection: &str,
    ) -> Result<Vec<Document>, FirestoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.inner.client.get(&url).query(&[
                ("pageSize", LIST_PAGE_SIZE.to_string()),
                ("key", self.inner.api_key.expose_secret().to_string()),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            let page: ListDocumentsResponse = handle_response(response).await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    /// Create a document with a gateway-assigned or client-generated id and
    /// return that id.
    ///
    /// Literal fields go through a plain create. If any field carries the
    /// server-timestamp sentinel, the write is issued as a `documents:commit`
    /// with an `updateTransforms` entry per sentinel field, which requires a
    /// client-generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, fields))]
    pub async fn add_document(
        &self,
        collection: &str,
        fields: BTreeMap<String, WriteValue>,
    ) -> Result<String, FirestoreError> {
        let mut literal = BTreeMap::new();
        let mut server_time_fields = Vec::new();
        for (key, value) in fields {
            match value {
                WriteValue::Set(v) => {
                    literal.insert(key, v);
                }
                WriteValue::ServerTimestamp => server_time_fields.push(key),
            }
        }

        if server_time_fields.is_empty() {
            let response = self
                .inner
                .client
                .post(self.collection_url(collection))
                .query(&[("key", self.inner.api_key.expose_secret())])
                .json(&DocumentBody { fields: &literal })
                .send()
                .await?;
            let document: Document = handle_response(response).await?;
            return Ok(document.id().to_string());
        }

        let id = generate_document_id();
        let name = self.document_name(collection, &id);
        let request = CommitRequest {
            writes: vec![Write {
                update: WriteDocument {
                    name: &name,
                    fields: &literal,
                },
                update_transforms: server_time_fields
                    .iter()
                    .map(|field_path| FieldTransform {
                        field_path,
                        set_to_server_time: SERVER_TIME_REQUEST,
                    })
                    .collect(),
                current_document: Precondition { exists: false },
            }],
        };

        let response = self
            .inner
            .client
            .post(self.commit_url())
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(&request)
            .send()
            .await?;
        let committed: CommitResponse = handle_response(response).await?;
        tracing::debug!(document = %name, commit_time = ?committed.commit_time, "commit applied");
        Ok(id)
    }

    /// Update exactly the given fields of an existing document, leaving every
    /// other field untouched (the update mask names only the provided paths).
    ///
    /// # Errors
    ///
    /// Returns `FirestoreError::NotFound` if the document does not exist.
    #[instrument(skip(self, fields))]
    pub async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<Document, FirestoreError> {
        let mut query: Vec<(&str, String)> = fields
            .keys()
            .map(|key| ("updateMask.fieldPaths", key.clone()))
            .collect();
        // Updating a missing document must fail rather than create it.
        query.push(("currentDocument.exists", "true".to_string()));
        query.push(("key", self.inner.api_key.expose_secret().to_string()));

        let response = self
            .inner
            .client
            .patch(self.document_url(collection, id))
            .query(&query)
            .json(&DocumentBody { fields: &fields })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. Deleting a missing document
    /// succeeds, as it does in the hosted SDKs.
    #[instrument(skip(self))]
    pub async fn delete_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<(), FirestoreError> {
        let response = self
            .inner
            .client
            .delete(self.document_url(collection, id))
            .query(&[("key", self.inner.api_key.expose_secret())])
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{BASE_URL}/{}/{collection}", self.inner.parent)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{BASE_URL}/{}/{collection}/{}",
            self.inner.parent,
            urlencoding::encode(id)
        )
    }

    fn commit_url(&self) -> String {
        format!("{BASE_URL}/{}:commit", self.inner.parent)
    }

    /// Full resource name of a document, without the base URL.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.inner.parent)
    }
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("parent", &self.inner.parent)
            .finish_non_exhaustive()
    }
}

/// Generate a 20-character document id the way the hosted SDKs do.
fn generate_document_id() -> String {
    let mut rng = rand::rng();
    (0..AUTO_ID_LENGTH)
        .filter_map(|_| AUTO_ID_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect()
}

/// Parse a successful response, or classify the error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FirestoreError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| FirestoreError::Parse(format!("failed to parse response: {e}")));
    }
    Err(error_from_response(response).await)
}

/// Turn an error response into a `FirestoreError`.
async fn error_from_response(response: reqwest::Response) -> FirestoreError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    let body = response.text().await.unwrap_or_default();
    classify_error(status, retry_after, &body)
}

fn classify_error(status: u16, retry_after: Option<u64>, body: &str) -> FirestoreError {
    let message =
        parse_error_message(body).unwrap_or_else(|| format!("status {status} with no detail"));

    match status {
        401 | 403 => FirestoreError::Unauthorized(message),
        404 => FirestoreError::NotFound(message),
        429 => FirestoreError::RateLimited(retry_after.unwrap_or(60)),
        _ => FirestoreError::Api { status, message },
    }
}

/// Pull the message out of a `{"error": {"code", "message", "status"}}` body.
fn parse_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorStatus,
    }
    #[derive(Deserialize)]
    struct ErrorStatus {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

// =============================================================================
// Wire Types
// =============================================================================

/// Request/response body carrying only a field map (create and patch).
#[derive(Serialize)]
struct DocumentBody<'a> {
    fields: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    writes: Vec<Write<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Write<'a> {
    update: WriteDocument<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    update_transforms: Vec<FieldTransform<'a>>,
    current_document: Precondition,
}

#[derive(Serialize)]
struct WriteDocument<'a> {
    name: &'a str,
    fields: &'a BTreeMap<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform<'a> {
    field_path: &'a str,
    set_to_server_time: &'static str,
}

#[derive(Serialize)]
struct Precondition {
    exists: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    commit_time: Option<String>,
}
