//! Upload screen route handlers.
//!
//! Accepts a local file, pushes it to the media host, then records the
//! returned URL in the remote `sample` collection with a server-assigned
//! timestamp. The two writes are not linked: if the record write fails after
//! a successful upload, the file stays at the media host with no sample
//! document pointing at it. That asymmetry is deliberate (see DESIGN.md).

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::AppError;
use crate::firestore::{Value, WriteValue};
use crate::state::AppState;

/// Collection recording uploaded image URLs.
pub const SAMPLE_COLLECTION: &str = "sample";

/// Field names written to the sample collection.
const IMAGE_URL_FIELD: &str = "imageUrl";
const CREATED_AT_FIELD: &str = "createdAt";

/// Outcome notification shown after an upload attempt.
#[derive(Debug, Clone)]
pub struct Flash {
    /// CSS class: "success", "error", or "warning".
    pub kind: &'static str,
    pub message: String,
}

impl Flash {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: "warning",
            message: message.into(),
        }
    }
}

/// Upload page template.
#[derive(Template, WebTemplate)]
#[template(path = "uploads/index.html")]
pub struct UploadTemplate {
    pub result_url: Option<String>,
    pub flash: Option<Flash>,
    pub current_path: String,
}

impl UploadTemplate {
    fn page(result_url: Option<String>, flash: Option<Flash>) -> Self {
        Self {
            result_url,
            flash,
            current_path: "/".to_string(),
        }
    }
}

/// A file pulled out of the multipart form.
struct SelectedFile {
    filename: String,
    data: Vec<u8>,
}

/// The sample-collection fields for one uploaded image.
fn sample_fields(image_url: &str) -> BTreeMap<String, WriteValue> {
    BTreeMap::from([
        (
            IMAGE_URL_FIELD.to_string(),
            WriteValue::Set(Value::string(image_url)),
        ),
        (CREATED_AT_FIELD.to_string(), WriteValue::ServerTimestamp),
    ])
}

/// Read the `file` part of the form, if one was actually selected.
///
/// Browsers submit an empty part when the picker is left untouched, so an
/// empty filename or an empty body both count as no selection.
async fn read_selected_file(
    multipart: &mut Multipart,
) -> Result<Option<SelectedFile>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?.to_vec();
        if filename.is_empty() || data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(SelectedFile { filename, data }));
    }
    Ok(None)
}

// =============================================================================
// Handlers
// =============================================================================

/// Upload page.
#[instrument]
pub async fn index() -> UploadTemplate {
    UploadTemplate::page(None, None)
}

/// Upload a file to the media host and record its URL.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(file) = read_selected_file(&mut multipart).await? else {
        let flash = Flash::warning("Please select an image first.");
        return Ok(UploadTemplate::page(None, Some(flash)).into_response());
    };

    let uploaded = match state
        .cloudinary()
        .upload_image(file.data, &file.filename)
        .await
    {
        Ok(uploaded) => uploaded,
        Err(e) => {
            tracing::error!(error = %e, filename = %file.filename, "image upload failed");
            let flash = Flash::error("Failed to upload or save the image.");
            return Ok(UploadTemplate::page(None, Some(flash)).into_response());
        }
    };

    // The file is stored at the media host from here on; a failure below
    // leaves it there with no sample record.
    let flash = match state
        .firestore()
        .add_document(SAMPLE_COLLECTION, sample_fields(&uploaded.secure_url))
        .await
    {
        Ok(id) => {
            tracing::info!(
                document_id = %id,
                public_id = %uploaded.public_id,
                url = %uploaded.secure_url,
                "image uploaded and recorded"
            );
            Flash::success("Image uploaded and saved.")
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                url = %uploaded.secure_url,
                "failed to record uploaded image"
            );
            Flash::error("Failed to upload or save the image.")
        }
    };

    Ok(UploadTemplate::page(Some(uploaded.secure_url), Some(flash)).into_response())
}
