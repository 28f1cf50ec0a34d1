//! User directory route handlers.
//!
//! Lists the remote `users` collection with substring search, inline editing
//! of `username`/`email`, and per-row delete. Every successful mutation
//! redirects back to the list, so the next render is always a fresh fetch
//! from the gateway rather than a local patch.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::firestore::{Document, Value};
use crate::state::AppState;

/// Collection holding the user records.
pub const USERS_COLLECTION: &str = "users";

/// Query parameters for the directory page.
#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    /// Substring search term.
    pub q: Option<String>,
    /// Id of the row being edited, if any.
    pub edit: Option<String>,
}

/// Form body for saving an edited user.
#[derive(Debug, Deserialize)]
pub struct SaveEditForm {
    pub username: String,
    pub email: String,
    /// Search term carried through so it survives the round trip.
    #[serde(default)]
    pub q: String,
}

/// Form body for deleting a user.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub q: String,
}

/// Transient copy of the one record being edited.
///
/// At most one draft exists per rendered page: it is whatever the `edit`
/// query parameter (or a failed save) names, so beginning a different edit
/// replaces it and navigating away discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl EditDraft {
    fn from_document(document: &Document) -> Self {
        Self {
            id: document.id().to_string(),
            username: document.field_text("username"),
            email: document.field_text("email"),
        }
    }

    /// Both fields must be non-empty before a save is attempted.
    fn is_saveable(&self) -> bool {
        !self.username.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Row view for the directory table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub editing: bool,
    /// Begin-edit link for this row (search term preserved).
    pub edit_href: String,
    /// POST target for saving this row's draft.
    pub update_action: String,
    /// POST target for deleting this row.
    pub delete_action: String,
}

/// Directory page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub rows: Vec<UserRow>,
    pub search: String,
    /// Plain list URL with the search term preserved (Cancel target).
    pub list_href: String,
    pub current_path: String,
}

impl UsersIndexTemplate {
    fn page(rows: Vec<UserRow>, search: String) -> Self {
        Self {
            list_href: list_url(&search),
            rows,
            search,
            current_path: "/users".to_string(),
        }
    }
}

// =============================================================================
// Directory Logic
// =============================================================================

/// Case-insensitive substring match across the record id and every field
/// value. An empty term matches every record.
fn matches_search(document: &Document, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    if document.id().to_lowercase().contains(&needle) {
        return true;
    }
    document
        .fields
        .values()
        .any(|value| value.to_string().to_lowercase().contains(&needle))
}

/// Filter the fetched records, preserving the gateway's return order.
fn filter_documents<'a>(documents: &'a [Document], term: &str) -> Vec<&'a Document> {
    documents
        .iter()
        .filter(|document| matches_search(document, term))
        .collect()
}

/// Build table rows from the filtered records. The row matching the draft id
/// renders as editable inputs seeded from the draft; filtering always uses
/// the stored record values, not the draft.
fn build_rows(documents: &[Document], term: &str, draft: Option<&EditDraft>) -> Vec<UserRow> {
    filter_documents(documents, term)
        .into_iter()
        .map(|document| {
            let id = document.id().to_string();
            let (username, email, editing) = match draft {
                Some(d) if d.id == id => (d.username.clone(), d.email.clone(), true),
                _ => (
                    document.field_text("username"),
                    document.field_text("email"),
                    false,
                ),
            };
            UserRow {
                edit_href: edit_url(&id, term),
                update_action: format!("/users/{}", urlencoding::encode(&id)),
                delete_action: format!("/users/{}/delete", urlencoding::encode(&id)),
                id,
                username,
                email,
                editing,
            }
        })
        .collect()
}

/// Plain list URL with the search term preserved.
fn list_url(search: &str) -> String {
    if search.is_empty() {
        "/users".to_string()
    } else {
        format!("/users?q={}", urlencoding::encode(search))
    }
}

/// Begin-edit URL for one row, search term preserved.
fn edit_url(id: &str, search: &str) -> String {
    let mut url = format!("/users?edit={}", urlencoding::encode(id));
    if !search.is_empty() {
        url.push_str(&format!("&q={}", urlencoding::encode(search)));
    }
    url
}

/// Fetch the whole collection. Failures are logged and swallowed; the screen
/// then renders with an empty list and no error indicator.
async fn load_users(state: &AppState) -> Vec<Document> {
    match state.firestore().list_documents(USERS_COLLECTION).await {
        Ok(documents) => documents,
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch users");
            Vec::new()
        }
    }
}

/// Re-render the directory with an open edit form holding the draft.
async fn render_with_draft(state: &AppState, search: &str, draft: EditDraft) -> UsersIndexTemplate {
    let documents = load_users(state).await;
    UsersIndexTemplate::page(
        build_rows(&documents, search, Some(&draft)),
        search.to_string(),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Directory page: full fetch, search filter, optional inline edit form.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> UsersIndexTemplate {
    let documents = load_users(&state).await;
    let search = query.q.unwrap_or_default();

    // Begin Edit: seed the draft from the stored record. An unknown id (e.g.
    // a row deleted since the last render) falls back to the plain list.
    let draft = query.edit.and_then(|id| {
        documents
            .iter()
            .find(|document| document.id() == id)
            .map(EditDraft::from_document)
    });

    UsersIndexTemplate::page(build_rows(&documents, &search, draft.as_ref()), search)
}

/// Save an edited user: write exactly `username` and `email`, then reload.
///
/// An empty field means no gateway call at all; the form re-renders still
/// holding the draft. A failed write is logged and swallowed, leaving the
/// form open for a retry.
#[instrument(skip(state, form), fields(user_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SaveEditForm>,
) -> Response {
    let draft = EditDraft {
        id,
        username: form.username,
        email: form.email,
    };

    if !draft.is_saveable() {
        return render_with_draft(&state, &form.q, draft)
            .await
            .into_response();
    }

    let fields = BTreeMap::from([
        ("username".to_string(), Value::string(draft.username.clone())),
        ("email".to_string(), Value::string(draft.email.clone())),
    ]);

    match state
        .firestore()
        .patch_document(USERS_COLLECTION, &draft.id, fields)
        .await
    {
        Ok(_) => Redirect::to(&list_url(&form.q)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to update user");
            render_with_draft(&state, &form.q, draft)
                .await
                .into_response()
        }
    }
}

/// Delete a user, then reload. A failed delete is logged and swallowed; the
/// reload then shows whatever the gateway still holds.
#[instrument(skip(state, form), fields(user_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    if let Err(e) = state
        .firestore()
        .delete_document(USERS_COLLECTION, &id)
        .await
    {
        tracing::error!(error = %e, "failed to delete user");
    }
    Redirect::to(&list_url(&form.q))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(id: &str, fields: &[(&str, &str)]) -> Document {
        Document {
            name: format!("projects/demo/databases/(default)/documents/users/{id}"),
            fields: fields
                .iter()
                .map(|(key, value)| ((*key).to_string(), Value::string(*value)))
                .collect(),
            create_time: None,
            update_time: None,
        }
    }

    fn alice() -> Document {
        doc("1", &[("username", "alice"), ("email", "a@x.com")])
    }

    fn bob() -> Document {
        doc("2", &[("username", "bob"), ("email", "b@y.org")])
    }

    #[test]
    fn test_filter_matches_case_insensitively() {
        // Scenario: "ALI" must match the record holding username "alice".
        let documents = vec![alice()];
        let filtered = filter_documents(&documents, "ALI");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.first().unwrap().id(), "1");
    }

    #[test]
    fn test_filter_empty_term_matches_all_in_order() {
        let documents = vec![alice(), bob()];
        let filtered = filter_documents(&documents, "");
        let ids: Vec<&str> = filtered.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_filter_matches_any_field() {
        let documents = vec![alice(), bob()];
        // Term only present in bob's email.
        let filtered = filter_documents(&documents, "y.org");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.first().unwrap().id(), "2");
    }

    #[test]
    fn test_filter_matches_extra_fields_and_id() {
        let with_extra = doc(
            "xyz9",
            &[
                ("username", "carol"),
                ("email", "c@z.net"),
                ("role", "Moderator"),
            ],
        );
        let documents = vec![with_extra];

        assert_eq!(filter_documents(&documents, "moderator").len(), 1);
        assert_eq!(filter_documents(&documents, "XYZ").len(), 1);
        assert!(filter_documents(&documents, "nothing-here").is_empty());
    }

    #[test]
    fn test_draft_saveable_requires_both_fields() {
        let mut draft = EditDraft {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        };
        assert!(draft.is_saveable());

        draft.username = String::new();
        assert!(!draft.is_saveable());

        draft.username = "   ".to_string();
        assert!(!draft.is_saveable());

        draft.username = "alice".to_string();
        draft.email = String::new();
        assert!(!draft.is_saveable());
    }

    #[test]
    fn test_build_rows_marks_only_the_draft_row_editing() {
        let documents = vec![alice(), bob()];
        let draft = EditDraft {
            id: "2".to_string(),
            username: "robert".to_string(),
            email: "b@y.org".to_string(),
        };

        let rows = build_rows(&documents, "", Some(&draft));
        assert_eq!(rows.len(), 2);

        let first = rows.first().unwrap();
        assert!(!first.editing);
        assert_eq!(first.username, "alice");

        // The editing row shows the draft's values, not the stored ones.
        let second = rows.get(1).unwrap();
        assert!(second.editing);
        assert_eq!(second.username, "robert");
    }

    #[test]
    fn test_build_rows_replacing_draft_discards_prior_edits() {
        // Begin Edit(a) followed by Begin Edit(b): only b's copy survives.
        let documents = vec![alice(), bob()];
        let draft_b = EditDraft::from_document(documents.get(1).unwrap());

        let rows = build_rows(&documents, "", Some(&draft_b));
        assert!(!rows.first().unwrap().editing);
        assert!(rows.get(1).unwrap().editing);
        assert_eq!(rows.get(1).unwrap().username, "bob");
    }

    #[test]
    fn test_build_rows_filters_on_stored_values_not_draft() {
        // A draft rename must not change which rows the search matches.
        let documents = vec![alice()];
        let draft = EditDraft {
            id: "1".to_string(),
            username: "renamed".to_string(),
            email: "a@x.com".to_string(),
        };

        let rows = build_rows(&documents, "alice", Some(&draft));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().username, "renamed");

        assert!(build_rows(&documents, "renamed", Some(&draft)).is_empty());
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let bare = doc("3", &[]);
        let rows = build_rows(&[bare], "", None);
        assert_eq!(rows.first().unwrap().username, "");
        assert_eq!(rows.first().unwrap().email, "");
    }

    #[test]
    fn test_list_url_encodes_search() {
        assert_eq!(list_url(""), "/users");
        assert_eq!(list_url("a b"), "/users?q=a%20b");
    }

    #[test]
    fn test_edit_url_preserves_search() {
        assert_eq!(edit_url("1", ""), "/users?edit=1");
        assert_eq!(edit_url("1", "ali"), "/users?edit=1&q=ali");
    }
}
