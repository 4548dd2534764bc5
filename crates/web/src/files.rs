//! Container file navigator API
//!
//! Every route under `/api/sessions/:id` locks that session for the whole
//! request, so a second action on the same session waits for the first.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use dockhand_common::navigator::{self, join_path, NavAction};
use dockhand_common::{DirectoryListing, EntryKind, PendingDelete, SessionView, TransferView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub container: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
    pub listing: Option<DirectoryListing>,
    /// Set when the starting directory could not be listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub current_path: String,
    pub listing: DirectoryListing,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectTransferRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Serialize)]
pub struct DeletePendingResponse {
    pub pending: PendingDelete,
}

#[derive(Debug, Serialize)]
pub struct DeleteConfirmResponse {
    pub removed: String,
    pub listing: DirectoryListing,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse<T> {
    pub cancelled: Option<T>,
}

// ============================================================================
// Session lifecycle
// ============================================================================

async fn open_session_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.navigator.open(&req.container).await?;
    let (listing, listing_error) = match state.navigator.list(&session).await {
        Ok(listing) => (Some(listing), None),
        Err(e) if e.is_recoverable() => (None, Some(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    let view = session.view();
    state.sessions.insert(session).await;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session: view,
            listing,
            listing_error,
        }),
    ))
}

async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let handle = state.sessions.get(id).await?;
    let session = handle.lock().await;
    Ok(Json(session.view()))
}

async fn close_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn switch_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<OpenSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let switched = state
        .navigator
        .switch_container(session.clone(), &req.container)
        .await?;
    *session = switched;
    session.touch();

    let (listing, listing_error) = match state.navigator.list(&session).await {
        Ok(listing) => (Some(listing), None),
        Err(e) if e.is_recoverable() => (None, Some(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SessionResponse {
        session: session.view(),
        listing,
        listing_error,
    }))
}

// ============================================================================
// Navigation
// ============================================================================

async fn entries_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DirectoryListing>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;
    session.touch();
    let listing = state.navigator.list(&session).await?;
    Ok(Json(listing))
}

async fn navigate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(action): Json<NavAction>,
) -> ApiResult<Json<NavigateResponse>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let attempted = navigator::resolve(&action, &session.current_path);
    let listing = state
        .navigator
        .navigate(&mut session, action)
        .await
        .map_err(|e| ApiError::at_path(e, attempted))?;

    Ok(Json(NavigateResponse {
        current_path: session.current_path.clone(),
        listing,
    }))
}

// ============================================================================
// Transfers
// ============================================================================

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    debug!(session = %id, filename = %params.filename, bytes = body.len(), "upload");
    state
        .navigator
        .upload(&mut session, &params.filename, &body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            path: join_path(&session.current_path, &params.filename),
            size_bytes: body.len() as u64,
        }),
    ))
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<NameQuery>,
) -> ApiResult<Response> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let bytes = state
        .navigator
        .download_file(&mut session, &params.name)
        .await?;
    Ok(attachment("application/octet-stream", &params.name, bytes))
}

async fn archive_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let archive = state.navigator.download_folder(&mut session).await?;
    Ok(attachment("application/x-tar", &archive.filename, archive.bytes))
}

async fn select_transfer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectTransferRequest>,
) -> ApiResult<Json<TransferView>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let staged = state
        .navigator
        .select_for_download(&mut session, &req.name)
        .await?;
    Ok(Json(TransferView {
        filename: staged.filename.clone(),
        size_bytes: staged.bytes.len() as u64,
    }))
}

async fn take_transfer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let transfer = state.navigator.take_transfer(&mut session)?;
    Ok(attachment(
        "application/octet-stream",
        &transfer.filename,
        transfer.bytes,
    ))
}

async fn cancel_transfer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse<TransferView>>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let cancelled = state
        .navigator
        .cancel_transfer(&mut session)
        .map(|t| TransferView {
            size_bytes: t.bytes.len() as u64,
            filename: t.filename,
        });
    Ok(Json(CancelResponse { cancelled }))
}

// ============================================================================
// Delete flow
// ============================================================================

async fn request_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<DeletePendingResponse>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    state
        .navigator
        .request_delete(&mut session, &req.name, req.kind)?;
    Ok(Json(DeletePendingResponse {
        pending: PendingDelete {
            name: req.name,
            kind: req.kind,
        },
    }))
}

async fn confirm_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteConfirmResponse>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let (removed, listing) = state.navigator.confirm_delete(&mut session).await?;
    Ok(Json(DeleteConfirmResponse { removed, listing }))
}

async fn cancel_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse<PendingDelete>>> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;

    let cancelled = state.navigator.cancel_delete(&mut session);
    Ok(Json(CancelResponse { cancelled }))
}

/// Binary response saved by the browser as `filename`
fn attachment(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace('\\', "\\\\").replace('"', "\\\"")
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Session routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(open_session_handler))
        .route(
            "/api/sessions/:id",
            get(get_session_handler).delete(close_session_handler),
        )
        .route("/api/sessions/:id/container", put(switch_container_handler))
        .route("/api/sessions/:id/entries", get(entries_handler))
        .route("/api/sessions/:id/navigate", post(navigate_handler))
        .route("/api/sessions/:id/upload", post(upload_handler))
        .route("/api/sessions/:id/download", get(download_handler))
        .route("/api/sessions/:id/archive", get(archive_handler))
        .route(
            "/api/sessions/:id/transfer",
            post(select_transfer_handler)
                .get(take_transfer_handler)
                .delete(cancel_transfer_handler),
        )
        .route("/api/sessions/:id/delete", post(request_delete_handler))
        .route("/api/sessions/:id/delete/confirm", post(confirm_delete_handler))
        .route("/api/sessions/:id/delete/cancel", post(cancel_delete_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_headers() {
        let resp = attachment("application/x-tar", "logs.tar", vec![1, 2, 3]);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"logs.tar\""
        );
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/x-tar");
    }

    #[test]
    fn test_attachment_escapes_quotes() {
        let resp = attachment("application/octet-stream", "a\"b.txt", Vec::new());
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"a\\\"b.txt\""
        );
    }
}
