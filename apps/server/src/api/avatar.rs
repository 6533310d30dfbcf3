//! Profile picture endpoints.
//!
//! Pictures live on disk under `{upload_dir}/avatars/`; the user record
//! only stores the relative path. Downloads are streamed rather than
//! buffered.

use std::path::PathBuf;

use axum::{
    Extension,
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chat_store::ChatStore;
use entities::User;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::services::users;
use crate::state::SharedState;

/// File extensions accepted for profile pictures.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn require_self(user: &AuthenticatedUser, id: Uuid) -> ServerResult<()> {
    if user.id != id {
        return Err(ServerError::PermissionDenied(
            "You can only change your own profile picture".to_string(),
        ));
    }
    Ok(())
}

fn extension_of(file_name: &str) -> ServerResult<String> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| {
            ServerError::InvalidRequest("File name has no extension".to_string())
        })?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ServerError::InvalidRequest(format!(
            "File type '{ext}' is not allowed"
        )));
    }
    Ok(ext)
}

/// Handles `POST /users/:id/profilepicture`.
///
/// Expects a multipart upload with one file field. Users can only change
/// their own picture; a new upload replaces the stored path.
pub async fn upload<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ServerResult<Json<User>> {
    require_self(&user, id)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?
        .ok_or_else(|| {
            ServerError::InvalidRequest("Missing file field".to_string())
        })?;

    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ServerError::InvalidRequest("Missing file name".to_string()))?;
    let ext = extension_of(&file_name)?;

    let data = field
        .bytes()
        .await
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    if data.is_empty() {
        return Err(ServerError::InvalidRequest("File is empty".to_string()));
    }

    let relative = format!("avatars/{id}.{ext}");
    let absolute = PathBuf::from(&state.config.upload_dir).join(&relative);
    if let Some(parent) = absolute.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
    }
    tokio::fs::write(&absolute, &data)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    tracing::info!(user_id = %id, path = %relative, "Profile picture stored");

    let updated = users::set_avatar_path(&state.store, id, relative).await?;
    Ok(Json(updated))
}

/// Handles `GET /users/:id/profilepicture`, streaming the file.
pub async fn download<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<Uuid>,
) -> ServerResult<Response> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("User not found".to_string()))?;

    let relative = user.avatar_path.ok_or_else(|| {
        ServerError::InvalidRequest("User has no profile picture".to_string())
    })?;
    let absolute = PathBuf::from(&state.config.upload_dir).join(&relative);

    // The record can outlive the file, treat a missing file like a missing
    // picture.
    let file = tokio::fs::File::open(&absolute).await.map_err(|_| {
        ServerError::InvalidRequest("User has no profile picture".to_string())
    })?;

    let stream = ReaderStream::new(file);
    let headers = [(header::CONTENT_TYPE, content_type_for(&relative))];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Handles `DELETE /users/:id/profilepicture`.
///
/// Only the stored path is cleared; the file stays on disk and is
/// overwritten by the next upload.
pub async fn remove<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ServerResult<(StatusCode, Json<User>)> {
    require_self(&user, id)?;
    let updated = users::clear_avatar_path(&state.store, id).await?;
    Ok((StatusCode::OK, Json(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_validation() {
        assert_eq!(extension_of("me.PNG").unwrap(), "png");
        assert_eq!(extension_of("photo.jpeg").unwrap(), "jpeg");
        assert!(extension_of("script.sh").is_err());
        assert!(extension_of("noextension").is_err());
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for("avatars/a.png"), "image/png");
        assert_eq!(content_type_for("avatars/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("avatars/a"), "application/octet-stream");
    }
}
