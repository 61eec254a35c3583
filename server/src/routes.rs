use decentral_store::{CreatedFile, FileId, OnChainRef, ProvenanceView, StoreError};
use rocket::data::Data;
use rocket::http::{ContentType, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, Responder, State};

use crate::error::ApiResult;
use crate::AppState;

#[get("/health")]
pub fn health() -> &'static str {
    "ok"
}

#[derive(Responder)]
pub enum UploadResponse {
    Stored(status::Custom<Json<CreatedFile>>),
    #[response(status = 413)]
    TooLarge(String),
}

#[post("/files?<name>&<owner>", data = "<data>")]
pub async fn upload(
    state: &State<AppState>,
    name: &str,
    owner: Option<&str>,
    data: Data<'_>,
) -> ApiResult<UploadResponse> {
    let body = data
        .open(state.max_upload)
        .into_bytes()
        .await
        .map_err(|e| StoreError::StorageFailure(format!("failed to read upload: {}", e)))?;
    if !body.is_complete() {
        return Ok(UploadResponse::TooLarge(format!("upload exceeds {}", state.max_upload)));
    }

    let outcome = state
        .service
        .create(&state.anchor_context(), name, owner.unwrap_or("anonymous"), &body.value[..])
        .await?;
    let status = if outcome.is_anchored() {
        Status::Created
    } else {
        Status::Accepted
    };
    Ok(UploadResponse::Stored(status::Custom(status, Json(CreatedFile::from(&outcome)))))
}

#[get("/files")]
pub async fn list(state: &State<AppState>) -> ApiResult<Json<Vec<ProvenanceView>>> {
    Ok(Json(state.service.list().await?))
}

#[get("/files/<id>?<token>")]
pub async fn download(state: &State<AppState>, id: &str, token: Option<&str>) -> ApiResult<(ContentType, Vec<u8>)> {
    let id = FileId::parse(id)?;
    let download = state.service.read(&id, require_token(token, &id)?).await?;
    let content_type = ContentType::parse_flexible(download.content_type.as_str()).unwrap_or(ContentType::Binary);
    Ok((content_type, download.data))
}

#[delete("/files/<id>?<token>")]
pub async fn remove(state: &State<AppState>, id: &str, token: Option<&str>) -> ApiResult<Json<OnChainRef>> {
    let id = FileId::parse(id)?;
    let reference = state
        .service
        .delete(&state.anchor_context(), &id, require_token(token, &id)?)
        .await?;
    Ok(Json(reference))
}

#[get("/files/<id>/provenance")]
pub async fn provenance(state: &State<AppState>, id: &str) -> ApiResult<Json<ProvenanceView>> {
    let id = FileId::parse(id)?;
    Ok(Json(state.service.provenance(&id).await?))
}

fn require_token<'a>(token: Option<&'a str>, id: &FileId) -> Result<&'a str, StoreError> {
    token.ok_or_else(|| StoreError::Unauthorized(format!("missing token for {}", id)))
}
