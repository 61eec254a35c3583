use decentral_store::{ErrorKind, StoreError};
use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

/// A store failure rendered as a JSON body with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self.0.kind() {
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Unauthorized => Status::Forbidden,
            ErrorKind::StorageFailure | ErrorKind::AnchorRejected => Status::BadGateway,
            ErrorKind::AnchorTimeout => Status::GatewayTimeout,
            ErrorKind::IndexConflict => Status::Conflict,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!(uri = %request.uri(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        status::Custom(status, Json(body)).respond_to(request)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
