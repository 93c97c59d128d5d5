use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, status) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), StatusCode::OK)
    } else if err.find::<reject::MissingHeader>().is_some()
        || err.find::<reject::InvalidHeader>().is_some()
    {
        // A request without usable credentials is unauthenticated, not broken.
        (ApiErrorCode::Unauthenticated, StatusCode::OK)
    } else if err.find::<BodyDeserializeError>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
    {
        (ApiErrorCode::BadRequest, StatusCode::BAD_REQUEST)
    } else if err.is_not_found() || err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, StatusCode::NOT_FOUND)
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR)
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Unauthenticated, please re-authenticate")]
    Unauthenticated,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

// Expired, tampered and missing sessions all look the same from outside.
impl From<CredentialError> for ApiErrorCode {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Unauthenticated
            | CredentialError::RefreshTokenNotFound
            | CredentialError::CorruptSession => ApiErrorCode::Unauthenticated,
            CredentialError::Signing(e) => ApiErrorCode::internal(e),
            CredentialError::StoreRead(e) => ApiErrorCode::internal(e),
            CredentialError::StoreWrite(e) => ApiErrorCode::internal(e),
        }
    }
}
