use super::error::*;
use crate::application_port::*;
use crate::domain_model::PrincipalId;
use crate::domain_port::RoleDirectory;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    /// Identity already resolved by the caller.
    pub identity: String,
}

pub async fn issue(
    body: IssueRequest,
    role_directory: Arc<dyn RoleDirectory>,
    credential_service: Arc<dyn CredentialService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let principal_id = body
        .identity
        .parse::<PrincipalId>()
        .map_err(|_| reject::custom(ApiErrorCode::BadRequest))?;
    let role = role_directory.role_for(principal_id.as_str());

    let credentials = credential_service
        .get_credentials(&principal_id, role)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    info!(%principal_id, %role, "credentials handed out via api");
    Ok(warp::reply::json(&ApiResponse::ok(credentials)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    credential_service: Arc<dyn CredentialService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let credentials = credential_service
        .refresh_token(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(credentials)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub access_token: String,
}

pub async fn validate(
    body: ValidateRequest,
    credential_service: Arc<dyn CredentialService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let principal = credential_service
        .validate_token(&body.access_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(principal)))
}

pub async fn sign_out(
    principal: ValidatedPrincipal,
    credential_service: Arc<dyn CredentialService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    credential_service
        .sign_out(&principal.principal_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    debug!(principal_id = %principal.principal_id, "sign out via api");
    Ok(warp::reply::json(&ApiResponse::ok(())))
}

pub async fn whoami(principal: ValidatedPrincipal) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(principal)))
}
