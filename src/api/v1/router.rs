use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let issue = warp::post()
        .and(warp::path("issue"))
        .and(warp::path::end())
        .and(with_service_key(server.issue_key.clone()))
        .and(warp::body::json())
        .and(with(server.role_directory.clone()))
        .and(with(server.credential_service.clone()))
        .and_then(handler::issue);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.credential_service.clone()))
        .and_then(handler::refresh);

    let validate = warp::post()
        .and(warp::path("validate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.credential_service.clone()))
        .and_then(handler::validate);

    let sign_out = warp::post()
        .and(warp::path("sign_out"))
        .and(warp::path::end())
        .and(with_verification(server.credential_service.clone()))
        .and(with(server.credential_service.clone()))
        .and_then(handler::sign_out);

    let whoami = warp::get()
        .and(warp::path("whoami"))
        .and(warp::path::end())
        .and(with_verification(server.credential_service.clone()))
        .and_then(handler::whoami);

    issue.or(refresh).or(validate).or(sign_out).or(whoami)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

pub const SERVICE_KEY_HEADER: &str = "x-service-key";

fn with_service_key(
    expected: Option<String>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(SERVICE_KEY_HEADER)
        .and_then(move |presented: Option<String>| {
            let expected = expected.clone();
            async move {
                match (expected, presented) {
                    (Some(expected), Some(presented)) if expected == presented => Ok(()),
                    _ => Err(reject::custom(ApiErrorCode::Unauthenticated)),
                }
            }
        })
        .untuple_one()
}

fn with_verification(
    credential_service: Arc<dyn CredentialService>,
) -> impl Filter<Extract = (ValidatedPrincipal,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let credential_service = credential_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let principal = credential_service
                    .validate_token(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(principal)
            } else {
                Err(reject::custom(ApiErrorCode::Unauthenticated))
            }
        }
    })
}
