/*!
Interoperation between the client and the service core.

(Not the application and the database; that's covered by `auth` and
`store`.)

Handlers parse what they need off the request, call into `registry` /
`school` / `auth`, and map the error taxonomy onto status codes:
`InvalidArgument` → 400, `NotFound` → 404, `AccessDenied` → 403,
`Unauthenticated` → 401, `Internal` → 500 with the detail logged but
not leaked.
*/
use axum::{
    http::{HeaderMap, StatusCode},
    Json,
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::auth::KeyStatus;
use crate::config::Glob;
use crate::error::Error;

pub mod auth;
pub mod schools;
pub mod students;

/// Data type to read the form data from a login request.
#[derive(serde::Deserialize, Debug)]
pub struct LoginData {
    pub uname: String,
    pub password: String,
}

/// The JSON envelope every failure answers with.
pub fn respond_with(code: StatusCode, message: &str) -> Response {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    (
        code,
        Json(json!({
            "timestamp": timestamp,
            "message": message,
            "status": code.as_u16(),
        })),
    ).into_response()
}

pub fn respond_bad_request(msg: String) -> Response {
    log::trace!("respond_bad_request( {:?} ) called.", &msg);

    respond_with(StatusCode::BAD_REQUEST, &msg)
}

pub fn respond_bad_password() -> Response {
    log::trace!("respond_bad_password() called.");

    respond_with(
        StatusCode::UNAUTHORIZED,
        "Invalid username/password combination."
    )
}

pub fn respond_error(e: &Error) -> Response {
    log::trace!("respond_error( {:?} ) called.", &e);

    match e {
        Error::InvalidArgument(msg) => respond_with(StatusCode::BAD_REQUEST, msg),
        Error::NotFound(msg) => respond_with(StatusCode::NOT_FOUND, msg),
        Error::AccessDenied(msg) => respond_with(StatusCode::FORBIDDEN, msg),
        Error::Unauthenticated => respond_with(
            StatusCode::UNAUTHORIZED,
            "Unauthenticated"
        ),
        Error::Internal(detail) => {
            log::error!("Internal error fielding request: {}", detail);
            respond_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error"
            )
        },
    }
}

/**
Pull the bearer key off the `Authorization` header, if there is one, and
swap it for the identity it was issued to.

`Ok(None)` means no credential was presented at all; what that amounts
to is the core's call (most operations answer `Unauthenticated`). A
credential that is present but unusable gets refused right here.
*/
pub async fn request_identity(
    glob: &Glob,
    headers: &HeaderMap,
) -> Result<Option<String>, Response> {
    let header = match headers.get("authorization") {
        Some(h) => h,
        None => { return Ok(None); },
    };

    let header = match header.to_str() {
        Ok(s) => s,
        Err(e) => {
            log::error!(
                "Failed converting Authorization header value to &str: {}",
                &e
            );
            return Err(respond_bad_request(
                "Authorization header unrecognizable.".to_owned()
            ));
        },
    };

    let key = match header.strip_prefix("Bearer ") {
        Some(k) => k,
        None => {
            return Err(respond_bad_request(
                "Authorization header must carry a bearer key.".to_owned()
            ));
        },
    };

    match glob.auth.check_key(key).await {
        Err(e) => {
            log::error!(
                "auth::Db::check_key( {:?} ) returned error: {}",
                key, e.display()
            );
            Err(respond_error(&Error::Internal(e.display().to_owned())))
        },
        Ok(KeyStatus::Valid(uname)) => Ok(Some(uname)),
        Ok(KeyStatus::Expired(uname)) => {
            log::warn!("Expired key presented for {:?}.", &uname);
            Err(respond_with(
                StatusCode::UNAUTHORIZED,
                "Authorization key expired."
            ))
        },
        Ok(KeyStatus::Invalid) => Err(respond_with(
            StatusCode::UNAUTHORIZED,
            "Invalid authorization key."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (Error::InvalidArgument("x".to_owned()), StatusCode::BAD_REQUEST),
            (Error::NotFound("x".to_owned()), StatusCode::NOT_FOUND),
            (Error::AccessDenied("x".to_owned()), StatusCode::FORBIDDEN),
            (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
            (Error::Internal("boom".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (e, code) in cases.iter() {
            assert_eq!(respond_error(e).status(), *code);
        }
    }
}
