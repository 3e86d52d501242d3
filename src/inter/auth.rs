/*!
Handlers for the authentication surface: login and the two registration
endpoints.
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::{self, AuthResult};
use crate::config::Glob;
use crate::error::Error;
use crate::registry::{self, StudentRequest};
use super::*;

pub async fn login(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    let form: LoginData = match serde_json::from_str(&body) {
        Ok(form) => form,
        Err(e) => {
            log::error!("Error deserializing JSON as LoginData: {}", &e);
            return respond_bad_request(
                "Unable to deserialize login request.".to_owned()
            );
        },
    };

    if form.uname.trim().is_empty() {
        return respond_bad_request("Username is required".to_owned());
    }
    if form.password.trim().is_empty() {
        return respond_bad_request("Password is required".to_owned());
    }
    log::info!("Login attempt for {:?}.", &form.uname);

    let auth_response = auth::check_password(
        &glob.store,
        &glob.hasher,
        &form.uname,
        &form.password,
    ).await;

    let student = match auth_response {
        Err(e) => {
            log::error!(
                "Error checking password for {:?}: {}",
                &form.uname, e.display()
            );
            return respond_error(&Error::Internal(e.display().to_owned()));
        },
        Ok(AuthResult::Valid(stud)) => stud,
        Ok(AuthResult::BadPassword) => { return respond_bad_password(); },
        Ok(AuthResult::NoSuchUser) => {
            // Same answer as a bad password; the difference is only
            // worth a log line.
            log::warn!("Login attempt for unknown user {:?}.", &form.uname);
            return respond_bad_password();
        },
    };

    match glob.auth.issue_key(&student.email).await {
        Err(e) => {
            log::error!(
                "Error issuing key for {:?}: {}",
                &student.email, e.display()
            );
            respond_error(&Error::Internal(e.display().to_owned()))
        },
        Ok(key) => {
            log::info!("Login success for {:?}.", &student.email);
            (
                StatusCode::OK,
                Json(json!({ "token": key, "tokenType": "Bearer" })),
            ).into_response()
        },
    }
}

/// Open registration. Whatever role the body claims is discarded; this
/// path only ever makes USERs.
pub async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    let mut request: StudentRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Error deserializing JSON as StudentRequest: {}", &e);
            return respond_bad_request(
                "Unable to deserialize registration request.".to_owned()
            );
        },
    };
    request.role = None;

    match registry::add_student(&glob.store, &glob.hasher, &request).await {
        Ok(stud) => (StatusCode::OK, Json(stud)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn register_admin(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ident = match request_identity(&glob, &headers).await {
        Ok(ident) => ident,
        Err(resp) => { return resp; },
    };

    let request: StudentRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Error deserializing JSON as StudentRequest: {}", &e);
            return respond_bad_request(
                "Unable to deserialize registration request.".to_owned()
            );
        },
    };

    match registry::add_admin(
        &glob.store,
        &glob.hasher,
        ident.as_deref(),
        &request,
    ).await {
        Ok(stud) => (StatusCode::OK, Json(stud)).into_response(),
        Err(e) => respond_error(&e),
    }
}
