/*!
Handlers for the student CRUD surface.
*/
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    Json,
    response::{IntoResponse, Response},
};

use crate::config::Glob;
use crate::registry::{self, StudentRequest};
use super::*;

/// `POST /students`. Unlike the `/auth/register` path, this one honors
/// a role named in the body, and performs no principal check.
pub async fn add_student(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    let request: StudentRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Error deserializing JSON as StudentRequest: {}", &e);
            return respond_bad_request(
                "Unable to deserialize student request.".to_owned()
            );
        },
    };

    match registry::add_student(&glob.store, &glob.hasher, &request).await {
        Ok(stud) => (StatusCode::OK, Json(stud)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn get_all_students(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
) -> Response {
    let ident = match request_identity(&glob, &headers).await {
        Ok(ident) => ident,
        Err(resp) => { return resp; },
    };

    match registry::get_all_students(&glob.store, ident.as_deref()).await {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn get_student(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let ident = match request_identity(&glob, &headers).await {
        Ok(ident) => ident,
        Err(resp) => { return resp; },
    };

    match registry::get_student_by_id(&glob.store, ident.as_deref(), id).await {
        Ok(stud) => (StatusCode::OK, Json(stud)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn update_student(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
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
                "Unable to deserialize student request.".to_owned()
            );
        },
    };

    match registry::update_student(
        &glob.store,
        &glob.hasher,
        ident.as_deref(),
        id,
        &request,
    ).await {
        Ok(stud) => (StatusCode::OK, Json(stud)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn delete_student(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let ident = match request_identity(&glob, &headers).await {
        Ok(ident) => ident,
        Err(resp) => { return resp; },
    };

    match registry::delete_student(&glob.store, ident.as_deref(), id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => respond_error(&e),
    }
}
