/*!
Handlers for the school directory surface.
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    Json,
    response::{IntoResponse, Response},
};

use crate::config::Glob;
use crate::school;
use super::*;

#[derive(serde::Deserialize, Debug)]
pub struct SchoolData {
    pub name: Option<String>,
}

pub async fn list_schools(
    Extension(glob): Extension<Arc<Glob>>,
) -> Response {
    log::trace!("list_schools() called.");

    match school::list_all(&glob.store).await {
        Ok(schools) => (StatusCode::OK, Json(schools)).into_response(),
        Err(e) => respond_error(&e),
    }
}

pub async fn create_school(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    let data: SchoolData = match serde_json::from_str(&body) {
        Ok(data) => data,
        Err(e) => {
            log::error!("Error deserializing JSON as SchoolData: {}", &e);
            return respond_bad_request(
                "Unable to deserialize school request.".to_owned()
            );
        },
    };

    // A missing name falls through to the blank-name validation.
    let name = data.name.unwrap_or_default();
    match school::get_or_create(&glob.store, &name).await {
        Ok(school) => (StatusCode::OK, Json(school)).into_response(),
        Err(e) => respond_error(&e),
    }
}
