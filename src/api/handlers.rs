//! Request Handlers
//!
//! Each handler validates its input, makes exactly one store call, and maps
//! the outcome to a status code:
//!
//! | Route                  | Store call        | Hit          | Miss |
//! |------------------------|-------------------|--------------|------|
//! | `GET /phones/{phone}`  | `get`             | 200 + record | 404  |
//! | `POST /phones`         | `set_if_absent`   | 201 + record | 409  |
//! | `PUT /phones/{phone}`  | `set_if_present`  | 200 + record | 404  |
//! | `DELETE /phones/{phone}` | `delete`        | 204          | 404  |
//!
//! Validation failures answer 422 without touching the store. Store errors
//! answer 503.

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::JsonBody;
use crate::api::models::{CreateRecord, PhoneRecord, UpdateRecord};
use crate::store::RecordStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub async fn get_phone<S: RecordStore>(
    State(store): State<Arc<S>>,
    Path(phone): Path<String>,
) -> ApiResult<Json<PhoneRecord>> {
    match store.get(&phone).await? {
        Some(address) => Ok(Json(PhoneRecord { phone, address })),
        None => {
            debug!(phone = %phone, "Lookup missed");
            Err(ApiError::NotFound("Phone not found"))
        }
    }
}

pub async fn create_phone<S: RecordStore>(
    State(store): State<Arc<S>>,
    JsonBody(body): JsonBody<CreateRecord>,
) -> ApiResult<(StatusCode, Json<PhoneRecord>)> {
    body.validate()?;

    if !store.set_if_absent(&body.phone, &body.address).await? {
        return Err(ApiError::Conflict);
    }

    info!(phone = %body.phone, "Record created");
    Ok((
        StatusCode::CREATED,
        Json(PhoneRecord {
            phone: body.phone,
            address: body.address,
        }),
    ))
}

pub async fn update_phone<S: RecordStore>(
    State(store): State<Arc<S>>,
    Path(phone): Path<String>,
    JsonBody(body): JsonBody<UpdateRecord>,
) -> ApiResult<Json<PhoneRecord>> {
    body.validate()?;

    if !store.set_if_present(&phone, &body.address).await? {
        return Err(ApiError::NotFound("Phone not found, update not possible."));
    }

    info!(phone = %phone, "Record updated");
    Ok(Json(PhoneRecord {
        phone,
        address: body.address,
    }))
}

pub async fn delete_phone<S: RecordStore>(
    State(store): State<Arc<S>>,
    Path(phone): Path<String>,
) -> ApiResult<StatusCode> {
    if store.delete(&phone).await? == 0 {
        return Err(ApiError::NotFound("Phone not found"));
    }

    info!(phone = %phone, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 200 when the backend answers, 503 otherwise.
pub async fn health<S: RecordStore>(State(store): State<Arc<S>>) -> ApiResult<Json<Value>> {
    store.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}
