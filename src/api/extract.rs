//! Request body extraction.

use crate::api::error::ApiError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use axum::Json;
use serde::de::DeserializeOwned;

/// A JSON request body.
///
/// Same as [`Json`], except that a request without a `Content-Type` header
/// is still parsed as JSON. A request that names some other content type is
/// rejected.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if req.headers().contains_key(header::CONTENT_TYPE) {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            return Ok(JsonBody(value));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(JsonBody(value))
    }
}
