use axum::{
    async_trait,
    extract::{Form, FromRequest, Json, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// Provider callback body. PayU reaches `surl`/`furl` through a browser form
/// post, so urlencoded bodies are read as a form and anything else as JSON.
#[derive(Debug)]
pub struct CallbackBody<T>(pub T);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<S, T> FromRequest<S> for CallbackBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                AppError::invalid_data(format!("Invalid form body: {}", e.body_text()))
            })?;
            Ok(CallbackBody(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(CallbackBody(value))
        }
    }
}
