use axum::extract::{FromRequest, Request};
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};

use crate::error::AppError;

/// A `TypedMultipart<T>` wrapper that converts form parsing errors into
/// `AppError::Validation`, so clients always receive structured JSON errors.
pub struct AppMultipart<T>(pub T);

impl<S, T> FromRequest<S> for AppMultipart<T>
where
    TypedMultipart<T>: FromRequest<S, Rejection = TypedMultipartError>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let TypedMultipart(value) = TypedMultipart::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(AppMultipart(value))
    }
}
