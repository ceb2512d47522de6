pub mod auth;
pub mod form;
pub mod install;
pub mod task;

pub use form::FormValues;

use axum::{
    Form, async_trait,
    body::Body,
    extract::FromRequest,
    http::Request,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// 经过校验的表单提取器，校验失败时返回第一条错误消息。
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S, Body> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Form rejected: {}", e);
            AppError::bad_param("参数错误")
        })?;

        value.validate().map_err(first_error)?;
        Ok(ValidatedForm(value))
    }
}

/// 按字段名排序后取第一条消息，保证同样的输入得到同样的提示。
pub fn first_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let message = fields
        .into_iter()
        .flat_map(|(_, errors)| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "参数错误".to_string());
    AppError::fail(message)
}
