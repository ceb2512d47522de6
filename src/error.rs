use crate::db::models::api::ApiResponse;
use crate::orm::OrmError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

/// 任务状态机的非法迁移
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("任务无下一步流程")]
    NoNextStep,

    #[error("任务不可回退了")]
    NotRetractable,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad parameter: {0}")]
    BadParam(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    StateMachine(#[from] TransitionError),

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: OrmError,
    },

    /// 处理器主动中止，消息原样返回给客户端
    #[error("{0}")]
    Fail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<OrmError> for AppError {
    fn from(err: OrmError) -> Self {
        match err {
            OrmError::NotFound => AppError::NotFound("记录不存在".to_string()),
            OrmError::BadParam(message) => AppError::BadParam(message),
            OrmError::UnsupportedType(message) => AppError::UnsupportedType(message),
            source => AppError::Storage {
                message: "数据库操作失败".to_string(),
                source,
            },
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        OrmError::from(err).into()
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password processing error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadParam(message) => (StatusCode::OK, message),
            AppError::NotFound(message) => (StatusCode::OK, message),
            AppError::UnsupportedType(ref e) => {
                tracing::error!("Unsupported type: {}", e);
                (StatusCode::OK, "服务器内部错误".to_string())
            }
            AppError::AuthRequired => (StatusCode::UNAUTHORIZED, "请先登录后操作".to_string()),
            AppError::Forbidden(ref reason) => {
                tracing::warn!("Forbidden: {}", reason);
                (StatusCode::OK, "权限不足".to_string())
            }
            AppError::StateMachine(e) => (StatusCode::OK, e.to_string()),
            AppError::Storage { message, source } => {
                tracing::error!("Storage error: {} ({})", message, source);
                (StatusCode::OK, message)
            }
            AppError::Fail(message) => (StatusCode::OK, message),
            AppError::Config(ref e) => {
                tracing::error!("Configuration error: {}", e);
                (StatusCode::OK, "服务器配置错误".to_string())
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::OK, "服务器内部错误".to_string())
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// 便捷的错误创建函数
impl AppError {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn bad_param(message: impl Into<String>) -> Self {
        Self::BadParam(message.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// 条件不成立时以 `message` 中止当前请求。
pub fn ensure(condition: bool, message: &str) -> AppResult<()> {
    if condition {
        Ok(())
    } else {
        Err(AppError::fail(message))
    }
}

/// 把底层 ORM 错误包装成面向用户的简短消息。
pub trait OrmResultExt<T> {
    fn or_fail(self, message: &str) -> AppResult<T>;
}

impl<T> OrmResultExt<T> for Result<T, OrmError> {
    fn or_fail(self, message: &str) -> AppResult<T> {
        self.map_err(|source| match source {
            OrmError::NotFound => AppError::fail(message),
            source => AppError::Storage {
                message: message.to_string(),
                source,
            },
        })
    }
}
