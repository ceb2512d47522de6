use serde::Serialize;

/// 统一响应结构：`{}`、`{"data": ..}` 或 `{"err": ..}`，HTTP 状态码始终为 200。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            data: None,
            err: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            err: Some(message.into()),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            err: None,
        }
    }
}
