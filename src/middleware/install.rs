use crate::AppState;
use crate::db::models::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// 系统尚未安装时拒绝访问。
pub async fn must_installed(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    if state.is_installed() {
        next.run(request).await
    } else {
        Json(ApiResponse::error("系统尚未初始化")).into_response()
    }
}

/// 系统已安装后拒绝再次安装。
pub async fn must_not_installed(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    if state.is_installed() {
        Json(ApiResponse::error("系统已经初始化完成")).into_response()
    } else {
        next.run(request).await
    }
}
