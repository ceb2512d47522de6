use super::with_db;
use crate::AppState;
use crate::db::models::{ApiResponse, NoticeView};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NoticesService;
use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<NoticeView>>>> {
    let notices = with_db(&state, move |conn, state| NoticesService::list(conn, &state.cache, uid)).await?;
    Ok(Json(ApiResponse::data(notices)))
}

pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    with_db(&state, move |conn, _| NoticesService::delete_one(conn, id)).await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
) -> AppResult<Json<ApiResponse<()>>> {
    with_db(&state, move |conn, _| NoticesService::delete_all(conn, uid)).await?;
    Ok(Json(ApiResponse::ok()))
}
