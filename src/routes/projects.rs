use super::with_db;
use crate::AppState;
use crate::db::models::{ApiResponse, ProjectInfo, User, WeeklyReport};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{ProjectsService, TasksService};
use crate::validation::FormValues;
use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

pub async fn info(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i64>,
) -> AppResult<Json<ApiResponse<Option<ProjectInfo>>>> {
    let info = with_db(&state, move |conn, state| ProjectsService::info(conn, &state.cache, pid)).await?;
    Ok(Json(ApiResponse::data(info)))
}

pub async fn mine(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<ProjectInfo>>>> {
    let projects =
        with_db(&state, move |conn, state| ProjectsService::mine(conn, &state.cache, uid)).await?;
    Ok(Json(ApiResponse::data(projects)))
}

pub async fn add_branch(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i64>,
    form: FormValues,
) -> AppResult<Json<ApiResponse<()>>> {
    let branch = form.string("branch");
    with_db(&state, move |conn, state| {
        ProjectsService::add_branch(conn, &state.cache, pid, &branch)
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn invites(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = with_db(&state, move |conn, state| ProjectsService::invites(conn, &state.cache, pid)).await?;
    Ok(Json(ApiResponse::data(users)))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i64>,
    form: FormValues,
) -> AppResult<Json<ApiResponse<()>>> {
    let (uid, role, is_admin) = (form.int("uid"), form.int8("role"), form.flag("isAdmin"));
    with_db(&state, move |conn, state| {
        ProjectsService::add_member(conn, &state.cache, pid, uid, role, is_admin)
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn edit_member(
    State(state): State<Arc<AppState>>,
    Path((pid, uid)): Path<(i64, i64)>,
    form: FormValues,
) -> AppResult<Json<ApiResponse<()>>> {
    let (role, is_admin) = (form.int8("role"), form.flag("isAdmin"));
    with_db(&state, move |conn, state| {
        ProjectsService::edit_member(conn, &state.cache, pid, uid, role, is_admin)
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path((pid, uid)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    with_db(&state, move |conn, state| {
        ProjectsService::delete_member(conn, &state.cache, pid, uid)
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}

/// 周报：`from` 为窗口起点（unix 秒）。
pub async fn report(
    State(state): State<Arc<AppState>>,
    Path((pid, from)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<WeeklyReport>>> {
    let report = with_db(&state, move |conn, state| {
        TasksService::weekly_report(conn, &state.cache, pid, from)
    })
    .await?;
    Ok(Json(ApiResponse::data(report)))
}
