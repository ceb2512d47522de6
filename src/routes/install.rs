use crate::AppState;
use crate::db::models::ApiResponse;
use crate::error::AppResult;
use crate::services::{InstallService, InstallStatus};
use crate::validation::{
    ValidatedForm,
    auth::AdminForm,
    install::ConfigureForm,
};
use axum::{Json, extract::State};
use std::sync::Arc;

/// 开始配置数据库。建表在后台进行，客户端通过 `/install/status` 轮询进度。
pub async fn configure(
    State(state): State<Arc<AppState>>,
    ValidatedForm(form): ValidatedForm<ConfigureForm>,
) -> Json<ApiResponse<()>> {
    state.install.begin("连接数据库...");
    tracing::info!(port = form.port, host = %form.mysql_host, "Install started");

    let worker = Arc::clone(&state);
    let mysql = form.mysql();
    let port = form.port;
    tokio::task::spawn_blocking(move || InstallService::setup(&worker, port, mysql));

    Json(ApiResponse::ok())
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<InstallStatus>> {
    Json(ApiResponse::data(state.install.snapshot()))
}

pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    ValidatedForm(form): ValidatedForm<AdminForm>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .blocking(move |state| {
            InstallService::create_admin(state, &form.account, &form.name, &form.pswd)
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}
