use super::with_db;
use crate::AppState;
use crate::db::models::{ApiResponse, User};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{AuthService, RequestContext};
use crate::validation::{ValidatedForm, auth::ChangePasswordForm};
use axum::{Json, extract::State};
use std::sync::Arc;

pub async fn profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let ctx = RequestContext::new(uid);
    let user = with_db(&state, move |conn, state| AuthService::profile(conn, &state.cache, &ctx)).await?;
    Ok(Json(ApiResponse::data(user)))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    ValidatedForm(form): ValidatedForm<ChangePasswordForm>,
) -> AppResult<Json<ApiResponse<()>>> {
    let ctx = RequestContext::new(uid);
    with_db(&state, move |conn, state| {
        AuthService::change_password(
            conn,
            &state.cache,
            &state.config.password(),
            &ctx,
            &form.old_pswd,
            &form.new_pswd,
            &form.cfm_pswd,
        )
    })
    .await?;
    Ok(Json(ApiResponse::ok()))
}
