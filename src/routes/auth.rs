use crate::AppState;
use crate::db::models::ApiResponse;
use crate::error::AppResult;
use crate::middleware::{AutoLoginService, CurrentSession, HttpContext};
use crate::services::AuthService;
use crate::session::{SESSION_UID_KEY, SessionContext};
use crate::validation::{ValidatedForm, auth::LoginForm};
use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    mut ctx: HttpContext,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> AppResult<impl IntoResponse> {
    let ip = ctx.ip().to_string();
    let remember = form.remember();

    let (uid, cookie) = super::with_db(&state, move |conn, state| {
        let settings = state.config.password();
        let user = AuthService::login(conn, &state.cache, &settings, &form.account, &form.password)?;
        let uid = user.id;
        if !remember {
            return Ok((uid, None));
        }

        // 记住登录失败不影响本次登录
        match AuthService::remember(conn, &state.cache, &state.auto_login, user, &ip, state.now()) {
            Ok(cookie) => Ok((uid, Some(cookie))),
            Err(e) => {
                tracing::warn!(user_id = uid, "Failed to issue auto login token: {}", e);
                Ok((uid, None))
            }
        }
    })
    .await?;

    session.set(SESSION_UID_KEY, uid);
    if let Some(cookie) = cookie {
        ctx.set_cookie(cookie);
    }
    Ok((ctx.into_jar(), Json(ApiResponse::ok())))
}

pub async fn logout(State(state): State<Arc<AppState>>, mut ctx: HttpContext) -> impl IntoResponse {
    state.sessions.end(&mut ctx);
    ctx.set_cookie(AutoLoginService::clear_cookie());
    (ctx.into_jar(), Json(ApiResponse::ok()))
}
