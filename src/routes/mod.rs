pub mod auth;
pub mod index;
pub mod install;
pub mod notices;
pub mod projects;
pub mod tasks;
pub mod users;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::{
    auto_login, logger::logger, must_installed, must_login, must_not_installed, session_middleware,
};
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};
use diesel::mysql::MysqlConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// 取一个数据库连接，在阻塞线程池中执行 `f`。
pub(crate) async fn with_db<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut MysqlConnection, &AppState) -> AppResult<T> + Send + 'static,
{
    state
        .blocking(move |state| state.db.with_conn(|conn| f(conn, state)))
        .await
}

fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(users::profile))
        .route("/user/pswd", patch(users::change_password))
        .route("/task", post(tasks::create))
        .route("/task/mine", get(tasks::mine))
        .route("/task/project/:id", get(tasks::project))
        .route("/task/:id", get(tasks::detail).delete(tasks::delete))
        .route("/task/:id/next", post(tasks::move_next))
        .route("/task/:id/back", post(tasks::move_back))
        .route("/task/:id/comment", post(tasks::comment))
        .route("/task/:id/name", patch(tasks::set_name))
        .route("/task/:id/creator", patch(tasks::set_creator))
        .route("/task/:id/developer", patch(tasks::set_developer))
        .route("/task/:id/tester", patch(tasks::set_tester))
        .route("/task/:id/weight", patch(tasks::set_weight))
        .route("/task/:id/time", patch(tasks::set_time))
        .route("/task/:id/content", patch(tasks::set_content))
        .route("/project/mine", get(projects::mine))
        .route("/project/:id", get(projects::info))
        .route("/project/:id/branch", post(projects::add_branch))
        .route("/project/:id/invites", get(projects::invites))
        .route("/project/:id/member", post(projects::add_member))
        .route(
            "/project/:id/member/:uid",
            put(projects::edit_member).delete(projects::delete_member),
        )
        .route("/project/:id/report/:from", get(projects::report))
        .route("/notice/list", get(notices::list))
        .route("/notice/all", delete(notices::delete_all))
        .route("/notice/:id", delete(notices::delete_one))
        // 最后添加的最先执行：已安装 -> 自动登录 -> 必须登录
        .route_layer(from_fn(must_login))
        .route_layer(from_fn_with_state(state.clone(), auto_login))
        .route_layer(from_fn_with_state(state.clone(), must_installed))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let install_routes = Router::new()
        .route("/configure", post(install::configure))
        .route("/status", get(install::status))
        .route("/admin", post(install::create_admin))
        .route_layer(from_fn_with_state(state.clone(), must_not_installed));

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route_layer(from_fn_with_state(state.clone(), must_installed));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index::index))
        .nest("/install", install_routes)
        .nest("/api", api_routes(&state))
        .merge(auth_routes)
        .layer(cors)
        .layer(from_fn(logger))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
}
