use super::with_db;
use crate::AppState;
use crate::db::models::{ApiResponse, TaskBrief, TaskDetail};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{NewTask, RequestContext, TaskLifecycle, TasksService};
use crate::validation::FormValues;
use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

type Empty = AppResult<Json<ApiResponse<()>>>;

/// 在一个事务内对任务执行一次写操作。
macro_rules! lifecycle {
    ($state:expr, $uid:expr, |$engine:ident, $ctx:ident| $body:expr) => {{
        let $ctx = RequestContext::new($uid);
        $state
            .blocking(move |state| {
                state.with_task_store(|store, clock| {
                    let mut $engine = TaskLifecycle::new(store, clock);
                    $body
                })
            })
            .await?;
        Ok(Json(ApiResponse::ok()))
    }};
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    form: FormValues,
) -> Empty {
    // 附件需要 multipart 上传，这里不处理
    let task = NewTask {
        project: form.int("proj"),
        branch: form.int8("branch"),
        weight: form.int8("weight"),
        creator: form.int("creator"),
        developer: form.int("developer"),
        tester: form.int("tester"),
        name: form.string("name"),
        content: form.string("content"),
        start_time: form.date("startTime"),
        end_time: form.date("endTime"),
        tags: form.int_array("tags").into_iter().collect(),
        attachments: Vec::new(),
    };
    lifecycle!(state, uid, |engine, ctx| engine.create(&ctx, task).map(|_| ()))
}

pub async fn move_next(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
) -> Empty {
    lifecycle!(state, uid, |engine, ctx| engine.move_next(&ctx, id).map(|_| ()))
}

pub async fn move_back(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
) -> Empty {
    lifecycle!(state, uid, |engine, ctx| engine.move_back(&ctx, id).map(|_| ()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
) -> Empty {
    lifecycle!(state, uid, |engine, ctx| engine.delete(&ctx, id))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<TaskDetail>>> {
    let detail = with_db(&state, move |conn, state| TasksService::detail(conn, &state.cache, id)).await?;
    Ok(Json(ApiResponse::data(detail)))
}

pub async fn mine(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<TaskBrief>>>> {
    let tasks = with_db(&state, move |conn, state| TasksService::mine(conn, &state.cache, uid)).await?;
    Ok(Json(ApiResponse::data(tasks)))
}

pub async fn project(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<TaskBrief>>>> {
    let tasks =
        with_db(&state, move |conn, state| TasksService::in_project(conn, &state.cache, pid)).await?;
    Ok(Json(ApiResponse::data(tasks)))
}

pub async fn set_name(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let name = form.string("name");
    lifecycle!(state, uid, |engine, ctx| engine.set_name(&ctx, id, &name))
}

pub async fn set_creator(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let member = form.int("member");
    lifecycle!(state, uid, |engine, ctx| engine.set_creator(&ctx, id, member))
}

pub async fn set_developer(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let member = form.int("member");
    lifecycle!(state, uid, |engine, ctx| engine.set_developer(&ctx, id, member))
}

pub async fn set_tester(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let member = form.int("member");
    lifecycle!(state, uid, |engine, ctx| engine.set_tester(&ctx, id, member))
}

pub async fn set_weight(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let weight = form.int8("weight");
    lifecycle!(state, uid, |engine, ctx| engine.set_weight(&ctx, id, weight))
}

pub async fn set_time(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let (start, end) = (form.date("startTime"), form.date("endTime"));
    lifecycle!(state, uid, |engine, ctx| engine.set_time(&ctx, id, start, end))
}

pub async fn set_content(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let content = form.string("content");
    lifecycle!(state, uid, |engine, ctx| engine.set_content(&ctx, id, &content))
}

pub async fn comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(uid): CurrentUser,
    Path(id): Path<i64>,
    form: FormValues,
) -> Empty {
    let content = form.string("content");
    lifecycle!(state, uid, |engine, ctx| engine.comment(&ctx, id, &content))
}
