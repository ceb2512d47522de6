use crate::cache::CacheManager;
use crate::db::models::{
    CommentView, EventView, Task, TaskBrief, TaskDetail, WeeklyReport, format_task_time,
};
use crate::db::repositories::TaskRepo;
use crate::error::{AppError, AppResult, OrmResultExt};
use crate::orm::{self, Executor};
use crate::services::projects_service::ProjectsService;

/// 报表窗口长度：一周
pub const REPORT_WINDOW_SECS: i64 = 3600 * 24 * 7;

const USER_READ_FAILED: &str = "读取用户信息失败";
const PROJECT_READ_FAILED: &str = "读取项目信息失败";

pub struct TasksService;

impl TasksService {
    pub fn brief<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        task: &Task,
    ) -> AppResult<TaskBrief> {
        Ok(TaskBrief {
            id: task.id,
            name: task.name.clone(),
            proj: cache.find_project(conn, task.pid).or_fail(PROJECT_READ_FAILED)?,
            branch: task.branch,
            bring_top: task.bring_top,
            weight: task.weight,
            state: task.state,
            creator: cache.find_user(conn, task.creator).or_fail(USER_READ_FAILED)?,
            developer: cache.find_user(conn, task.developer).or_fail(USER_READ_FAILED)?,
            tester: cache.find_user(conn, task.tester).or_fail(USER_READ_FAILED)?,
            start_time: format_task_time(&task.start_time),
            end_time: format_task_time(&task.end_time),
        })
    }

    fn briefs<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        tasks: &[Task],
    ) -> AppResult<Vec<TaskBrief>> {
        tasks.iter().map(|task| Self::brief(conn, cache, task)).collect()
    }

    /// 我参与的未归档任务
    pub fn mine<E: Executor + ?Sized>(conn: &mut E, cache: &CacheManager, uid: i64) -> AppResult<Vec<TaskBrief>> {
        let tasks = TaskRepo::active_for_user(conn, uid).or_fail("读取数据库错误")?;
        Self::briefs(conn, cache, &tasks)
    }

    pub fn in_project<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
    ) -> AppResult<Vec<TaskBrief>> {
        let tasks = TaskRepo::active_in_project(conn, pid).or_fail("读取数据库错误")?;
        Self::briefs(conn, cache, &tasks)
    }

    pub fn detail<E: Executor + ?Sized>(conn: &mut E, cache: &CacheManager, id: i64) -> AppResult<TaskDetail> {
        let task: Task = orm::find(conn, id)
            .or_fail("任务不存在")?
            .ok_or_else(|| AppError::fail("任务不存在"))?;
        let proj = ProjectsService::info(conn, cache, task.pid)?
            .ok_or_else(|| AppError::fail("任务所属项目已被删除"))?;

        let mut comments = Vec::new();
        for comment in TaskRepo::comments(conn, id).or_fail("读取任务评论失败")? {
            let (user, avatar) = cache.find_user_info(conn, comment.uid).or_fail(USER_READ_FAILED)?;
            comments.push(CommentView {
                time: format_task_time(&comment.time),
                user,
                avatar,
                content: comment.comment,
            });
        }

        let mut events = Vec::new();
        for event in TaskRepo::events(conn, id).or_fail("读取任务动态失败")? {
            events.push(EventView {
                time: format_task_time(&event.time),
                operator: cache.find_user_info(conn, event.uid).or_fail(USER_READ_FAILED)?.0,
                event: event.event,
                extra: event.extra,
            });
        }

        let attachments = TaskRepo::attachments(conn, id).or_fail("读取任务附件失败")?;

        Ok(TaskDetail {
            id: task.id,
            name: task.name,
            proj,
            branch: task.branch,
            bring_top: task.bring_top,
            weight: task.weight,
            state: task.state,
            creator: cache.find_user(conn, task.creator).or_fail(USER_READ_FAILED)?,
            developer: cache.find_user(conn, task.developer).or_fail(USER_READ_FAILED)?,
            tester: cache.find_user(conn, task.tester).or_fail(USER_READ_FAILED)?,
            start_time: format_task_time(&task.start_time),
            end_time: format_task_time(&task.end_time),
            tags: task.tags,
            content: task.content,
            comments,
            events,
            attachments,
        })
    }

    /// 从 `from`（unix 秒）起一周内的归档任务，以及截止到窗口结束仍未归档的任务。
    pub fn weekly_report<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
        from: i64,
    ) -> AppResult<WeeklyReport> {
        let end = from.saturating_add(REPORT_WINDOW_SECS);
        let unarchived =
            TaskRepo::unarchived_due(conn, pid, end).or_fail("拉取该周内未归档任务列表出错")?;
        let archived =
            TaskRepo::archived_between(conn, pid, from, end).or_fail("拉取该周内归档任务列表出错")?;

        Ok(WeeklyReport {
            archived: Self::briefs(conn, cache, &archived)?,
            unarchived: Self::briefs(conn, cache, &unarchived)?,
        })
    }
}
