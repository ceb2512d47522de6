//! 任务状态机与字段修改。
//!
//! 每个操作只取一次当前时间，按“读取任务、检查权限、写任务、写动态、发通知”的
//! 顺序执行；检查失败时不会写入任何数据。

use crate::db::enums::{TaskEventKind, TaskState};
use crate::db::models::{
    Notice, Task, TaskAttachment, TaskComment, TaskEvent, format_task_time, task_time_infinite,
};
use crate::error::{AppError, AppResult, OrmResultExt, TransitionError, ensure};
use crate::services::context::RequestContext;
use crate::services::task_store::TaskStore;
use crate::validation::task::{validate_create_task, validate_task_name, validate_time_range};
use chrono::NaiveDateTime;
use mockable::Clock;
use std::collections::BTreeSet;

const TASK_MISSING: &str = "任务不存在或已被删除";

/// 新建任务的参数。`creator` 为 0 时使用操作者。
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project: i64,
    pub branch: i8,
    pub weight: i8,
    pub creator: i64,
    pub developer: i64,
    pub tester: i64,
    pub name: String,
    pub content: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub tags: BTreeSet<i64>,
    /// (文件名, 路径)
    pub attachments: Vec<(String, String)>,
}

pub struct TaskLifecycle<'a, S: TaskStore + ?Sized, C: Clock + ?Sized> {
    store: &'a mut S,
    clock: &'a C,
}

impl<'a, S, C> TaskLifecycle<'a, S, C>
where
    S: TaskStore + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(store: &'a mut S, clock: &'a C) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.local().naive_local()
    }

    fn load(&mut self, id: i64) -> AppResult<Task> {
        self.store
            .find_task(id)
            .or_fail(TASK_MISSING)?
            .ok_or_else(|| AppError::fail(TASK_MISSING))
    }

    /// 默认操作者之外，项目管理员也可以执行。
    fn authorize(&mut self, task: &Task, operator: i64, allowed: bool, reason: &str) -> AppResult<()> {
        if allowed {
            return Ok(());
        }
        if self
            .store
            .is_project_admin(task.pid, operator)
            .or_fail("读取项目成员失败")?
        {
            return Ok(());
        }
        Err(AppError::forbidden(format!(
            "{} (task {}, user {})",
            reason, task.id, operator
        )))
    }

    fn display_name(&mut self, uid: i64) -> AppResult<String> {
        Ok(self
            .store
            .find_user(uid)
            .or_fail("读取用户信息失败")?
            .map(|user| user.name.clone())
            .unwrap_or_else(|| crate::cache::UNKNOWN_USER.to_string()))
    }

    /// 写入一条动态，并通知除操作者以外的相关成员（同一人只通知一次）。
    fn publish(
        &mut self,
        task: &Task,
        operator: i64,
        kind: TaskEventKind,
        extra: String,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        self.store
            .append_event(&TaskEvent {
                id: 0,
                tid: task.id,
                uid: operator,
                event: kind.code(),
                time: now,
                extra,
            })
            .or_fail("写入任务动态失败")?;

        for recipient in task.participants().into_iter().filter(|uid| *uid != operator) {
            self.store
                .push_notice(&Notice {
                    id: 0,
                    time: now,
                    uid: recipient,
                    tid: task.id,
                    tname: task.name.clone(),
                    operator,
                    event: kind.code(),
                })
                .or_fail("写入通知失败")?;
        }
        Ok(())
    }

    fn save(&mut self, task: &Task) -> AppResult<()> {
        self.store.update_task(task).or_fail("修改任务失败")
    }

    pub fn create(&mut self, ctx: &RequestContext, req: NewTask) -> AppResult<i64> {
        validate_create_task(&req.name, &req.content, req.developer, req.tester)?;
        validate_time_range(&req.start_time, &req.end_time)?;

        let now = self.now();
        let operator = ctx.user_id;
        let bring_top = self
            .store
            .find_user(operator)
            .or_fail("读取用户信息失败")?
            .is_some_and(|user| user.is_su);

        let mut task = Task {
            id: 0,
            pid: req.project,
            branch: req.branch,
            creator: if req.creator > 0 { req.creator } else { operator },
            developer: req.developer,
            tester: req.tester,
            name: req.name,
            bring_top,
            weight: req.weight,
            state: TaskState::Planned.code(),
            start_time: req.start_time,
            end_time: req.end_time,
            archive_time: task_time_infinite(),
            tags: req.tags,
            content: req.content,
        };
        task.id = self.store.insert_task(&task).or_fail("写入任务信息失败")?;

        for (name, path) in req.attachments {
            self.store
                .insert_attachment(&TaskAttachment {
                    id: 0,
                    tid: task.id,
                    name,
                    path,
                })
                .or_fail("写入任务附件失败")?;
        }

        self.publish(&task, operator, TaskEventKind::Create, String::new(), now)?;
        tracing::info!(task_id = task.id, project_id = task.pid, operator, "Task created");
        Ok(task.id)
    }

    /// 推进到下一阶段，返回新状态。
    pub fn move_next(&mut self, ctx: &RequestContext, id: i64) -> AppResult<TaskState> {
        let now = self.now();
        let operator = ctx.user_id;
        let mut task = self.load(id)?;
        let state = TaskState::try_from(task.state).map_err(AppError::internal)?;

        let (allowed, kind) = match state {
            TaskState::Planned => (task.developer == operator, TaskEventKind::Underway),
            TaskState::UnderDevelopment => (task.developer == operator, TaskEventKind::Testing),
            TaskState::UnderTest => (task.tester == operator, TaskEventKind::Finished),
            TaskState::Finished => (task.creator == operator, TaskEventKind::Archived),
            TaskState::Archived => return Err(TransitionError::NoNextStep.into()),
        };
        self.authorize(&task, operator, allowed, "您无权修改该任务")?;

        let next = state.next().ok_or(TransitionError::NoNextStep)?;
        task.state = next.code();
        if next == TaskState::Archived {
            task.archive_time = now;
        }
        self.save(&task)?;
        self.publish(&task, operator, kind, String::new(), now)?;

        tracing::info!(task_id = id, from = %state, to = %next, operator, "Task moved forward");
        Ok(next)
    }

    /// 回退到上一阶段，返回新状态。
    pub fn move_back(&mut self, ctx: &RequestContext, id: i64) -> AppResult<TaskState> {
        let now = self.now();
        let operator = ctx.user_id;
        let mut task = self.load(id)?;
        let state = TaskState::try_from(task.state).map_err(AppError::internal)?;

        let allowed = match state {
            TaskState::Planned => return Err(TransitionError::NotRetractable.into()),
            TaskState::UnderDevelopment => task.developer == operator,
            TaskState::UnderTest => task.tester == operator || task.developer == operator,
            TaskState::Finished => task.creator == operator || task.tester == operator,
            TaskState::Archived => task.creator == operator,
        };
        self.authorize(&task, operator, allowed, "你无权回退该任务")?;

        let previous = state.previous().ok_or(TransitionError::NotRetractable)?;
        task.state = previous.code();
        if state == TaskState::Archived {
            task.archive_time = task_time_infinite();
        }
        self.save(&task)?;
        self.publish(&task, operator, TaskEventKind::MoveBack, String::new(), now)?;

        tracing::info!(task_id = id, from = %state, to = %previous, operator, "Task moved back");
        Ok(previous)
    }

    pub fn set_name(&mut self, ctx: &RequestContext, id: i64, name: &str) -> AppResult<()> {
        validate_task_name(name)?;
        let now = self.now();
        let mut task = self.load(id)?;
        let old = std::mem::replace(&mut task.name, name.to_string());
        self.save(&task)?;
        self.publish(&task, ctx.user_id, TaskEventKind::Rename, old, now)
    }

    pub fn set_creator(&mut self, ctx: &RequestContext, id: i64, member: i64) -> AppResult<()> {
        self.reassign(ctx, id, member, TaskEventKind::ModCreator)
    }

    pub fn set_developer(&mut self, ctx: &RequestContext, id: i64, member: i64) -> AppResult<()> {
        self.reassign(ctx, id, member, TaskEventKind::ModDeveloper)
    }

    pub fn set_tester(&mut self, ctx: &RequestContext, id: i64, member: i64) -> AppResult<()> {
        self.reassign(ctx, id, member, TaskEventKind::ModTester)
    }

    fn reassign(
        &mut self,
        ctx: &RequestContext,
        id: i64,
        member: i64,
        kind: TaskEventKind,
    ) -> AppResult<()> {
        ensure(member > 0, "无效的成员ID")?;
        let now = self.now();
        let mut task = self.load(id)?;
        let slot = match kind {
            TaskEventKind::ModCreator => &mut task.creator,
            TaskEventKind::ModDeveloper => &mut task.developer,
            _ => &mut task.tester,
        };
        let old = std::mem::replace(slot, member);
        let extra = self.display_name(old)?;
        self.save(&task)?;
        self.publish(&task, ctx.user_id, kind, extra, now)
    }

    pub fn set_weight(&mut self, ctx: &RequestContext, id: i64, weight: i8) -> AppResult<()> {
        let now = self.now();
        let mut task = self.load(id)?;
        let old = std::mem::replace(&mut task.weight, weight);
        self.save(&task)?;
        self.publish(&task, ctx.user_id, TaskEventKind::ModWeight, old.to_string(), now)
    }

    /// 修改起止时间。两端都变化时分别产生一条动态。
    pub fn set_time(
        &mut self,
        ctx: &RequestContext,
        id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> AppResult<()> {
        validate_time_range(&start, &end)?;
        let now = self.now();
        let mut task = self.load(id)?;
        let old_start = std::mem::replace(&mut task.start_time, start);
        let old_end = std::mem::replace(&mut task.end_time, end);
        if old_start == start && old_end == end {
            return Ok(());
        }
        self.save(&task)?;

        if old_start != start {
            let extra = format_task_time(&old_start);
            self.publish(&task, ctx.user_id, TaskEventKind::ModStartTime, extra, now)?;
        }
        if old_end != end {
            let extra = format_task_time(&old_end);
            self.publish(&task, ctx.user_id, TaskEventKind::ModEndTime, extra, now)?;
        }
        Ok(())
    }

    pub fn set_content(&mut self, ctx: &RequestContext, id: i64, content: &str) -> AppResult<()> {
        ensure(!content.trim().is_empty(), "任务详情不可为空")?;
        let now = self.now();
        let mut task = self.load(id)?;
        task.content = content.to_string();
        self.save(&task)?;
        self.publish(&task, ctx.user_id, TaskEventKind::ModContent, String::new(), now)
    }

    pub fn comment(&mut self, ctx: &RequestContext, id: i64, text: &str) -> AppResult<()> {
        ensure(!text.trim().is_empty(), "评论内容不可为空")?;
        let now = self.now();
        let task = self.load(id)?;
        self.store
            .insert_comment(&TaskComment {
                id: 0,
                tid: task.id,
                uid: ctx.user_id,
                time: now,
                comment: text.to_string(),
            })
            .or_fail("发送评论失败")?;
        self.publish(&task, ctx.user_id, TaskEventKind::Comment, String::new(), now)
    }

    /// 只有创建者或项目管理员可以删除。
    pub fn delete(&mut self, ctx: &RequestContext, id: i64) -> AppResult<()> {
        let task = self.load(id)?;
        let operator = ctx.user_id;
        self.authorize(&task, operator, task.creator == operator, "只有创建者或管理员可以删除任务")?;
        self.store.delete_task(id).or_fail("删除任务失败")?;
        tracing::info!(task_id = id, operator, "Task deleted");
        Ok(())
    }
}
