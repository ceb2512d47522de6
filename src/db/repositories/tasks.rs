use crate::db::enums::TaskState;
use crate::db::models::{Task, TaskAttachment, TaskComment, TaskEvent, task_time_infinite};
use crate::orm::{self, Executor, OrmResult, Statement};

// 置顶优先，其次按权重与创建顺序
const TASK_ORDER: &str = "ORDER BY `bringtop` DESC, `weight` DESC, `id` DESC";

pub struct TaskRepo;

impl TaskRepo {
    /// 用户以任一角色参与、且尚未归档的任务
    pub fn active_for_user<E: Executor + ?Sized>(conn: &mut E, uid: i64) -> OrmResult<Vec<Task>> {
        let stmt = Statement::new(format!(
            "SELECT * FROM `task` WHERE `state`<? AND (`creator`=? OR `developer`=? OR `tester`=?) {}",
            TASK_ORDER
        ))
        .bind(TaskState::Archived.code())
        .bind(uid)
        .bind(uid)
        .bind(uid);
        orm::load(conn, &stmt)
    }

    pub fn active_in_project<E: Executor + ?Sized>(conn: &mut E, pid: i64) -> OrmResult<Vec<Task>> {
        let stmt = Statement::new(format!(
            "SELECT * FROM `task` WHERE `pid`=? AND `state`<? {}",
            TASK_ORDER
        ))
        .bind(pid)
        .bind(TaskState::Archived.code());
        orm::load(conn, &stmt)
    }

    /// 在 `[from, to]`（unix 秒）内归档的任务
    pub fn archived_between<E: Executor + ?Sized>(
        conn: &mut E,
        pid: i64,
        from: i64,
        to: i64,
    ) -> OrmResult<Vec<Task>> {
        let stmt = Statement::new(format!(
            "SELECT * FROM `task` WHERE `pid`=? AND `state`=? AND UNIX_TIMESTAMP(`archivetime`)>=? AND UNIX_TIMESTAMP(`archivetime`)<=? {}",
            TASK_ORDER
        ))
        .bind(pid)
        .bind(TaskState::Archived.code())
        .bind(from)
        .bind(to);
        orm::load(conn, &stmt)
    }

    /// 截止时间不晚于 `until`（unix 秒），且当时仍未归档的任务
    pub fn unarchived_due<E: Executor + ?Sized>(
        conn: &mut E,
        pid: i64,
        until: i64,
    ) -> OrmResult<Vec<Task>> {
        let stmt = Statement::new(format!(
            "SELECT * FROM `task` WHERE `pid`=? AND `state`<? AND UNIX_TIMESTAMP(`endtime`)<=? AND (`archivetime`=? OR UNIX_TIMESTAMP(`archivetime`)>?) {}",
            TASK_ORDER
        ))
        .bind(pid)
        .bind(TaskState::Archived.code())
        .bind(until)
        .bind(task_time_infinite())
        .bind(until);
        orm::load(conn, &stmt)
    }

    pub fn comments<E: Executor + ?Sized>(conn: &mut E, tid: i64) -> OrmResult<Vec<TaskComment>> {
        let stmt = Statement::new("SELECT * FROM `taskcomment` WHERE `tid`=? ORDER BY `time`, `id`").bind(tid);
        orm::load(conn, &stmt)
    }

    /// 任务动态，最新的在前
    pub fn events<E: Executor + ?Sized>(conn: &mut E, tid: i64) -> OrmResult<Vec<TaskEvent>> {
        let stmt = Statement::new("SELECT * FROM `taskevent` WHERE `tid`=? ORDER BY `time` DESC, `id` DESC")
            .bind(tid);
        orm::load(conn, &stmt)
    }

    pub fn attachments<E: Executor + ?Sized>(conn: &mut E, tid: i64) -> OrmResult<Vec<TaskAttachment>> {
        let stmt = Statement::new("SELECT * FROM `taskattachment` WHERE `tid`=? ORDER BY `id`").bind(tid);
        orm::load(conn, &stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::RecordingExecutor;
    use crate::orm::{Row, Value};

    #[test]
    fn test_active_for_user_binds_every_role() {
        let mut conn = RecordingExecutor::with_rows(vec![Row::new(vec![
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("登录页".into())),
            ("state".to_string(), Value::Int(2)),
            ("tags".to_string(), Value::Text("[3]".into())),
        ])]);
        let tasks = TaskRepo::active_for_user(&mut conn, 7).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "登录页");
        assert!(tasks[0].tags.contains(&3));
        assert_eq!(
            conn.statements[0].params,
            vec![Value::Int(4), Value::Int(7), Value::Int(7), Value::Int(7)]
        );
    }

    #[test]
    fn test_unarchived_window_excludes_sentinel() {
        let mut conn = RecordingExecutor::default();
        TaskRepo::unarchived_due(&mut conn, 2, 1_710_000_000).unwrap();
        assert_eq!(
            conn.statements[0].params[3],
            Value::Text("2000-01-01 00:00:00.000000000".into())
        );
        assert_eq!(conn.statements[0].params[4], Value::Int(1_710_000_000));
    }

    #[test]
    fn test_events_newest_first() {
        let mut conn = RecordingExecutor::default();
        TaskRepo::events(&mut conn, 5).unwrap();
        assert!(conn.statements[0].sql.ends_with("ORDER BY `time` DESC, `id` DESC"));
    }
}
