use super::project::{Project, ProjectInfo};
use super::user::User;
use crate::orm::Constraint;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 任务起止时间在表单与视图中的格式
pub const TASK_TIME_FORMAT: &str = "%Y-%m-%d";

/// 表示“从未归档”的哨兵时间：2000-01-01 00:00:00。
pub fn task_time_infinite() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// 按 [`TASK_TIME_FORMAT`] 解析日期，失败时返回 `None`。
pub fn parse_task_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(text.trim(), TASK_TIME_FORMAT)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

pub fn format_task_time(time: &NaiveDateTime) -> String {
    time.format(TASK_TIME_FORMAT).to_string()
}

crate::record! {
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Task {
        pub id: i64,
        pub pid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub branch: i8,
        pub creator: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub developer: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub tester: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub name: String => [Constraint::Type("VARCHAR(128)"), Constraint::NotNull],
        pub bring_top: bool,
        pub weight: i8,
        pub state: i8,
        pub start_time: NaiveDateTime,
        pub end_time: NaiveDateTime,
        pub archive_time: NaiveDateTime,
        pub tags: BTreeSet<i64>,
        pub content: String,
    }
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: 0,
            pid: 0,
            branch: 0,
            creator: 0,
            developer: 0,
            tester: 0,
            name: String::new(),
            bring_top: false,
            weight: 0,
            state: 0,
            start_time: NaiveDateTime::default(),
            end_time: NaiveDateTime::default(),
            archive_time: task_time_infinite(),
            tags: BTreeSet::new(),
            content: String::new(),
        }
    }
}

impl Task {
    /// 去重后的相关成员（创建者、开发者、测试者），保持角色顺序。
    pub fn participants(&self) -> Vec<i64> {
        let mut members = Vec::with_capacity(3);
        for uid in [self.creator, self.developer, self.tester] {
            if !members.contains(&uid) {
                members.push(uid);
            }
        }
        members
    }
}

crate::record! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    pub struct TaskAttachment {
        pub id: i64,
        pub tid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub name: String => [Constraint::Type("VARCHAR(128)"), Constraint::NotNull],
        #[serde(rename = "url")]
        pub path: String => [Constraint::Type("VARCHAR(128)"), Constraint::NotNull],
    }
}

crate::record! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    pub struct TaskComment {
        pub id: i64,
        pub tid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub uid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub time: NaiveDateTime,
        pub comment: String,
    }
}

crate::record! {
    /// 任务审计事件，只追加不修改。
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    pub struct TaskEvent {
        pub id: i64,
        pub tid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub uid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        #[serde(rename = "ev")]
        pub event: i8,
        pub time: NaiveDateTime,
        pub extra: String,
    }
}

/// 任务列表中的摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBrief {
    pub id: i64,
    pub name: String,
    pub proj: Option<Arc<Project>>,
    pub branch: i8,
    pub bring_top: bool,
    pub weight: i8,
    pub state: i8,
    pub creator: Option<Arc<User>>,
    pub developer: Option<Arc<User>>,
    pub tester: Option<Arc<User>>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub time: String,
    pub user: String,
    pub avatar: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub time: String,
    pub operator: String,
    pub event: i8,
    pub extra: String,
}

/// 任务详情
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    pub id: i64,
    pub name: String,
    pub proj: ProjectInfo,
    pub branch: i8,
    pub bring_top: bool,
    pub weight: i8,
    pub state: i8,
    pub creator: Option<Arc<User>>,
    pub developer: Option<Arc<User>>,
    pub tester: Option<Arc<User>>,
    pub start_time: String,
    pub end_time: String,
    pub tags: BTreeSet<i64>,
    pub content: String,
    pub comments: Vec<CommentView>,
    pub events: Vec<EventView>,
    pub attachments: Vec<TaskAttachment>,
}
