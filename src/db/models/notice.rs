use crate::orm::Constraint;
use chrono::NaiveDateTime;
use serde::Serialize;

crate::record! {
    /// 任务动态通知，每个接收人一条。
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    pub struct Notice {
        pub id: i64,
        pub time: NaiveDateTime,
        pub uid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub tid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub tname: String => [Constraint::Type("VARCHAR(128)"), Constraint::NotNull],
        pub operator: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub event: i8 => [Constraint::Type("INTEGER"), Constraint::NotNull],
    }
}

/// 通知列表中的一项
#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub id: i64,
    pub time: String,
    pub tid: i64,
    pub tname: String,
    pub operator: String,
    pub avatar: String,
    #[serde(rename = "ev")]
    pub event: i8,
}
