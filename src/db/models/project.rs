use super::task::TaskBrief;
use super::user::User;
use crate::orm::Constraint;
use serde::Serialize;
use std::sync::Arc;

crate::record! {
    /// 项目。`branches` 的第一个元素为默认分支。
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    pub struct Project {
        pub id: i64,
        pub name: String => [Constraint::Type("VARCHAR(64)"), Constraint::Unique, Constraint::NotNull],
        pub branches: Vec<String>,
    }
}

impl Project {
    /// 追加分支，同名分支已存在时返回 `false`。
    pub fn add_branch(&mut self, branch: &str) -> bool {
        if self.branches.iter().any(|b| b == branch) {
            return false;
        }
        self.branches.push(branch.to_string());
        true
    }
}

crate::record! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProjectMember {
        pub id: i64,
        pub uid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub pid: i64 => [Constraint::Type("BIGINT"), Constraint::NotNull],
        pub role: i8 => [Constraint::Type("INTEGER"), Constraint::NotNull],
        pub is_admin: bool,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub user: Arc<User>,
    pub role: i8,
    pub is_admin: bool,
}

/// 项目详情：基本信息加未锁定的成员列表。
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub id: i64,
    pub name: String,
    pub branches: Vec<String>,
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeeklyReport {
    pub archived: Vec<TaskBrief>,
    pub unarchived: Vec<TaskBrief>,
}
