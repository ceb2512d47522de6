use crate::AppState;
use crate::config::{Environment, MySqlSettings};
use crate::db::Database;
use crate::db::models::{
    Notice, Project, ProjectMember, Task, TaskAttachment, TaskComment, TaskEvent, User,
};
use crate::error::{AppResult, ensure};
use crate::orm::OrmResult;
use crate::services::auth_service::AuthService;
use parking_lot::Mutex;
use serde::Serialize;

/// 安装进度，供状态接口轮询。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallStatus {
    pub done: bool,
    #[serde(rename = "isError")]
    pub is_error: bool,
    pub status: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InstallProgress {
    inner: Mutex<InstallStatus>,
}

impl InstallProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> InstallStatus {
        self.inner.lock().clone()
    }

    /// 开始新一轮安装，清空之前的记录。
    pub fn begin(&self, line: impl Into<String>) {
        *self.inner.lock() = InstallStatus {
            done: false,
            is_error: false,
            status: vec![line.into()],
        };
    }

    pub fn push(&self, line: impl Into<String>) {
        self.inner.lock().status.push(line.into());
    }

    pub fn fail(&self, line: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.is_error = true;
        inner.status.push(line.into());
    }

    pub fn finish(&self, line: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.done = true;
        inner.status.push(line.into());
    }
}

type TableJob = (&'static str, fn(&Database) -> OrmResult<()>);

const TABLES: [TableJob; 8] = [
    ("user", Database::create_table::<User>),
    ("project", Database::create_table::<Project>),
    ("project member", Database::create_table::<ProjectMember>),
    ("task", Database::create_table::<Task>),
    ("task attachment", Database::create_table::<TaskAttachment>),
    ("task event", Database::create_table::<TaskEvent>),
    ("task comment", Database::create_table::<TaskComment>),
    ("notice", Database::create_table::<Notice>),
];

pub struct InstallService;

impl InstallService {
    /// 连接数据库并建表，进度写入 `state.install`。在阻塞线程中运行。
    pub fn setup(state: &AppState, port: i64, mysql: MySqlSettings) {
        let progress = &state.install;

        let opened = mysql.database_url().map_err(|e| e.to_string()).and_then(|url| {
            state
                .db
                .open(&url, state.config.database_max_connections)
                .map_err(|e| e.to_string())
        });
        if let Err(e) = opened {
            tracing::error!("Install failed to connect database: {}", e);
            progress.fail(format!("无法连接数据：{}", e));
            return;
        }

        for (table, create) in TABLES {
            progress.push(format!("创建数据表: {}", table));
            if let Err(e) = create(&state.db) {
                tracing::error!(table, "Install failed to create table: {}", e);
                progress.fail(format!("出错了：{}", e));
                return;
            }
        }

        *state.environment.write() = Environment {
            installed: false,
            app_port: format!(":{}", port),
            mysql,
        };
        progress.finish("应用配置完成!");
        tracing::info!(port, "Database configured");
    }

    /// 创建默认管理员，写入配置文件后系统即视为已安装。
    pub fn create_admin(state: &AppState, account: &str, name: &str, password: &str) -> AppResult<()> {
        ensure(state.install.snapshot().done, "请先完成数据库配置")?;

        let settings = state.config.password();
        let admin = state
            .db
            .with_conn(|conn| AuthService::create_admin(conn, &settings, account, name, password))?;
        state.cache.users.put(admin);

        let mut environment = state.environment.write();
        environment.save(&state.config.config_file)?;
        environment.installed = true;
        tracing::info!(path = %state.config.config_file.display(), "Installation completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_lifecycle() {
        let progress = InstallProgress::new();
        progress.begin("连接数据库...");
        progress.push("创建数据表: user");
        progress.finish("应用配置完成!");

        let status = progress.snapshot();
        assert!(status.done);
        assert!(!status.is_error);
        assert_eq!(status.status.len(), 3);

        progress.begin("连接数据库...");
        progress.fail("出错了：boom");
        let json = serde_json::to_value(progress.snapshot()).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["done"], false);
        assert_eq!(json["status"][1], "出错了：boom");
    }

    #[test]
    fn test_every_record_gets_a_table() {
        let names: Vec<_> = TABLES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"notice"));
    }

    #[test]
    fn test_admin_requires_configured_database() {
        let state = AppState::new(Default::default(), Default::default());
        let err = InstallService::create_admin(&state, "admin", "Admin", "pass").unwrap_err();
        assert_eq!(err.to_string(), "请先完成数据库配置");
    }
}
