pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod orm;
pub mod routes;
pub mod services;
pub mod session;
pub mod validation;

use crate::cache::CacheManager;
use crate::config::{Config, Environment};
use crate::db::Database;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AutoLoginConfig, AutoLoginService};
use crate::orm::OrmResult;
use crate::services::install_service::InstallProgress;
use crate::services::task_store::{OrmTaskStore, TaskStore};
use crate::session::{SessionConfig, SessionManager};
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub cache: CacheManager,
    pub sessions: SessionManager,
    pub auto_login: AutoLoginService,
    pub environment: RwLock<Environment>,
    pub install: InstallProgress,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl AppState {
    pub fn new(config: Config, environment: Environment) -> Self {
        Self::with_clock(config, environment, Arc::new(DefaultClock))
    }

    pub fn with_clock(
        config: Config,
        environment: Environment,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let session = config.session();
        let sessions = SessionManager::with_clock(
            SessionConfig {
                cookie_name: session.cookie_name,
                ttl: chrono::Duration::seconds(session.ttl_secs),
            },
            Arc::clone(&clock),
        );
        let auto_login = AutoLoginService::new(AutoLoginConfig::from(config.auto_login()));

        Self {
            config: Arc::new(config),
            db: Database::new(),
            cache: CacheManager::new(),
            sessions,
            auto_login,
            environment: RwLock::new(environment),
            install: InstallProgress::new(),
            clock,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.environment.read().installed
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// 在阻塞线程池中执行数据库相关的同步代码。
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AppState) -> AppResult<T> + Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|e| AppError::internal(format!("Blocking task failed: {}", e)))?
    }

    /// 读取用户（经过缓存）。
    pub fn find_user(&self, id: i64) -> OrmResult<Option<Arc<User>>> {
        if let Some(user) = self.cache.users.get(id) {
            return Ok(Some(user));
        }
        let mut conn = self.db.conn()?;
        self.cache.find_user(&mut *conn, id)
    }

    /// 在一个事务内执行任务写操作：任务、动态与通知要么全部写入，要么全部回滚。
    pub fn with_task_store<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn TaskStore, &(dyn Clock + Send + Sync)) -> AppResult<T>,
    {
        self.db.transaction(|conn| {
            let mut store = OrmTaskStore::new(conn, &self.cache);
            f(&mut store, &*self.clock)
        })
    }
}

pub fn init_tracing(config: &Config) {
    let level = match config.log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => config.log_level.as_str(),
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
