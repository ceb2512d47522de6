//! 服务端会话：进程内的会话表，会话 ID 通过 cookie 下发。

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Duration, Utc};
use md5::{Digest, Md5};
use mockable::{Clock, DefaultClock};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;

/// 会话中保存当前登录用户 ID 的键
pub const SESSION_UID_KEY: &str = "uid";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            ttl: Duration::minutes(30),
        }
    }
}

/// 会话管理器读写 cookie 与客户端地址所需的请求上下文。
pub trait SessionContext {
    fn remote_ip(&self) -> String;
    fn cookie(&self, name: &str) -> Option<String>;
    fn set_cookie(&mut self, cookie: Cookie<'static>);
}

#[derive(Debug)]
pub struct Session {
    id: String,
    expire: Mutex<DateTime<Utc>>,
    data: Mutex<HashMap<String, serde_json::Value>>,
}

impl Session {
    fn new(id: String, expire: DateTime<Utc>) -> Self {
        Self {
            id,
            expire: Mutex::new(expire),
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        *self.expire.lock()
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        *self.expire.lock() > now
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.lock().get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.data.lock().insert(key.to_string(), value);
            }
            Err(e) => tracing::warn!(key, "Failed to store session value: {}", e),
        }
    }

    pub fn remove(&self, key: &str) {
        self.data.lock().remove(key);
    }

    /// 当前登录用户
    pub fn user_id(&self) -> Option<i64> {
        self.get(SESSION_UID_KEY)
    }
}

struct Registry {
    serial: u64,
    sessions: HashMap<String, Arc<Session>>,
}

/// 会话表。外层映射只由一把锁保护；会话自身的数据使用各自的锁。
pub struct SessionManager {
    config: SessionConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    registry: Mutex<Registry>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(DefaultClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            config,
            clock,
            registry: Mutex::new(Registry {
                serial: 0,
                sessions: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 取得当前请求的会话：有效则顺延过期时间，否则新建并下发 cookie。
    pub fn start(&self, ctx: &mut impl SessionContext) -> Arc<Session> {
        let now = self.clock.utc();
        let expire = now + self.config.ttl;
        let mut registry = self.registry.lock();

        if let Some(id) = ctx.cookie(&self.config.cookie_name) {
            if let Some(session) = registry.sessions.get(&id).cloned() {
                if session.is_live(now) {
                    *session.expire.lock() = expire;
                    return session;
                }
                registry.sessions.remove(&id);
            }
        }

        registry.serial += 1;
        let salt: u32 = rand::rng().random_range(0..100_000);
        let seed = format!("{}_{}_{}_{}", ctx.remote_ip(), now.timestamp(), registry.serial, salt);
        let id = hex::encode(Md5::digest(seed.as_bytes()));

        let session = Arc::new(Session::new(id.clone(), expire));
        registry.sessions.insert(id.clone(), Arc::clone(&session));
        drop(registry);

        ctx.set_cookie(
            Cookie::build(self.config.cookie_name.clone(), id)
                .path("/")
                .expires(to_offset(expire))
                .finish(),
        );
        session
    }

    /// 销毁当前会话并让客户端立即清除 cookie。
    pub fn end(&self, ctx: &mut impl SessionContext) {
        if let Some(id) = ctx.cookie(&self.config.cookie_name) {
            self.registry.lock().sessions.remove(&id);
        }

        ctx.set_cookie(
            Cookie::build(self.config.cookie_name.clone(), "")
                .path("/")
                .max_age(time::Duration::seconds(-1))
                .finish(),
        );
    }

    /// 清理已过期的会话，返回清理数量。
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.utc();
        let mut registry = self.registry.lock();
        let before = registry.sessions.len();
        registry.sessions.retain(|_, session| session.is_live(now));
        before - registry.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn to_offset(time: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(time.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
