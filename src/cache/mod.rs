pub mod entity_cache;

pub use entity_cache::EntityCache;

use crate::db::models::{Project, User};
use crate::orm::{self, Executor, OrmResult};
use std::sync::Arc;

/// 未知用户的显示名
pub const UNKNOWN_USER: &str = "未知者";

/// 进程内的实体缓存：用户与项目各自独立。
#[derive(Default)]
pub struct CacheManager {
    pub users: EntityCache<User>,
    pub projects: EntityCache<Project>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取用户，缓存未命中时回源数据库。查询出错时原样返回错误。
    pub fn find_user<E: Executor + ?Sized>(&self, conn: &mut E, id: i64) -> OrmResult<Option<Arc<User>>> {
        self.users.get_or_load(id, |id| orm::find::<User, _>(conn, id))
    }

    /// 用户的显示名与头像；用户不存在时返回“未知者”。
    pub fn find_user_info<E: Executor + ?Sized>(
        &self,
        conn: &mut E,
        id: i64,
    ) -> OrmResult<(String, String)> {
        Ok(match self.find_user(conn, id)? {
            Some(user) => (user.name.clone(), user.avatar.clone()),
            None => (UNKNOWN_USER.to_string(), String::new()),
        })
    }

    pub fn find_project<E: Executor + ?Sized>(
        &self,
        conn: &mut E,
        id: i64,
    ) -> OrmResult<Option<Arc<Project>>> {
        self.projects.get_or_load(id, |id| orm::find::<Project, _>(conn, id))
    }
}
