pub mod enums;
pub mod models;
pub mod repositories;

use crate::orm::{self, Executed, Executor, OrmError, OrmResult, Record, Rows, Statement};
use diesel::mysql::MysqlConnection;
use diesel::r2d2::{self, ConnectionManager as DbConnectionManager, PooledConnection};
use diesel::Connection;
use parking_lot::RwLock;
use std::sync::Arc;

pub type DbPool = r2d2::Pool<DbConnectionManager<MysqlConnection>>;
pub type DbConnection = PooledConnection<DbConnectionManager<MysqlConnection>>;

/// 进程内共享的数据库句柄。
///
/// 安装完成前连接池为空，此时所有操作都返回 [`OrmError::NotInitialized`]。
#[derive(Clone, Default)]
pub struct Database {
    pool: Arc<RwLock<Option<DbPool>>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开（或替换）连接池。
    pub fn open(&self, url: &str, max_connections: u32) -> OrmResult<()> {
        let manager = DbConnectionManager::<MysqlConnection>::new(url);
        let pool = r2d2::Pool::builder()
            .max_size(max_connections)
            .build(manager)?;
        *self.pool.write() = Some(pool);
        tracing::info!(max_connections, "Database pool opened");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.pool.read().is_some()
    }

    pub fn conn(&self) -> OrmResult<DbConnection> {
        let pool = self.pool.read().clone().ok_or(OrmError::NotInitialized)?;
        Ok(pool.get()?)
    }

    pub fn exec(&self, stmt: &Statement) -> OrmResult<Executed> {
        let mut conn = self.conn()?;
        Executor::execute(&mut *conn, stmt)
    }

    pub fn query(&self, stmt: &Statement) -> OrmResult<Rows> {
        let mut conn = self.conn()?;
        Executor::fetch(&mut *conn, stmt)
    }

    pub fn create_table<R: Record>(&self) -> OrmResult<()> {
        orm::create_table::<R, _>(&mut *self.conn()?)
    }

    pub fn insert<R: Record>(&self, record: &R) -> OrmResult<Executed> {
        orm::insert(&mut *self.conn()?, record)
    }

    pub fn read<R: Record>(&self, record: &mut R, keys: &[&str]) -> OrmResult<()> {
        orm::read(&mut *self.conn()?, record, keys)
    }

    pub fn update<R: Record>(&self, record: &R) -> OrmResult<u64> {
        orm::update(&mut *self.conn()?, record)
    }

    pub fn delete(&self, table: &str, id: i64) -> OrmResult<u64> {
        orm::delete(&mut *self.conn()?, table, id)
    }

    /// 从连接池取一个连接执行 `f`。
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MysqlConnection) -> Result<T, E>,
        E: From<OrmError>,
    {
        let mut conn = self.conn()?;
        f(&mut *conn)
    }

    /// 在单个事务内执行 `f`，返回错误时整体回滚。
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MysqlConnection) -> Result<T, E>,
        E: From<OrmError> + From<diesel::result::Error>,
    {
        let mut pooled = self.conn()?;
        let conn: &mut MysqlConnection = &mut pooled;
        conn.transaction(|conn| f(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unopened_database_is_not_initialized() {
        let db = Database::new();
        assert!(!db.is_open());
        let err = db.exec(&Statement::new("SELECT 1")).unwrap_err();
        assert!(matches!(err, OrmError::NotInitialized));
    }
}
