//! 反射式 ORM：记录描述、值编解码、SQL 语句构建与执行。
//!
//! 记录类型通过 [`record!`](crate::record) 宏声明，宏在编译期生成字段描述表
//! 以及按字段名读写的访问器，其余的建表、增删改查都只依赖 [`Record`] trait。

pub mod codec;
pub mod executor;
pub mod mysql;
pub mod record;
pub mod statement;

pub use codec::{Column, Json, TIME_FORMAT, Value};
pub use executor::{Executed, Executor, Row, Rows};
pub use record::{Constraint, FieldDescriptor, FieldKind, Record};
pub use statement::Statement;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("database has not been opened")]
    NotInitialized,

    #[error("record not found")]
    NotFound,

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("bad parameter: {0}")]
    BadParam(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("Database error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Codec(err.to_string())
    }
}

pub type OrmResult<T> = Result<T, OrmError>;

/// 建表：缺少主键字段时自动补上 `id` 自增主键。
pub fn create_table<R: Record, E: Executor + ?Sized>(conn: &mut E) -> OrmResult<()> {
    let stmt = statement::create_table::<R>()?;
    conn.execute(&stmt)?;
    Ok(())
}

/// 插入一条记录（主键字段不参与插入），返回新主键与影响行数。
pub fn insert<R: Record, E: Executor + ?Sized>(conn: &mut E, record: &R) -> OrmResult<Executed> {
    let stmt = statement::insert(record)?;
    conn.execute(&stmt)
}

/// 插入后把自增主键回写到记录上。主键字段在执行前检查，不合格时不写库。
pub fn insert_returning<R: Record, E: Executor + ?Sized>(
    conn: &mut E,
    record: &mut R,
) -> OrmResult<i64> {
    let identity = R::writable_identity()?;
    let executed = insert(conn, record)?;
    record.assign(identity.name, Value::Int(executed.last_insert_id))?;
    Ok(executed.last_insert_id)
}

/// 以 `keys` 指定的列（为空时使用主键）为条件读取第一行并填充到 `record`。
pub fn read<R: Record, E: Executor + ?Sized>(
    conn: &mut E,
    record: &mut R,
    keys: &[&str],
) -> OrmResult<()> {
    let stmt = statement::select(record, keys)?;
    let row = conn.fetch(&stmt)?.next().ok_or(OrmError::NotFound)?;
    scan(&row, record)
}

/// 按主键读取，不存在时返回 `None`。
pub fn find<R: Record, E: Executor + ?Sized>(conn: &mut E, id: i64) -> OrmResult<Option<R>> {
    let mut record = R::default();
    record.set_identity(id)?;
    match read(conn, &mut record, &[]) {
        Ok(()) => Ok(Some(record)),
        Err(OrmError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// 按主键更新所有非主键字段，返回影响行数。
pub fn update<R: Record, E: Executor + ?Sized>(conn: &mut E, record: &R) -> OrmResult<u64> {
    let stmt = statement::update(record)?;
    Ok(conn.execute(&stmt)?.rows_affected)
}

pub fn delete<E: Executor + ?Sized>(conn: &mut E, table: &str, id: i64) -> OrmResult<u64> {
    let stmt = statement::delete(table, id);
    Ok(conn.execute(&stmt)?.rows_affected)
}

/// 按列名（忽略大小写）把一行结果写入记录；未知列直接忽略。
pub fn scan<R: Record>(row: &Row, record: &mut R) -> OrmResult<()> {
    for (column, value) in row.columns() {
        let field = R::fields()
            .iter()
            .find(|f| f.is_persistent() && f.column().eq_ignore_ascii_case(column));
        if let Some(field) = field {
            record.assign(field.name, value.clone())?;
        }
    }
    Ok(())
}

/// 执行查询并把每一行扫描成新的记录。
pub fn load<R: Record, E: Executor + ?Sized>(conn: &mut E, stmt: &Statement) -> OrmResult<Vec<R>> {
    conn.fetch(stmt)?
        .map(|row| {
            let mut record = R::default();
            scan(&row, &mut record)?;
            Ok(record)
        })
        .collect()
}

/// 读取单值查询（如 `COUNT(*)`）的第一列。
pub fn scalar<E: Executor + ?Sized>(conn: &mut E, stmt: &Statement) -> OrmResult<i64> {
    match conn.fetch(stmt)?.next().and_then(|row| row.first().cloned()) {
        Some(value) => i64::decode(value),
        None => Ok(0),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// 记录所有执行过的语句，并按顺序返回预置的结果集。
    ///
    /// 设置 `fail_at` 后，第 `n` 条语句（从 0 开始）以存储错误失败。
    #[derive(Default)]
    pub struct RecordingExecutor {
        pub statements: Vec<Statement>,
        pub results: VecDeque<Vec<Row>>,
        pub next_id: i64,
        pub fail_at: Option<usize>,
    }

    impl RecordingExecutor {
        pub fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                results: VecDeque::from([rows]),
                ..Default::default()
            }
        }

        pub fn failing_at(n: usize) -> Self {
            Self {
                fail_at: Some(n),
                ..Default::default()
            }
        }

        fn record(&mut self, stmt: &Statement) -> OrmResult<()> {
            let index = self.statements.len();
            self.statements.push(stmt.clone());
            if self.fail_at == Some(index) {
                return Err(OrmError::Storage(
                    diesel::result::Error::BrokenTransactionManager,
                ));
            }
            Ok(())
        }
    }

    impl Executor for RecordingExecutor {
        fn execute(&mut self, stmt: &Statement) -> OrmResult<Executed> {
            self.record(stmt)?;
            self.next_id += 1;
            Ok(Executed {
                last_insert_id: self.next_id,
                rows_affected: 1,
            })
        }

        fn fetch(&mut self, stmt: &Statement) -> OrmResult<Rows> {
            self.record(stmt)?;
            Ok(Rows::new(self.results.pop_front().unwrap_or_default()))
        }
    }
}
