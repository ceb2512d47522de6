use super::{OrmResult, Statement, Value};

/// 查询结果中的一行，保留列的原始顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    /// 按列名（忽略大小写）取值。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }
}

/// 结果集游标。
#[derive(Debug, Default)]
pub struct Rows {
    inner: std::vec::IntoIter<Row>,
}

impl Rows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            inner: rows.into_iter(),
        }
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// 语句执行端口，数据库连接与测试替身都实现它。
pub trait Executor {
    fn execute(&mut self, stmt: &Statement) -> OrmResult<Executed>;
    fn fetch(&mut self, stmt: &Statement) -> OrmResult<Rows>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, stmt: &Statement) -> OrmResult<Executed> {
        (**self).execute(stmt)
    }

    fn fetch(&mut self, stmt: &Statement) -> OrmResult<Rows> {
        (**self).fetch(stmt)
    }
}
