//! 基于 diesel `sql_query` 的 MySQL 执行器。

use super::{Executed, Executor, OrmError, OrmResult, Row, Rows, Statement, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::deserialize::{self, FromSql};
use diesel::mysql::{Mysql, MysqlConnection, MysqlType};
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::row::{Field, NamedRow, Row as DieselRow};
use diesel::sql_types::{BigInt, Binary, Bool, Date, Double, Nullable, Text, Time, Timestamp, Unsigned};
use diesel::{QueryableByName, RunQueryDsl, sql_query};

#[derive(QueryableByName)]
struct LastInsertId {
    #[diesel(sql_type = Unsigned<BigInt>)]
    id: u64,
}

/// 动态列结果，列名和值都在运行期确定。
struct DynamicRow(Row);

impl QueryableByName<Mysql> for DynamicRow {
    fn build<'a>(row: &impl NamedRow<'a, Mysql>) -> deserialize::Result<Self> {
        let count = DieselRow::field_count(row);
        let mut columns = Vec::with_capacity(count);
        for index in 0..count {
            let Some(field) = DieselRow::get(row, index) else {
                continue;
            };
            let name = field.field_name().unwrap_or_default().to_string();
            let value = match field.value() {
                None => Value::Null,
                Some(raw) => match raw.value_type() {
                    MysqlType::Tiny
                    | MysqlType::Short
                    | MysqlType::Long
                    | MysqlType::LongLong => {
                        Value::Int(<i64 as FromSql<BigInt, Mysql>>::from_sql(raw)?)
                    }
                    MysqlType::UnsignedTiny
                    | MysqlType::UnsignedShort
                    | MysqlType::UnsignedLong
                    | MysqlType::UnsignedLongLong => Value::UInt(
                        <u64 as FromSql<Unsigned<BigInt>, Mysql>>::from_sql(raw)?,
                    ),
                    MysqlType::Float | MysqlType::Double | MysqlType::Numeric => {
                        Value::Float(<f64 as FromSql<Double, Mysql>>::from_sql(raw)?)
                    }
                    MysqlType::Timestamp | MysqlType::DateTime => Value::from(
                        <NaiveDateTime as FromSql<Timestamp, Mysql>>::from_sql(raw)?,
                    ),
                    MysqlType::Date => {
                        let date = <NaiveDate as FromSql<Date, Mysql>>::from_sql(raw)?;
                        Value::from(date.and_time(NaiveTime::MIN))
                    }
                    MysqlType::Time => {
                        let time = <NaiveTime as FromSql<Time, Mysql>>::from_sql(raw)?;
                        Value::Text(time.to_string())
                    }
                    _ => {
                        let bytes = <Vec<u8> as FromSql<Binary, Mysql>>::from_sql(raw)?;
                        Value::Text(String::from_utf8_lossy(&bytes).into_owned())
                    }
                },
            };
            columns.push((name, value));
        }
        Ok(DynamicRow(Row::new(columns)))
    }
}

fn prepare(stmt: &Statement) -> BoxedSqlQuery<'static, Mysql, SqlQuery> {
    let mut query = sql_query(stmt.sql.clone()).into_boxed::<Mysql>();
    for param in &stmt.params {
        query = match param {
            Value::Null => query.bind::<Nullable<Text>, _>(None::<String>),
            Value::Bool(b) => query.bind::<Bool, _>(*b),
            Value::Int(n) => query.bind::<BigInt, _>(*n),
            Value::UInt(n) => query.bind::<Unsigned<BigInt>, _>(*n),
            Value::Float(n) => query.bind::<Double, _>(*n),
            Value::Text(s) => query.bind::<Text, _>(s.clone()),
        };
    }
    query
}

/// `LAST_INSERT_ID()` 是无符号的，超出 `i64` 范围时报错。
fn insert_id(raw: u64) -> OrmResult<i64> {
    i64::try_from(raw).map_err(|_| OrmError::BadParam(format!("insert id {raw} out of range")))
}

impl Executor for MysqlConnection {
    fn execute(&mut self, stmt: &Statement) -> OrmResult<Executed> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing statement");
        let rows_affected = prepare(stmt).execute(self)? as u64;

        let last_insert_id = if stmt.sql.starts_with("INSERT") {
            let row: LastInsertId = sql_query("SELECT LAST_INSERT_ID() AS id").get_result(self)?;
            insert_id(row.id)?
        } else {
            0
        };

        Ok(Executed {
            last_insert_id,
            rows_affected,
        })
    }

    fn fetch(&mut self, stmt: &Statement) -> OrmResult<Rows> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "Fetching rows");
        let rows: Vec<DynamicRow> = prepare(stmt).load(self)?;
        Ok(Rows::new(rows.into_iter().map(|r| r.0).collect()))
    }
}
