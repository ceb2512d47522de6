use super::{OrmError, OrmResult, Record, Value};

/// 带占位参数的 SQL 语句。
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// 用反引号包裹标识符。
pub fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub fn create_table<R: Record>() -> OrmResult<Statement> {
    let mut columns: Vec<String> = R::persistent_fields()
        .map(|f| format!("{} {}", quote(&f.column()), f.definition()))
        .collect();
    if columns.is_empty() {
        return Err(OrmError::BadParam(format!("{} has no fields", R::NAME)));
    }
    if R::identity_field().is_none() {
        columns.insert(0, "`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string());
    }

    Ok(Statement::new(format!(
        "CREATE TABLE IF NOT EXISTS {}({}) DEFAULT CHARSET utf8",
        quote(&R::table()),
        columns.join(", ")
    )))
}

pub fn insert<R: Record>(record: &R) -> OrmResult<Statement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for field in R::persistent_fields().filter(|f| !f.is_identity()) {
        columns.push(quote(&field.column()));
        params.push(field_value(record, field.name)?);
    }
    if columns.is_empty() {
        return Err(OrmError::BadParam(format!("{} has nothing to insert", R::NAME)));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(Statement {
        sql: format!(
            "INSERT INTO {}({}) VALUES({})",
            quote(&R::table()),
            columns.join(", "),
            placeholders
        ),
        params,
    })
}

/// `keys` 为列名；为空时按主键查询。
pub fn select<R: Record>(record: &R, keys: &[&str]) -> OrmResult<Statement> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if keys.is_empty() {
        let field = R::identity_field()
            .ok_or_else(|| OrmError::BadParam(format!("{} has no identity field", R::NAME)))?;
        let id = require_identity(record)?;
        conditions.push(format!("{}=?", quote(&field.column())));
        params.push(Value::Int(id));
    } else {
        for key in keys {
            let field = R::persistent_fields()
                .find(|f| f.column().eq_ignore_ascii_case(key))
                .ok_or_else(|| {
                    OrmError::BadParam(format!("{} has no column named {key}", R::NAME))
                })?;
            conditions.push(format!("{}=?", quote(&field.column())));
            params.push(field_value(record, field.name)?);
        }
    }

    Ok(Statement {
        sql: format!(
            "SELECT * FROM {} WHERE {}",
            quote(&R::table()),
            conditions.join(" AND ")
        ),
        params,
    })
}

pub fn update<R: Record>(record: &R) -> OrmResult<Statement> {
    let identity = R::identity_field()
        .ok_or_else(|| OrmError::BadParam(format!("{} has no identity field", R::NAME)))?;
    let id = require_identity(record)?;

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for field in R::persistent_fields().filter(|f| !f.is_identity()) {
        assignments.push(format!("{}=?", quote(&field.column())));
        params.push(field_value(record, field.name)?);
    }
    if assignments.is_empty() {
        return Err(OrmError::BadParam(format!("{} has nothing to update", R::NAME)));
    }
    params.push(Value::Int(id));

    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}=?",
            quote(&R::table()),
            assignments.join(", "),
            quote(&identity.column())
        ),
        params,
    })
}

pub fn delete(table: &str, id: i64) -> Statement {
    Statement::new(format!("DELETE FROM {} WHERE `id`=?", quote(table))).bind(id)
}

fn field_value<R: Record>(record: &R, name: &str) -> OrmResult<Value> {
    record
        .value_of(name)?
        .ok_or_else(|| OrmError::BadParam(format!("{} has no field {name}", R::NAME)))
}

fn require_identity<R: Record>(record: &R) -> OrmResult<i64> {
    match record.identity()? {
        Some(id) if id >= 0 => Ok(id),
        Some(id) => Err(OrmError::BadParam(format!("invalid identity {id}"))),
        None => Err(OrmError::BadParam(format!("{} has no identity", R::NAME))),
    }
}
