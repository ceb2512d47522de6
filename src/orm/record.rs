use super::{OrmError, OrmResult, Value};

/// 字段的存储类别，由 [`Column::KIND`](super::Column::KIND) 在编译期给出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    /// 有符号整数，携带位宽
    Int(u8),
    /// 无符号整数，携带位宽
    UInt(u8),
    Float,
    Text,
    Timestamp,
    /// 切片、集合等聚合值，以 JSON 文本存储
    Aggregate,
}

impl FieldKind {
    /// 建表时按类别推断的默认列类型。
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Bool => "TINYINT(1) DEFAULT '0'",
            FieldKind::Int(bits) if bits < 64 => "INTEGER DEFAULT '0'",
            FieldKind::Int(_) => "BIGINT DEFAULT '0'",
            FieldKind::UInt(bits) if bits < 64 => "INTEGER UNSIGNED DEFAULT '0'",
            FieldKind::UInt(_) => "BIGINT UNSIGNED DEFAULT '0'",
            FieldKind::Float => "DOUBLE DEFAULT '0'",
            FieldKind::Text => "TEXT",
            FieldKind::Timestamp => "TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
            FieldKind::Aggregate => "TEXT",
        }
    }
}

/// 字段约束，按声明顺序追加到列定义之后。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
    Unique,
    Default(&'static str),
    /// 覆盖推断出的列类型
    Type(&'static str),
    /// 覆盖默认列名
    Column(&'static str),
    /// 不参与持久化
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub constraints: &'static [Constraint],
}

impl FieldDescriptor {
    /// 列名：显式指定时使用指定值，否则为去掉下划线后的小写字段名。
    pub fn column(&self) -> String {
        self.constraints
            .iter()
            .find_map(|c| match c {
                Constraint::Column(name) => Some(name.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| self.name.replace('_', "").to_ascii_lowercase())
    }

    pub fn is_identity(&self) -> bool {
        self.constraints.contains(&Constraint::PrimaryKey) || self.name == "id"
    }

    pub fn is_persistent(&self) -> bool {
        !self.constraints.contains(&Constraint::Skip)
    }

    /// 完整列定义（不含列名）。
    pub fn definition(&self) -> String {
        if self.is_identity() {
            return "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string();
        }

        let mut definition = self
            .constraints
            .iter()
            .find_map(|c| match c {
                Constraint::Type(ty) => Some(ty.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| self.kind.sql_type().to_string());

        for constraint in self.constraints {
            match constraint {
                Constraint::Unique => definition.push_str(" UNIQUE"),
                Constraint::NotNull => definition.push_str(" NOT NULL"),
                Constraint::Default(literal) => {
                    definition.push_str(" DEFAULT ");
                    definition.push_str(literal);
                }
                _ => {}
            }
        }
        definition
    }
}

/// 可持久化的记录类型。
///
/// 一般不手写实现，而是通过 [`record!`](crate::record) 声明。
pub trait Record: Default {
    /// 记录类型名，小写后即为表名
    const NAME: &'static str;

    fn fields() -> &'static [FieldDescriptor];

    /// 读取字段的存储值；字段不存在时返回 `None`。
    fn value_of(&self, field: &str) -> OrmResult<Option<Value>>;

    /// 写入字段；字段不存在时返回 `false`。
    fn assign(&mut self, field: &str, value: Value) -> OrmResult<bool>;

    fn table() -> String {
        Self::NAME.to_ascii_lowercase()
    }

    fn identity_field() -> Option<&'static FieldDescriptor> {
        Self::fields()
            .iter()
            .find(|f| f.is_persistent() && f.is_identity())
    }

    fn persistent_fields() -> impl Iterator<Item = &'static FieldDescriptor> {
        Self::fields().iter().filter(|f| f.is_persistent())
    }

    fn identity(&self) -> OrmResult<Option<i64>> {
        let Some(field) = Self::identity_field() else {
            return Ok(None);
        };
        match self.value_of(field.name)? {
            Some(Value::Int(id)) => Ok(Some(id)),
            Some(Value::UInt(id)) => i64::try_from(id)
                .map(Some)
                .map_err(|_| OrmError::BadParam(format!("identity {id} out of range"))),
            Some(other) => Err(OrmError::UnsupportedType(format!(
                "identity of {} must be an integer, got {other:?}",
                Self::NAME
            ))),
            None => Ok(None),
        }
    }

    /// 能接收自增主键的字段：必须存在且是 64 位整数。
    fn writable_identity() -> OrmResult<&'static FieldDescriptor> {
        match Self::identity_field() {
            Some(field) if matches!(field.kind, FieldKind::Int(64) | FieldKind::UInt(64)) => Ok(field),
            Some(field) => Err(OrmError::BadParam(format!(
                "identity {}.{} must be a 64-bit integer",
                Self::NAME,
                field.name
            ))),
            None => Err(OrmError::BadParam(format!("{} has no identity field", Self::NAME))),
        }
    }

    fn set_identity(&mut self, id: i64) -> OrmResult<()> {
        let field = Self::writable_identity()?;
        self.assign(field.name, Value::Int(id))?;
        Ok(())
    }
}

/// 声明一个记录结构体并生成其 [`Record`] 实现。
///
/// 每个字段后可以用 `=> [..]` 附加约束：
///
/// ```ignore
/// record! {
///     #[derive(Debug, Default, Clone)]
///     pub struct User {
///         pub id: i64,
///         pub account: String => [Constraint::Type("VARCHAR(64)"), Constraint::Unique],
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $( => [ $($constraint:expr),* $(,)? ] )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::orm::Record for $name {
            const NAME: &'static str = stringify!($name);

            fn fields() -> &'static [$crate::orm::FieldDescriptor] {
                const FIELDS: &[$crate::orm::FieldDescriptor] = &[
                    $(
                        $crate::orm::FieldDescriptor {
                            name: stringify!($field),
                            kind: <$ty as $crate::orm::Column>::KIND,
                            constraints: &[ $( $($constraint),* )? ],
                        },
                    )*
                ];
                FIELDS
            }

            fn value_of(
                &self,
                field: &str,
            ) -> $crate::orm::OrmResult<Option<$crate::orm::Value>> {
                match field {
                    $(
                        stringify!($field) => {
                            $crate::orm::Column::encode(&self.$field).map(Some)
                        }
                    )*
                    _ => Ok(None),
                }
            }

            fn assign(
                &mut self,
                field: &str,
                value: $crate::orm::Value,
            ) -> $crate::orm::OrmResult<bool> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::orm::Column::decode(value)?;
                            Ok(true)
                        }
                    )*
                    _ => Ok(false),
                }
            }
        }
    };
}
