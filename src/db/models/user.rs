use crate::orm::Constraint;
use serde::Serialize;

crate::record! {
    /// 用户帐号
    #[derive(Debug, Default, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub id: i64,
        pub account: String => [Constraint::Type("VARCHAR(64)"), Constraint::Unique, Constraint::NotNull],
        pub name: String => [Constraint::Type("VARCHAR(32)"), Constraint::Unique, Constraint::NotNull],
        pub avatar: String => [Constraint::Type("VARCHAR(128)")],
        // 旧数据为 32 位 MD5，升级后为 bcrypt 哈希
        #[serde(skip_serializing)]
        pub password: String => [Constraint::Type("VARCHAR(72)"), Constraint::NotNull],
        pub is_su: bool,
        pub is_locked: bool,
        /// 自动登录过期时间（unix 秒），0 表示未开启
        #[serde(skip_serializing)]
        pub auto_login_expire: u64,
    }
}

impl User {
    /// 是否允许凭自动登录凭证登录。
    pub fn accepts_auto_login(&self, now_unix: i64) -> bool {
        !self.is_locked && i64::try_from(self.auto_login_expire).is_ok_and(|expire| expire > now_unix)
    }
}
