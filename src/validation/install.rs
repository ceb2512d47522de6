use crate::config::MySqlSettings;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureForm {
    #[validate(range(min = 1, max = 65535, message = "无效的端口参数"))]
    #[serde(default)]
    pub port: i64,
    #[validate(length(min = 1, message = "数据库地址不可为空"))]
    #[serde(default)]
    pub mysql_host: String,
    #[serde(default)]
    pub mysql_user: String,
    #[serde(default)]
    pub mysql_pswd: String,
    #[validate(length(min = 1, message = "数据库名不可为空"))]
    #[serde(rename = "mysqlDB")]
    #[serde(default)]
    pub mysql_db: String,
}

impl ConfigureForm {
    pub fn mysql(&self) -> MySqlSettings {
        MySqlSettings {
            host: self.mysql_host.clone(),
            user: self.mysql_user.clone(),
            password: self.mysql_pswd.clone(),
            database: self.mysql_db.clone(),
        }
    }
}
