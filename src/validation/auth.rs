use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "帐号或密码不正确"))]
    pub account: String,
    #[validate(length(min = 1, message = "帐号或密码不正确"))]
    pub password: String,
    #[serde(default)]
    pub remember: String,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        !self.remember.is_empty()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub old_pswd: String,
    #[validate(length(min = 1, message = "新密码不可为空"))]
    pub new_pswd: String,
    #[serde(default)]
    pub cfm_pswd: String,
}

/// 安装时创建的默认管理员
#[derive(Debug, Deserialize, Validate)]
pub struct AdminForm {
    #[validate(length(min = 1, max = 64, message = "管理员帐号不可为空"))]
    pub account: String,
    #[validate(length(min = 1, max = 32, message = "管理员名称不可为空"))]
    pub name: String,
    #[validate(length(min = 1, message = "管理员密码不可为空"))]
    pub pswd: String,
}
