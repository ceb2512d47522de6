use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 进程级配置，来自环境变量（支持 `.env`）。
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,

    #[serde(default = "default_auto_login_secret")]
    pub auto_login_secret: String,
    #[serde(default = "default_auto_login_ttl_days")]
    pub auto_login_ttl_days: i64,

    #[serde(default)]
    pub upgrade_password_hash: bool,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_secs: i64,
}

#[derive(Clone, Debug)]
pub struct AutoLoginSettings {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Clone, Debug)]
pub struct PasswordSettings {
    pub upgrade: bool,
    pub bcrypt_cost: u32,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_config_file() -> PathBuf {
    PathBuf::from("./team.json")
}
fn default_max_connections() -> u32 {
    64
}
fn default_session_cookie() -> String {
    "session_id".to_string()
}
fn default_session_ttl() -> i64 {
    1800
} // 30 minutes
fn default_auto_login_secret() -> String {
    "@team.auto_login_secret_01".to_string()
}
fn default_auto_login_ttl_days() -> i64 {
    30
}
fn default_bcrypt_cost() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_host(),
            config_file: default_config_file(),
            database_max_connections: default_max_connections(),
            session_cookie: default_session_cookie(),
            session_ttl_secs: default_session_ttl(),
            auto_login_secret: default_auto_login_secret(),
            auto_login_ttl_days: default_auto_login_ttl_days(),
            upgrade_password_hash: false,
            bcrypt_cost: default_bcrypt_cost(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.session_cookie.is_empty() {
            return Err(AppError::Config("SESSION_COOKIE must not be empty".to_string()));
        }

        if self.session_ttl_secs <= 0 {
            return Err(AppError::Config("SESSION_TTL_SECS must be > 0".to_string()));
        }

        if self.auto_login_secret.is_empty() {
            return Err(AppError::Config(
                "AUTO_LOGIN_SECRET must not be empty".to_string(),
            ));
        }

        if self.auto_login_ttl_days <= 0 {
            return Err(AppError::Config(
                "AUTO_LOGIN_TTL_DAYS must be > 0".to_string(),
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(AppError::Config(
                "BCRYPT_COST must be between 4 and 31".to_string(),
            ));
        }

        Ok(())
    }

    pub fn session(&self) -> SessionSettings {
        SessionSettings {
            cookie_name: self.session_cookie.clone(),
            ttl_secs: self.session_ttl_secs,
        }
    }

    pub fn auto_login(&self) -> AutoLoginSettings {
        AutoLoginSettings {
            secret: self.auto_login_secret.clone(),
            ttl_days: self.auto_login_ttl_days,
        }
    }

    pub fn password(&self) -> PasswordSettings {
        PasswordSettings {
            upgrade: self.upgrade_password_hash,
            bcrypt_cost: self.bcrypt_cost,
        }
    }
}

/// `team.json` 中的 MySQL 连接参数
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MySqlSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl MySqlSettings {
    /// 生成 diesel 使用的 `mysql://` 连接串，用户名与密码会被转义。
    pub fn database_url(&self) -> AppResult<String> {
        let mut url = url::Url::parse(&format!("mysql://{}/", self.host))
            .map_err(|e| AppError::Config(format!("Invalid MySQL host {}: {}", self.host, e)))?;
        url.set_username(&self.user)
            .map_err(|_| AppError::Config("Invalid MySQL user".to_string()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| AppError::Config("Invalid MySQL password".to_string()))?;
        }
        url.set_path(&self.database);
        Ok(url.to_string())
    }
}

/// 安装环境。配置文件存在即视为已安装。
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Environment {
    #[serde(skip)]
    pub installed: bool,
    #[serde(rename = "appPort")]
    pub app_port: String,
    pub mysql: MySqlSettings,
}

impl Environment {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self {
                app_port: ":8080".to_string(),
                ..Default::default()
            });
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut env: Environment = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        env.installed = true;
        Ok(env)
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to encode environment: {}", e)))?;
        std::fs::write(path, text)
            .map_err(|e| AppError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// 监听地址。`appPort` 形如 `:8080`。
    pub fn bind_address(&self, host: &str) -> String {
        let port = self.app_port.trim_start_matches(':');
        let port = if port.is_empty() { "8080" } else { port };
        format!("{}:{}", host, port)
    }
}
