use axum_extra::extract::cookie::Cookie;
use bcrypt::{hash, verify};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use crate::{
    cache::CacheManager,
    config::PasswordSettings,
    db::models::User,
    db::repositories::UserRepo,
    error::{AppError, AppResult, OrmResultExt, ensure},
    middleware::auth::AutoLoginService,
    orm::{self, Executor},
    services::context::RequestContext,
};

const BAD_CREDENTIALS: &str = "帐号或密码不正确";

pub struct AuthService;

impl AuthService {
    /// 旧格式的密码摘要：大写十六进制 MD5。
    pub fn legacy_digest(password: &str) -> String {
        hex::encode_upper(Md5::digest(password.as_bytes()))
    }

    fn is_bcrypt(stored: &str) -> bool {
        stored.starts_with("$2")
    }

    /// 同时识别 MD5 与 bcrypt 两种存储格式。
    pub fn verify_password(stored: &str, password: &str) -> AppResult<bool> {
        if Self::is_bcrypt(stored) {
            return Ok(verify(password, stored)?);
        }
        Ok(stored.eq_ignore_ascii_case(&Self::legacy_digest(password)))
    }

    /// 按配置生成新的密码摘要：开启升级时使用 bcrypt，否则保持 MD5。
    pub fn hash_password(password: &str, settings: &PasswordSettings) -> AppResult<String> {
        if settings.upgrade {
            Ok(hash(password, settings.bcrypt_cost)?)
        } else {
            Ok(Self::legacy_digest(password))
        }
    }

    pub fn login<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        settings: &PasswordSettings,
        account: &str,
        password: &str,
    ) -> AppResult<User> {
        let mut user = UserRepo::find_by_account(conn, account)
            .or_fail("读取用户信息失败")?
            .ok_or_else(|| AppError::fail(BAD_CREDENTIALS))?;

        if !Self::verify_password(&user.password, password)? {
            tracing::info!(account, "Login rejected: bad credentials");
            return Err(AppError::fail(BAD_CREDENTIALS));
        }
        if user.is_locked {
            tracing::info!(account, "Login rejected: account locked");
            return Err(AppError::fail("帐号已被禁止登录，请联系管理员解除锁定！"));
        }

        if settings.upgrade && !Self::is_bcrypt(&user.password) {
            user.password = hash(password, settings.bcrypt_cost)?;
            match orm::update(conn, &user) {
                Ok(_) => tracing::info!(user_id = user.id, "Password hash upgraded to bcrypt"),
                Err(e) => tracing::warn!(user_id = user.id, "Failed to upgrade password hash: {}", e),
            }
        }

        cache.users.put(user.clone());
        tracing::info!(user_id = user.id, account, "Login succeeded");
        Ok(user)
    }

    /// 签发自动登录 cookie 并保存过期时间。
    pub fn remember<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        service: &AutoLoginService,
        mut user: User,
        ip: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Cookie<'static>> {
        let cookie = service.issue(&mut user, ip, now)?;
        orm::update(conn, &user).or_fail("更新数据库失败")?;
        cache.users.put(user);
        Ok(cookie)
    }

    pub fn profile<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        ctx: &RequestContext,
    ) -> AppResult<User> {
        cache
            .find_user(conn, ctx.user_id)
            .or_fail("读取用户信息失败")?
            .map(|user| (*user).clone())
            .ok_or_else(|| AppError::fail("用户不存在或已被删除"))
    }

    /// 修改密码。成功后已签发的自动登录凭证全部失效。
    pub fn change_password<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        settings: &PasswordSettings,
        ctx: &RequestContext,
        old: &str,
        new: &str,
        confirm: &str,
    ) -> AppResult<()> {
        let mut user = Self::profile(conn, cache, ctx)?;
        ensure(Self::verify_password(&user.password, old)?, "原始密码错误")?;
        ensure(new == confirm, "两次输入的新密码不一致")?;

        user.password = Self::hash_password(new, settings)?;
        user.auto_login_expire = 0;
        orm::update(conn, &user).or_fail("更新密码失败")?;
        cache.users.delete(user.id);

        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// 创建超级管理员（安装流程的最后一步）。
    pub fn create_admin<E: Executor + ?Sized>(
        conn: &mut E,
        settings: &PasswordSettings,
        account: &str,
        name: &str,
        password: &str,
    ) -> AppResult<User> {
        let mut user = User {
            account: account.to_string(),
            name: name.to_string(),
            password: Self::hash_password(password, settings)?,
            is_su: true,
            ..Default::default()
        };
        orm::insert_returning(conn, &mut user).or_fail("创建默认管理员失败")?;
        tracing::info!(user_id = user.id, account, "Administrator created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::RecordingExecutor;
    use crate::orm::{Row, Value};

    fn legacy() -> PasswordSettings {
        PasswordSettings {
            upgrade: false,
            bcrypt_cost: 4,
        }
    }

    fn user_row(password: &str, locked: bool) -> Row {
        Row::new(vec![
            ("id".to_string(), Value::Int(1)),
            ("account".to_string(), Value::Text("admin".into())),
            ("name".to_string(), Value::Text("Admin".into())),
            ("password".to_string(), Value::Text(password.into())),
            ("islocked".to_string(), Value::Bool(locked)),
        ])
    }

    #[test]
    fn test_legacy_digest_is_upper_hex() {
        assert_eq!(
            AuthService::legacy_digest("pass"),
            "1A1DC91C907325C69271DDF0C944BC72"
        );
    }

    #[test]
    fn test_verify_both_formats() {
        let digest = AuthService::legacy_digest("pass");
        assert!(AuthService::verify_password(&digest, "pass").unwrap());
        assert!(!AuthService::verify_password(&digest, "nope").unwrap());

        let bcrypted = hash("pass", 4).unwrap();
        assert!(AuthService::verify_password(&bcrypted, "pass").unwrap());
    }

    #[test]
    fn test_login_success_fills_cache() {
        let mut conn = RecordingExecutor::with_rows(vec![user_row(&AuthService::legacy_digest("pass"), false)]);
        let cache = CacheManager::new();
        let user = AuthService::login(&mut conn, &cache, &legacy(), "admin", "pass").unwrap();
        assert_eq!(user.id, 1);
        assert!(cache.users.get(1).is_some());
        assert_eq!(conn.statements.len(), 1);
    }

    #[test]
    fn test_login_failures() {
        let cache = CacheManager::new();
        let mut conn = RecordingExecutor::default();
        let err = AuthService::login(&mut conn, &cache, &legacy(), "ghost", "pass").unwrap_err();
        assert_eq!(err.to_string(), BAD_CREDENTIALS);

        let mut conn = RecordingExecutor::with_rows(vec![user_row(&AuthService::legacy_digest("pass"), true)]);
        let err = AuthService::login(&mut conn, &cache, &legacy(), "admin", "pass").unwrap_err();
        assert_eq!(err.to_string(), "帐号已被禁止登录，请联系管理员解除锁定！");
    }

    #[test]
    fn test_login_upgrades_legacy_hash_when_enabled() {
        let mut conn = RecordingExecutor::with_rows(vec![user_row(&AuthService::legacy_digest("pass"), false)]);
        let cache = CacheManager::new();
        let settings = PasswordSettings {
            upgrade: true,
            bcrypt_cost: 4,
        };
        let user = AuthService::login(&mut conn, &cache, &settings, "admin", "pass").unwrap();
        assert!(user.password.starts_with("$2"));
        assert!(conn.statements[1].sql.starts_with("UPDATE `user` SET"));
    }

    #[test]
    fn test_change_password_revokes_auto_login() {
        let cache = CacheManager::new();
        cache.users.put(User {
            id: 1,
            password: AuthService::legacy_digest("old"),
            auto_login_expire: 99,
            ..Default::default()
        });
        let mut conn = RecordingExecutor::default();
        let ctx = RequestContext::new(1);

        let err = AuthService::change_password(&mut conn, &cache, &legacy(), &ctx, "bad", "n", "n")
            .unwrap_err();
        assert_eq!(err.to_string(), "原始密码错误");
        let err = AuthService::change_password(&mut conn, &cache, &legacy(), &ctx, "old", "n", "m")
            .unwrap_err();
        assert_eq!(err.to_string(), "两次输入的新密码不一致");

        AuthService::change_password(&mut conn, &cache, &legacy(), &ctx, "old", "new", "new").unwrap();
        let update = &conn.statements[0];
        assert!(update.params.contains(&Value::Text(AuthService::legacy_digest("new"))));
        assert!(update.params.contains(&Value::UInt(0)));
        assert!(cache.users.get(1).is_none());
    }

    #[test]
    fn test_profile_reports_read_failure() {
        let mut conn = RecordingExecutor::failing_at(0);
        let cache = CacheManager::new();
        let err = AuthService::profile(&mut conn, &cache, &RequestContext::new(1)).unwrap_err();
        assert_eq!(err.to_string(), "Storage error: 读取用户信息失败");
    }

    #[test]
    fn test_create_admin_is_super_user() {
        let mut conn = RecordingExecutor::default();
        let user = AuthService::create_admin(&mut conn, &legacy(), "admin", "Admin", "pass").unwrap();
        assert_eq!(user.id, 1);
        assert!(user.is_su);
        assert_eq!(user.password, "1A1DC91C907325C69271DDF0C944BC72");
    }
}
