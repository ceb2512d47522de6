use crate::AppState;
use crate::config::AutoLoginSettings;
use crate::db::models::User;
use crate::error::{AppError, AppResult, OrmResultExt};
use crate::middleware::session::HttpContext;
use crate::session::{SESSION_UID_KEY, Session, SessionContext, to_offset};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// 自动登录 cookie 名
pub const AUTO_LOGIN_COOKIE: &str = "login_token";

/// 自动登录凭证，cookie 中保存其 JSON 的 base64 编码。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoLoginToken {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "Sign")]
    pub sign: String,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("malformed token")]
    Malformed,
    #[error("client address changed")]
    AddressMismatch,
    #[error("signature mismatch")]
    BadSignature,
    #[error("unknown user")]
    UnknownUser,
    #[error("user is locked")]
    Locked,
    #[error("token expired")]
    Expired,
}

#[derive(Clone, Debug)]
pub struct AutoLoginConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl Default for AutoLoginConfig {
    fn default() -> Self {
        Self {
            secret: "@team.auto_login_secret_01".to_string(),
            ttl: Duration::days(30),
        }
    }
}

impl From<AutoLoginSettings> for AutoLoginConfig {
    fn from(settings: AutoLoginSettings) -> Self {
        Self {
            secret: settings.secret,
            ttl: Duration::days(settings.ttl_days),
        }
    }
}

/// 签发与校验自动登录凭证
#[derive(Clone, Debug, Default)]
pub struct AutoLoginService {
    config: AutoLoginConfig,
}

impl AutoLoginService {
    pub fn new(config: AutoLoginConfig) -> Self {
        Self { config }
    }

    /// 大写十六进制的 MD5(`id|ip|secret`)
    pub fn sign(&self, id: i64, ip: &str) -> String {
        let digest = Md5::digest(format!("{}|{}|{}", id, ip, self.config.secret).as_bytes());
        hex::encode_upper(digest)
    }

    pub fn encode(&self, id: i64, ip: &str) -> AppResult<String> {
        let token = AutoLoginToken {
            id,
            ip: ip.to_string(),
            sign: self.sign(id, ip),
        };
        let json = serde_json::to_vec(&token)
            .map_err(|e| AppError::internal(format!("Failed to encode login token: {}", e)))?;
        Ok(STANDARD.encode(json))
    }

    /// 为用户签发凭证，同时把过期时间写到 `user` 上（由调用方持久化）。
    pub fn issue(&self, user: &mut User, ip: &str, now: DateTime<Utc>) -> AppResult<Cookie<'static>> {
        let expire = now + self.config.ttl;
        let value = self.encode(user.id, ip)?;
        user.auto_login_expire = u64::try_from(expire.timestamp()).unwrap_or_default();

        Ok(Cookie::build(AUTO_LOGIN_COOKIE, value)
            .path("/")
            .expires(to_offset(expire))
            .http_only(true)
            .finish())
    }

    /// 解码凭证并核对地址与签名，返回凭证声明的用户 ID。
    pub fn authenticate(&self, token: &str, ip: &str) -> Result<i64, TokenRejection> {
        let raw = STANDARD
            .decode(token.trim())
            .map_err(|_| TokenRejection::Malformed)?;
        let payload: AutoLoginToken =
            serde_json::from_slice(&raw).map_err(|_| TokenRejection::Malformed)?;

        if payload.ip != ip {
            return Err(TokenRejection::AddressMismatch);
        }

        if payload.sign != self.sign(payload.id, &payload.ip) {
            return Err(TokenRejection::BadSignature);
        }
        Ok(payload.id)
    }

    /// 凭证对应的用户是否仍可自动登录。
    pub fn admit(&self, user: Option<&User>, now: DateTime<Utc>) -> Result<i64, TokenRejection> {
        let user = user.ok_or(TokenRejection::UnknownUser)?;
        if user.is_locked {
            return Err(TokenRejection::Locked);
        }
        if !user.accepts_auto_login(now.timestamp()) {
            return Err(TokenRejection::Expired);
        }
        Ok(user.id)
    }

    /// 校验凭证，成功时返回用户 ID。
    pub fn verify<F>(
        &self,
        token: &str,
        ip: &str,
        now: DateTime<Utc>,
        lookup: F,
    ) -> Result<i64, TokenRejection>
    where
        F: FnOnce(i64) -> Option<Arc<User>>,
    {
        let id = self.authenticate(token, ip)?;
        self.admit(lookup(id).as_deref(), now)
    }

    pub fn clear_cookie() -> Cookie<'static> {
        Cookie::build(AUTO_LOGIN_COOKIE, "")
            .path("/")
            .max_age(time::Duration::seconds(-1))
            .finish()
    }
}

/// 会话未登录且带有自动登录 cookie 时尝试恢复登录；凭证无效则清除 cookie。
pub async fn auto_login(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    let Some(session) = request.extensions().get::<Arc<Session>>().cloned() else {
        return next.run(request).await;
    };
    if session.has(SESSION_UID_KEY) {
        return next.run(request).await;
    }

    let mut ctx = HttpContext::from_request(&request);
    if let Some(token) = ctx.cookie(AUTO_LOGIN_COOKIE) {
        let ip = ctx.ip().to_string();
        let verified = state
            .blocking(move |state| {
                let claimed = match state.auto_login.authenticate(&token, &ip) {
                    Ok(uid) => uid,
                    Err(reason) => return Ok(Err(reason)),
                };
                let user = state.find_user(claimed).or_fail("读取用户信息失败")?;
                Ok(state.auto_login.admit(user.as_deref(), state.now()))
            })
            .await;

        match verified {
            Ok(Ok(uid)) => {
                tracing::info!(user_id = uid, "Auto login succeeded");
                session.set(SESSION_UID_KEY, uid);
            }
            Ok(Err(reason)) => {
                tracing::info!(ip = %ctx.ip(), "Auto login rejected: {}", reason);
                ctx.set_cookie(AutoLoginService::clear_cookie());
            }
            // 数据库故障时保留凭证，直接返回错误
            Err(e) => return (ctx.into_jar(), e).into_response(),
        }
    }

    let response = next.run(request).await;
    (ctx.into_jar(), response).into_response()
}

/// 要求已登录，否则返回 401。
pub async fn must_login(request: Request<Body>, next: Next<Body>) -> Response {
    let logged_in = request
        .extensions()
        .get::<Arc<Session>>()
        .is_some_and(|session| session.has(SESSION_UID_KEY));

    if logged_in {
        next.run(request).await
    } else {
        AppError::AuthRequired.into_response()
    }
}

/// 当前登录用户 ID 提取器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Session>>()
            .and_then(|session| session.user_id())
            .map(CurrentUser)
            .ok_or(AppError::AuthRequired)
    }
}
