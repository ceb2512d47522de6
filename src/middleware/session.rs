use crate::AppState;
use crate::session::{Session, SessionContext};
use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// 客户端地址：优先取代理头，其次取连接对端地址。
pub fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 单个请求的 cookie 读写上下文。写入的 cookie 需要随响应一起返回。
#[derive(Debug, Clone)]
pub struct HttpContext {
    ip: String,
    jar: CookieJar,
}

impl HttpContext {
    pub fn new(ip: impl Into<String>, jar: CookieJar) -> Self {
        Self {
            ip: ip.into(),
            jar,
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        let peer = request.extensions().get::<ConnectInfo<SocketAddr>>();
        Self::new(
            client_ip(request.headers(), peer),
            CookieJar::from_headers(request.headers()),
        )
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// 取出 cookie jar 作为响应的一部分，只会输出本次请求新写入的 cookie。
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl SessionContext for HttpContext {
    fn remote_ip(&self) -> String {
        self.ip.clone()
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|c| c.value().to_string())
    }

    fn set_cookie(&mut self, cookie: Cookie<'static>) {
        self.jar = self.jar.clone().add(cookie);
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HttpContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(Self::new(
            client_ip(&parts.headers, peer),
            CookieJar::from_headers(&parts.headers),
        ))
    }
}

/// 为每个请求启动（或续期）会话，并把会话放入请求扩展。
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Response {
    let mut ctx = HttpContext::from_request(&request);
    let session = state.sessions.start(&mut ctx);
    request.extensions_mut().insert(session);

    let response = next.run(request).await;
    (ctx.into_jar(), response).into_response()
}

/// 当前会话提取器
pub struct CurrentSession(pub Arc<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = crate::error::AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Session>>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| crate::error::AppError::internal("Session middleware is not installed"))
    }
}
