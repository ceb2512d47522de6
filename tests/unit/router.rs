use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use team_backend::config::{Config, Environment};
use team_backend::{AppState, routes::create_router};
use tower::ServiceExt;

fn app(installed: bool) -> axum::Router {
    let environment = Environment {
        installed,
        app_port: ":8080".to_string(),
        ..Default::default()
    };
    create_router(Arc::new(AppState::new(Config::default(), environment)))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_requires_login() {
    let response = app(true).oneshot(get("/api/task/mine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["err"], "请先登录后操作");
}

#[tokio::test]
async fn test_api_rejected_before_install() {
    let response = app(false).oneshot(get("/api/user")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["err"], "系统尚未初始化");
}

#[tokio::test]
async fn test_session_cookie_is_issued() {
    let response = app(true).oneshot(get("/api/user")).await.unwrap();
    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("session_id=")));
}

#[tokio::test]
async fn test_install_status_starts_empty() {
    let response = app(false).oneshot(get("/install/status")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"]["done"], false);
    assert_eq!(json["data"]["isError"], false);
    assert_eq!(json["data"]["status"], serde_json::json!([]));
}

#[tokio::test]
async fn test_install_closed_after_install() {
    let response = app(true).oneshot(get("/install/status")).await.unwrap();
    assert_eq!(body_json(response).await["err"], "系统已经初始化完成");
}

#[tokio::test]
async fn test_configure_validates_port() {
    let request = Request::builder()
        .method("POST")
        .uri("/install/configure")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("port=0&mysqlHost=127.0.0.1&mysqlUser=root&mysqlPswd=&mysqlDB=team"))
        .unwrap();
    let response = app(false).oneshot(request).await.unwrap();
    assert_eq!(body_json(response).await["err"], "无效的端口参数");
}

#[tokio::test]
async fn test_login_requires_install() {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("account=admin&password=pass"))
        .unwrap();
    let response = app(false).oneshot(request).await.unwrap();
    assert_eq!(body_json(response).await["err"], "系统尚未初始化");
}

#[tokio::test]
async fn test_index_shell_follows_install_state() {
    let response = app(false).oneshot(get("/")).await.unwrap();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains(r#"<div id="install"></div>"#));

    let response = app(true).oneshot(get("/")).await.unwrap();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains(r#"<div id="app"></div>"#));
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .body(Body::empty())
        .unwrap();
    let response = app(true).oneshot(request).await.unwrap();
    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("login_token=;") || c.starts_with("login_token=\"\"")));
    assert_eq!(body_json(response).await, serde_json::json!({}));
}

fn with_token(token: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/user")
        .header("x-forwarded-for", "10.1.1.1")
        .header(header::COOKIE, format!("login_token={token}"))
        .body(Body::empty())
        .unwrap()
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_auto_login_lookup_failure_is_reported() {
    // 已安装但连接池未打开：读取用户必然失败
    let environment = Environment {
        installed: true,
        app_port: ":8080".to_string(),
        ..Default::default()
    };
    let state = Arc::new(AppState::new(Config::default(), environment));
    let token = state.auto_login.encode(7, "10.1.1.1").unwrap();

    let response = create_router(state).oneshot(with_token(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!set_cookies(&response).iter().any(|c| c.starts_with("login_token=")));
    assert_eq!(body_json(response).await["err"], "读取用户信息失败");
}

#[tokio::test]
async fn test_rejected_auto_login_clears_token() {
    let response = app(true).oneshot(with_token("bm90LWpzb24=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).iter().any(|c| c.starts_with("login_token=")));
}
