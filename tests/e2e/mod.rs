// End-to-end checks against a running server backed by MySQL.
// Start a fresh server (no team.json) before running with `--ignored`.

use reqwest::{Client, header::SET_COOKIE};
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "http://127.0.0.1:8080";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

async fn post_form(client: &Client, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
    client
        .post(format!("{BASE_URL}{path}"))
        .form(form)
        .send()
        .await
        .expect("request failed")
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_install_and_bootstrap_admin() {
    let client = client();
    let host = env_or("TEST_MYSQL_HOST", "127.0.0.1:3306");
    let user = env_or("TEST_MYSQL_USER", "root");
    let password = env_or("TEST_MYSQL_PASSWORD", "");
    let database = env_or("TEST_MYSQL_DB", "team_test");

    let response = post_form(
        &client,
        "/install/configure",
        &[
            ("port", "8080"),
            ("mysqlHost", &host),
            ("mysqlUser", &user),
            ("mysqlPswd", &password),
            ("mysqlDB", &database),
        ],
    )
    .await;
    assert_eq!(response.json::<Value>().await.unwrap(), serde_json::json!({}));

    let mut done = false;
    for _ in 0..50 {
        let status: Value = client
            .get(format!("{BASE_URL}/install/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["data"]["isError"], false, "install failed: {status}");
        if status["data"]["done"] == true {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(done, "install did not finish in time");

    let response = post_form(
        &client,
        "/install/admin",
        &[("account", "admin"), ("name", "Admin"), ("pswd", "pass")],
    )
    .await;
    assert_eq!(response.json::<Value>().await.unwrap(), serde_json::json!({}));

    let me: Value = post_form(&client, "/login", &[("account", "admin"), ("password", "pass")])
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(me, serde_json::json!({}));
    let profile: Value = client
        .get(format!("{BASE_URL}/api/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["data"]["isSu"], true);
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_login_then_auto_login() {
    let response = post_form(
        &client(),
        "/login",
        &[("account", "admin"), ("password", "pass"), ("remember", "1")],
    )
    .await;
    let token = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|c| c.strip_prefix("login_token="))
        .and_then(|c| c.split(';').next())
        .map(str::to_string)
        .expect("login_token cookie");
    assert_eq!(response.json::<Value>().await.unwrap(), serde_json::json!({}));

    // 没有会话 cookie，只带自动登录凭证
    let fresh = Client::new();
    let status = fresh
        .get(format!("{BASE_URL}/api/user"))
        .header("cookie", format!("login_token={token}"))
        .send()
        .await
        .unwrap()
        .status();
    assert!(status.is_success());

    let status = fresh
        .get(format!("{BASE_URL}/api/user"))
        .header("cookie", format!("login_token={token}"))
        .header("x-forwarded-for", "10.9.9.9")
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
}
