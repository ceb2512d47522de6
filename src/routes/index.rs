use crate::AppState;
use axum::{extract::State, response::Html};
use std::sync::Arc;

const APP_NAME: &str = "Team";

/// 前端页面外壳，未安装时挂载安装向导。
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let container = if state.is_installed() { "app" } else { "install" };
    Html(render_shell(container))
}

fn render_shell(container: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
	<head>
		<meta charset="utf-8">
		<meta name="viewport" content="width=device-width, initial-scale=1, shrink-to-fit=no">
		<title>{APP_NAME}</title>
		<link rel="shortcut icon" href="/www/favicon.ico" />
	</head>
	<body>
		<div id="{container}"></div>
		<script src="/www/app.js"></script>
	</body>
</html>
"#
    )
}
