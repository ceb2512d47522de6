use crate::session::Session;
use axum::{http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// 请求日志：为每个请求生成 trace_id，并在结束时记录状态码、耗时与登录用户。
pub async fn logger<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let trace_id = Uuid::new_v4();
    req.extensions_mut().insert(trace_id);
    let method = req.method().clone();
    let uri = req.uri().clone();
    let session = req.extensions().get::<Arc<Session>>().cloned();
    let start = Instant::now();

    let span = info_span!("request", trace_id = %trace_id, method = %method, uri = %uri);
    let response = next.run(req).instrument(span).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed().as_millis();
    // 自动登录可能在本次请求中写入 uid，因此在处理完成后读取
    let user_id = session.and_then(|s| s.user_id());

    info!(trace_id = %trace_id, method = %method, uri = %uri, status = status, elapsed_ms = elapsed, user_id = ?user_id, "Request log");
    response
}
