//! 表单取值。所有值都以字符串提交：整数按十进制解析，布尔值以 "1" 表示真。

use crate::db::models::parse_task_time;
use crate::error::{AppError, AppResult};
use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::FromRequest,
    http::{Request, header::CONTENT_TYPE},
};
use chrono::NaiveDateTime;
use url::form_urlencoded;

/// 查询串与 urlencoded 请求体合并后的表单。
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    pub fn parse(query: Option<&str>, body: &[u8]) -> Self {
        let mut pairs: Vec<(String, String)> = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        pairs.extend(form_urlencoded::parse(body).into_owned());
        Self { pairs }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn string(&self, name: &str) -> String {
        self.value(name).unwrap_or_default().to_string()
    }

    /// 必填项，缺失或为空时以 `message` 失败。
    pub fn required(&self, name: &str, message: &str) -> AppResult<String> {
        match self.value(name) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(AppError::fail(message)),
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.value(name).is_some_and(|v| !v.is_empty())
    }

    /// 无法解析时为 0
    pub fn int(&self, name: &str) -> i64 {
        self.value(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    /// 超出 i8 范围时为 0
    pub fn int8(&self, name: &str) -> i8 {
        i8::try_from(self.int(name)).unwrap_or_default()
    }

    pub fn required_int(&self, name: &str, message: &str) -> AppResult<i64> {
        self.value(name)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| AppError::fail(message))
    }

    pub fn flag(&self, name: &str) -> bool {
        self.int(name) == 1
    }

    /// 同时接受 `name` 与 `name[]` 两种写法。
    pub fn array(&self, name: &str) -> Vec<&str> {
        let bracketed = format!("{name}[]");
        self.pairs
            .iter()
            .filter(|(key, _)| key == name || *key == bracketed)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn int_array(&self, name: &str) -> Vec<i64> {
        self.array(name)
            .into_iter()
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }

    /// `YYYY-MM-DD` 日期，解析失败时为默认时间。
    pub fn date(&self, name: &str) -> NaiveDateTime {
        self.value(name)
            .and_then(parse_task_time)
            .unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequest<S, Body> for FormValues
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let query = req.uri().query().map(str::to_string);
        let urlencoded = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_param(format!("读取请求失败: {e}")))?;
        let body: &[u8] = if urlencoded { &body } else { &[] };

        Ok(Self::parse(query.as_deref(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_body_merge() {
        let form = FormValues::parse(Some("id=3"), b"name=%E4%BB%BB%E5%8A%A1&weight=2");
        assert_eq!(form.int("id"), 3);
        assert_eq!(form.string("name"), "任务");
        assert_eq!(form.int("weight"), 2);
        assert_eq!(form.int("missing"), 0);
        assert_eq!(form.int8("weight"), 2);
    }

    #[test]
    fn test_int8_out_of_range() {
        let form = FormValues::parse(None, b"branch=300");
        assert_eq!(form.int8("branch"), 0);
    }

    #[test]
    fn test_required_rejects_empty() {
        let form = FormValues::parse(None, b"name=&dev=abc");
        assert_eq!(
            form.required("name", "任务名不可为空").unwrap_err().to_string(),
            "任务名不可为空"
        );
        assert!(form.required_int("dev", "开发人员未指定").is_err());
        assert!(!form.is_set("name"));
    }

    #[test]
    fn test_arrays_and_flags() {
        let form = FormValues::parse(None, b"tags%5B%5D=1&tags%5B%5D=x&tags=3&remember=1&isAdmin=0");
        assert_eq!(form.int_array("tags"), vec![1, 3]);
        assert!(form.flag("remember"));
        assert!(!form.flag("isAdmin"));
    }

    #[test]
    fn test_dates() {
        let form = FormValues::parse(None, b"startTime=2024-05-06&endTime=bad");
        assert_eq!(form.date("startTime").to_string(), "2024-05-06 00:00:00");
        assert_eq!(form.date("endTime"), NaiveDateTime::default());
    }
}
