use crate::error::{AppResult, ensure};
use chrono::NaiveDateTime;

pub fn validate_create_task(name: &str, content: &str, developer: i64, tester: i64) -> AppResult<()> {
    ensure(!name.trim().is_empty(), "任务名不可为空")?;
    ensure(name.chars().count() <= 128, "任务名过长")?;
    ensure(!content.trim().is_empty(), "任务详情不可为空")?;
    ensure(developer > 0, "开发人员未指定")?;
    ensure(tester > 0, "测试/验收人员未指定")?;
    Ok(())
}

pub fn validate_task_name(name: &str) -> AppResult<()> {
    ensure(!name.trim().is_empty(), "任务名不可为空")?;
    ensure(name.chars().count() <= 128, "任务名过长")
}

pub fn validate_time_range(start: &NaiveDateTime, end: &NaiveDateTime) -> AppResult<()> {
    ensure(start <= end, "开始时间不能晚于结束时间")
}
