use crate::cache::CacheManager;
use crate::db::models::{Notice, NoticeView};
use crate::db::repositories::NoticeRepo;
use crate::error::{AppResult, OrmResultExt};
use crate::orm::{self, Executor, Record};

const NOTICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct NoticesService;

impl NoticesService {
    pub fn list<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        uid: i64,
    ) -> AppResult<Vec<NoticeView>> {
        let notices = NoticeRepo::list_for(conn, uid).or_fail("拉取通知信息失败")?;
        let mut views = Vec::with_capacity(notices.len());
        for notice in notices {
            let (operator, avatar) = cache
                .find_user_info(conn, notice.operator)
                .or_fail("读取用户信息失败")?;
            views.push(NoticeView {
                id: notice.id,
                time: notice.time.format(NOTICE_TIME_FORMAT).to_string(),
                tid: notice.tid,
                tname: notice.tname,
                operator,
                avatar,
                event: notice.event,
            });
        }
        Ok(views)
    }

    /// 按 ID 删除单条通知。
    pub fn delete_one<E: Executor + ?Sized>(conn: &mut E, id: i64) -> AppResult<()> {
        orm::delete(conn, &Notice::table(), id).or_fail("删除通知失败")?;
        Ok(())
    }

    pub fn delete_all<E: Executor + ?Sized>(conn: &mut E, uid: i64) -> AppResult<()> {
        let removed = NoticeRepo::delete_all_for(conn, uid).or_fail("删除通知失败")?;
        tracing::debug!(user_id = uid, removed, "Notices cleared");
        Ok(())
    }
}
