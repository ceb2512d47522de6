use crate::db::models::Notice;
use crate::orm::{self, Executor, OrmResult, Statement};

pub struct NoticeRepo;

impl NoticeRepo {
    pub fn list_for<E: Executor + ?Sized>(conn: &mut E, uid: i64) -> OrmResult<Vec<Notice>> {
        let stmt = Statement::new("SELECT * FROM `notice` WHERE `uid`=? ORDER BY `time` DESC, `id` DESC")
            .bind(uid);
        orm::load(conn, &stmt)
    }

    pub fn delete_all_for<E: Executor + ?Sized>(conn: &mut E, uid: i64) -> OrmResult<u64> {
        let stmt = Statement::new("DELETE FROM `notice` WHERE `uid`=?").bind(uid);
        Ok(conn.execute(&stmt)?.rows_affected)
    }
}
