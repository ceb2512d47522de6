use crate::db::models::ProjectMember;
use crate::orm::{self, Executor, OrmResult, Statement};

pub struct ProjectRepo;

impl ProjectRepo {
    pub fn members<E: Executor + ?Sized>(conn: &mut E, pid: i64) -> OrmResult<Vec<ProjectMember>> {
        let stmt = Statement::new("SELECT * FROM `projectmember` WHERE `pid`=? ORDER BY `id`").bind(pid);
        orm::load(conn, &stmt)
    }

    pub fn find_member<E: Executor + ?Sized>(
        conn: &mut E,
        pid: i64,
        uid: i64,
    ) -> OrmResult<Option<ProjectMember>> {
        let stmt = Statement::new("SELECT * FROM `projectmember` WHERE `pid`=? AND `uid`=?")
            .bind(pid)
            .bind(uid);
        Ok(orm::load(conn, &stmt)?.into_iter().next())
    }

    /// 用户参与的项目 ID
    pub fn project_ids_of<E: Executor + ?Sized>(conn: &mut E, uid: i64) -> OrmResult<Vec<i64>> {
        let stmt = Statement::new("SELECT * FROM `projectmember` WHERE `uid`=? ORDER BY `pid`").bind(uid);
        let members: Vec<ProjectMember> = orm::load(conn, &stmt)?;
        Ok(members.into_iter().map(|m| m.pid).collect())
    }

    pub fn is_admin<E: Executor + ?Sized>(conn: &mut E, pid: i64, uid: i64) -> OrmResult<bool> {
        let stmt = Statement::new(
            "SELECT COUNT(*) AS `count` FROM `projectmember` WHERE `pid`=? AND `uid`=? AND `isadmin`=1",
        )
        .bind(pid)
        .bind(uid);
        Ok(orm::scalar(conn, &stmt)? > 0)
    }

    pub fn delete_member<E: Executor + ?Sized>(conn: &mut E, pid: i64, uid: i64) -> OrmResult<u64> {
        let stmt = Statement::new("DELETE FROM `projectmember` WHERE `pid`=? AND `uid`=?")
            .bind(pid)
            .bind(uid);
        Ok(conn.execute(&stmt)?.rows_affected)
    }
}
