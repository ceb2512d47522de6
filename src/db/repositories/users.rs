use crate::db::models::User;
use crate::orm::{self, Executor, OrmError, OrmResult, Statement};

pub struct UserRepo;

impl UserRepo {
    pub fn all<E: Executor + ?Sized>(conn: &mut E) -> OrmResult<Vec<User>> {
        orm::load(conn, &Statement::new("SELECT * FROM `user` ORDER BY `id`"))
    }

    pub fn find_by_account<E: Executor + ?Sized>(conn: &mut E, account: &str) -> OrmResult<Option<User>> {
        let mut user = User {
            account: account.to_string(),
            ..Default::default()
        };
        match orm::read(conn, &mut user, &["account"]) {
            Ok(()) => Ok(Some(user)),
            Err(OrmError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
