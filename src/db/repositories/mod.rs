pub mod notices;
pub mod projects;
pub mod tasks;
pub mod users;

pub use notices::NoticeRepo;
pub use projects::ProjectRepo;
pub use tasks::TaskRepo;
pub use users::UserRepo;
