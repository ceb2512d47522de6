pub mod auth_service;
pub mod context;
pub mod install_service;
pub mod notices_service;
pub mod projects_service;
pub mod task_lifecycle;
pub mod task_store;
pub mod tasks_service;

pub use auth_service::AuthService;
pub use context::RequestContext;
pub use install_service::{InstallProgress, InstallService, InstallStatus};
pub use notices_service::NoticesService;
pub use projects_service::ProjectsService;
pub use task_lifecycle::{NewTask, TaskLifecycle};
pub use task_store::{MemoryTaskStore, OrmTaskStore, TaskStore};
pub use tasks_service::TasksService;
