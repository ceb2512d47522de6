pub mod api;
pub mod notice;
pub mod project;
pub mod task;
pub mod user;

pub use api::*;
pub use notice::*;
pub use project::*;
pub use task::*;
pub use user::*;
