pub mod auth;
pub mod install;
pub mod logger;
pub mod session;

pub use auth::{AutoLoginService, CurrentUser, auto_login, must_login};
pub use install::{must_installed, must_not_installed};
pub use session::{CurrentSession, HttpContext, session_middleware};
