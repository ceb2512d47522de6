// Engine and router tests run without MySQL: tasks use the in-memory store,
// router tests only hit handlers that never reach the database.

pub mod auto_login;
pub mod router;
pub mod tasks;
