//! HTTP request handlers.

pub mod auth_handler;
pub mod health;
pub mod task_handler;

pub use auth_handler::{login, logout, register};
pub use health::{health_check, metrics_handler, not_found};
pub use task_handler::{complete_task, create_task, delete_task, get_task, list_tasks};
