//! Repository layer for the task service.
//!
//! Follows the Handler -> Service -> Repository split. Services talk to the
//! traits below; two backends implement them:
//! - `postgres` - `sqlx::PgPool`, used when `DATABASE_URL` is set
//! - `memory` - process-local maps, used otherwise and by the test harness
//!
//! Both backends also implement [`CredentialStore`](crate::auth::CredentialStore).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::TaskError;
use crate::models::{NewTask, NewUser, Task, TaskQuery, User};
use async_trait::async_trait;

/// Message for a second registration with the same email.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already exists";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, TaskError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, TaskError>;

    async fn user_email_exists(&self, email: &str) -> Result<bool, TaskError>;

    /// Insert a user. A duplicate email yields
    /// `BadRequest(DUPLICATE_EMAIL_MESSAGE)`.
    async fn create_user(&self, user: NewUser) -> Result<User, TaskError>;

    async fn list_user_ids(&self) -> Result<Vec<i64>, TaskError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> Result<Task, TaskError>;

    async fn find_task(&self, id: i64) -> Result<Option<Task>, TaskError>;

    /// One page of `owner_id`'s tasks plus the total number of matches.
    async fn search_tasks(
        &self,
        owner_id: i64,
        query: &TaskQuery,
    ) -> Result<(Vec<Task>, u64), TaskError>;

    /// Move the task from `open` to `done`.
    ///
    /// Returns `None` when the task is missing or no longer open, so two
    /// concurrent completions cannot both succeed.
    async fn complete_task_if_open(&self, id: i64) -> Result<Option<Task>, TaskError>;

    /// Returns whether a row was removed.
    async fn delete_task(&self, id: i64) -> Result<bool, TaskError>;

    async fn count_tasks(&self) -> Result<u64, TaskError>;
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
