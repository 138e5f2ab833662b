//! Postgres-backed storage.

use super::{escape_like, TaskRepository, UserRepository, DUPLICATE_EMAIL_MESSAGE};
use crate::auth::{CredentialStore, Identity};
use crate::errors::TaskError;
use crate::models::{NewTask, NewUser, Task, TaskQuery, TaskStatus, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

const TASK_COLUMNS: &str = "id, title, description, status, owner_id, created_at, updated_at";

/// Raw `tasks` row; `status` is checked on conversion.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    owner_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = TaskError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<TaskStatus>().map_err(|_| {
            TaskError::Database(format!("Unknown task status in row {}: {}", row.id, row.status))
        })?;

        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Storage on a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Owner, status, date range and text filters shared by the page and count
/// queries.
fn push_task_filters(builder: &mut QueryBuilder<'_, Postgres>, owner_id: i64, query: &TaskQuery) {
    builder.push(" WHERE owner_id = ").push_bind(owner_id);

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }

    if let Some(from) = query.created_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }

    if let Some(to) = query.created_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }

    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, TaskError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::Database(format!("Failed to fetch user by email: {}", e)))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, TaskError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::Database(format!("Failed to fetch user by id: {}", e)))
    }

    async fn user_email_exists(&self, email: &str) -> Result<bool, TaskError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to check email: {}", e)))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, TaskError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                TaskError::BadRequest(DUPLICATE_EMAIL_MESSAGE.to_string())
            } else {
                TaskError::Database(format!("Failed to create user: {}", e))
            }
        })
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>, TaskError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to list users: {}", e)))
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, TaskError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.owner_id)
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TaskError::Database(format!("Failed to create task: {}", e)))?;

        Task::try_from(row)
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::Database(format!("Failed to fetch task: {}", e)))?;

        row.map(Task::try_from).transpose()
    }

    async fn search_tasks(
        &self,
        owner_id: i64,
        query: &TaskQuery,
    ) -> Result<(Vec<Task>, u64), TaskError> {
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_task_filters(&mut count_builder, owner_id, query);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to count tasks: {}", e)))?;

        let mut page_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_task_filters(&mut page_builder, owner_id, query);

        // Column and direction come from closed enums, never from input.
        let direction = query.sort_direction.as_sql();
        page_builder
            .push(format!(
                " ORDER BY {} {direction}, id {direction}",
                query.sort_field.column()
            ))
            .push(" LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows: Vec<TaskRow> = page_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to search tasks: {}", e)))?;

        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((tasks, u64::try_from(total).unwrap_or(0)))
    }

    async fn complete_task_if_open(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET status = 'done', updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::Database(format!("Failed to complete task: {}", e)))?;

        row.map(Task::try_from).transpose()
    }

    async fn delete_task(&self, id: i64) -> Result<bool, TaskError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to delete task: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_tasks(&self) -> Result<u64, TaskError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to count tasks: {}", e)))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn resolve(&self, subject_id: i64) -> Result<Option<Identity>, TaskError> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TaskError::Database(format!("Failed to resolve user: {}", e)))?;

        Ok(id.map(Identity::new))
    }
}
