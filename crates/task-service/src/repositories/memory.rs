//! In-memory storage with the same semantics as the Postgres backend.

use super::{TaskRepository, UserRepository, DUPLICATE_EMAIL_MESSAGE};
use crate::auth::{CredentialStore, Identity};
use crate::errors::TaskError;
use crate::models::{NewTask, NewUser, SortDirection, SortField, Task, TaskQuery, TaskStatus, User};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

/// Process-local store. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_query(task: &Task, owner_id: i64, query: &TaskQuery) -> bool {
    if task.owner_id != owner_id {
        return false;
    }
    if query.status.is_some_and(|status| task.status != status) {
        return false;
    }
    if query.created_from.is_some_and(|from| task.created_at < from) {
        return false;
    }
    if query.created_to.is_some_and(|to| task.created_at > to) {
        return false;
    }
    if let Some(needle) = &query.search {
        let in_title = task.title.to_lowercase().contains(needle.as_str());
        let in_description = task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle.as_str()));
        if !in_title && !in_description {
            return false;
        }
    }
    true
}

fn compare_tasks(a: &Task, b: &Task, field: SortField, direction: SortDirection) -> Ordering {
    let primary = match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Title => a.title.cmp(&b.title),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    let ordering = primary.then_with(|| a.id.cmp(&b.id));

    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, TaskError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, TaskError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_email_exists(&self, email: &str) -> Result<bool, TaskError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, TaskError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(TaskError::BadRequest(DUPLICATE_EMAIL_MESSAGE.to_string()));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>, TaskError> {
        Ok(self.tables.read().await.users.keys().copied().collect())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, TaskError> {
        let mut tables = self.tables.write().await;

        tables.next_task_id += 1;
        let created = Task {
            id: tables.next_task_id,
            title: task.title,
            description: task.description,
            status: task.status,
            owner_id: task.owner_id,
            created_at: task.created_at,
            updated_at: task.created_at,
        };
        tables.tasks.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, TaskError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn search_tasks(
        &self,
        owner_id: i64,
        query: &TaskQuery,
    ) -> Result<(Vec<Task>, u64), TaskError> {
        let tables = self.tables.read().await;

        let mut matching: Vec<&Task> = tables
            .tasks
            .values()
            .filter(|t| matches_query(t, owner_id, query))
            .collect();
        matching.sort_by(|a, b| compare_tasks(a, b, query.sort_field, query.sort_direction));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(0);

        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn complete_task_if_open(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let mut tables = self.tables.write().await;

        match tables.tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Open => {
                task.status = TaskStatus::Done;
                task.updated_at = Utc::now();
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, id: i64) -> Result<bool, TaskError> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn count_tasks(&self) -> Result<u64, TaskError> {
        Ok(self.tables.read().await.tasks.len() as u64)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn resolve(&self, subject_id: i64) -> Result<Option<Identity>, TaskError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .contains_key(&subject_id)
            .then(|| Identity::new(subject_id)))
    }
}
