//! Domain models, request DTOs and response DTOs.
//!
//! Request types carry their own `validate()` so handlers can return a
//! field-level 400 before touching storage. All JSON on the wire is camelCase.

use crate::errors::TaskError;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default page size for task listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Response envelope
// ============================================================================

/// Uniform response envelope: `{success, message, body?, errors}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
    pub errors: Option<Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(body: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            body: Some(body),
            errors: None,
        }
    }

    /// Success without a payload (e.g. delete, logout).
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            body: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>, errors: Option<Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            body: None,
            errors,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Stored user record.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields needed to insert a user.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }

    /// The only lifecycle transition: `Open -> Done`. `Done` is terminal.
    pub fn complete(self) -> Result<TaskStatus, TaskError> {
        match self {
            TaskStatus::Open => Ok(TaskStatus::Done),
            TaskStatus::Done => Err(TaskError::Conflict(
                "Task status is already done".to_string(),
            )),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "done" => Ok(TaskStatus::Done),
            _ => Err(TaskError::BadRequest(format!(
                "Invalid task status: {}. Must be 'open' or 'done'",
                s
            ))),
        }
    }
}

/// Stored task record. `owner_id` is the only field authorization looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name in the `tasks` table.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn from_param(raw: &str) -> Option<Self> {
        match raw.trim() {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "status" => Some(SortField::Status),
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Validated, storage-ready task search.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    /// Lower-cased substring matched against title or description.
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub page: u32,
    pub size: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            created_from: None,
            created_to: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_field: SortField::CreatedAt,
            sort_direction: SortDirection::Desc,
        }
    }
}

impl TaskQuery {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// Raw task listing query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSearchRequest {
    pub status: Option<String>,
    pub search: Option<String>,
    pub from_date: Option<NaiveDateTime>,
    pub to_date: Option<NaiveDateTime>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl TaskSearchRequest {
    /// Apply defaults and reject values storage cannot honour.
    pub fn into_query(self) -> Result<TaskQuery, TaskError> {
        let status = match self.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<TaskStatus>()?),
            _ => None,
        };

        let search = self
            .search
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_lowercase());

        let page = self
            .page
            .filter(|p| *p >= 0)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(0);

        let size = self
            .size
            .filter(|s| *s > 0)
            .map(|s| u32::try_from(s).unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let sort_field = match self.sort_by.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => SortField::from_param(raw).ok_or_else(|| {
                TaskError::BadRequest(format!(
                    "Invalid sort field: {}. Must be one of id, title, status, createdAt, updatedAt",
                    raw
                ))
            })?,
            _ => SortField::CreatedAt,
        };

        let sort_direction = match self.sort_direction.as_deref().map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("ASC") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };

        Ok(TaskQuery {
            status,
            search,
            created_from: self.from_date.map(|d| d.and_utc()),
            created_to: self.to_date.map(|d| d.and_utc()),
            page,
            size,
            sort_field,
            sort_direction,
        })
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub password: Option<SecretString>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), TaskError> {
        let mut errors = BTreeMap::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name".to_string(), "Name cannot be blank".to_string());
        } else if !(2..=100).contains(&name.chars().count()) {
            errors.insert(
                "name".to_string(),
                "Name must be between 2 and 100 characters".to_string(),
            );
        }

        validate_email(&self.email, &mut errors);

        match self.password.as_ref().map(|p| p.expose_secret()) {
            Some(p) if !p.trim().is_empty() => {
                if !(6..=100).contains(&p.chars().count()) {
                    errors.insert(
                        "password".to_string(),
                        "Password must be between 6 and 100 characters".to_string(),
                    );
                }
            }
            _ => {
                errors.insert(
                    "password".to_string(),
                    "Password cannot be blank".to_string(),
                );
            }
        }

        finish_validation(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    pub password: Option<SecretString>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), TaskError> {
        let mut errors = BTreeMap::new();

        validate_email(&self.email, &mut errors);

        if self
            .password
            .as_ref()
            .map_or(true, |p| p.expose_secret().trim().is_empty())
        {
            errors.insert(
                "password".to_string(),
                "Password cannot be blank".to_string(),
            );
        }

        finish_validation(errors)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreateRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
}

impl TaskCreateRequest {
    pub fn validate(&self) -> Result<(), TaskError> {
        let mut errors = BTreeMap::new();

        if self.title.trim().is_empty() {
            errors.insert("title".to_string(), "Title cannot be blank".to_string());
        } else if !(3..=200).contains(&self.title.chars().count()) {
            errors.insert(
                "title".to_string(),
                "Title must be between 3 and 200 characters".to_string(),
            );
        }

        finish_validation(errors)
    }
}

fn validate_email(email: &str, errors: &mut BTreeMap<String, String>) {
    if email.trim().is_empty() {
        errors.insert("email".to_string(), "Email cannot be blank".to_string());
    } else if !is_valid_email(email) {
        errors.insert("email".to_string(), "Email should be valid".to_string());
    }
}

fn finish_validation(errors: BTreeMap<String, String>) -> Result<(), TaskError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TaskError::Validation(errors))
    }
}

/// Simple email validation.
///
/// Checks for basic email format: something@something.something
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    let (local, domain) = match (parts.len(), parts.first(), parts.get(1)) {
        (2, Some(l), Some(d)) => (*l, *d),
        _ => return false,
    };

    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }

    domain_parts
        .iter()
        .all(|p| !p.is_empty() && !p.chars().any(char::is_whitespace))
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            user_id: task.owner_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPageResponse {
    pub tasks: Vec<TaskResponse>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_elements: u64,
    pub size: u32,
    pub first: bool,
    pub last: bool,
}

impl TaskPageResponse {
    pub fn from_page(tasks: Vec<Task>, total_elements: u64, query: &TaskQuery) -> Self {
        let size = u64::from(query.size.max(1));
        let total_pages = total_elements.div_ceil(size);
        let current_page = query.page;

        Self {
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
            current_page,
            total_pages,
            total_elements,
            size: query.size,
            first: current_page == 0,
            last: u64::from(current_page) + 1 >= total_pages,
        }
    }
}
