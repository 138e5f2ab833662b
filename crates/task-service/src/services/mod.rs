//! Business logic between handlers and repositories.

pub mod seeder;
pub mod task_service;
pub mod user_service;
