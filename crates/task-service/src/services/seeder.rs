//! Demo data for local development.

use super::user_service::hash_in_background;
use crate::errors::TaskError;
use crate::models::{NewTask, NewUser, TaskStatus};
use crate::repositories::{TaskRepository, UserRepository};
use chrono::{Duration, Utc};
use common::secret::SecretString;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

/// Number of tasks created by a seeding run.
pub const DEMO_TASK_COUNT: usize = 100;

const DEMO_USERS: [(&str, &str, &str); 3] = [
    ("Demo User", "demo@example.com", "12345678"),
    ("John Doe", "john.doe@example.com", "password123"),
    ("Jane Smith", "jane.smith@example.com", "password123"),
];

const SUBJECTS: &[&str] = &[
    "login", "billing", "search", "dashboard", "export", "notifications", "onboarding",
    "reporting", "cache", "scheduler",
];

const NOTES: &[&str] = &[
    "Reported by the support team.",
    "Blocked on review from the platform group.",
    "Needs a regression test before release.",
    "Customer-facing, prioritise this sprint.",
    "Follow up with design on the final copy.",
    "Check the logs from last night's deploy.",
];

/// What a seeding run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub tasks_created: usize,
}

fn demo_title(rng: &mut impl Rng, index: usize) -> String {
    let subject = SUBJECTS.choose(rng).copied().unwrap_or("service");
    let base = match rng.gen_range(0..5) {
        0 => format!("Fix {subject} issue"),
        1 => format!("Update {subject}"),
        2 => format!("Review {subject}"),
        3 => format!("Optimize {subject} performance"),
        _ => format!("Deploy {subject}"),
    };
    format!("{base} #{}", index + 1)
}

fn demo_description(rng: &mut impl Rng) -> String {
    let count = rng.gen_range(1..=3);
    NOTES
        .choose_multiple(rng, count)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tasks spread across `owners` with random status and a creation time in
/// the past 30 days.
fn demo_tasks(owners: &[i64]) -> Vec<NewTask> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    (0..DEMO_TASK_COUNT)
        .filter_map(|i| {
            let owner_id = *owners.choose(&mut rng)?;
            let status = if rng.gen_bool(0.5) {
                TaskStatus::Open
            } else {
                TaskStatus::Done
            };
            let age = Duration::seconds(rng.gen_range(0..30 * 24 * 60 * 60));

            Some(NewTask {
                owner_id,
                title: demo_title(&mut rng, i),
                description: Some(demo_description(&mut rng)),
                status,
                created_at: now - age,
            })
        })
        .collect()
}

/// Seed demo users and tasks into an empty store.
///
/// Skips entirely when any task exists. Demo users are only created when
/// there are no users at all.
#[instrument(skip_all, name = "task.service.seed_demo_data")]
pub async fn seed_demo_data(
    users: &dyn UserRepository,
    tasks: &dyn TaskRepository,
    bcrypt_cost: u32,
) -> Result<SeedSummary, TaskError> {
    if tasks.count_tasks().await? > 0 {
        tracing::info!(target: "task.seeder", "Tasks already exist, skipping seeding");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    let mut owners = users.list_user_ids().await?;

    if owners.is_empty() {
        for (name, email, password) in DEMO_USERS {
            let password_hash = hash_in_background(SecretString::from(password), bcrypt_cost).await?;
            let user = users
                .create_user(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash,
                })
                .await?;
            owners.push(user.id);
            summary.users_created += 1;
        }
        tracing::info!(target: "task.seeder", count = summary.users_created, "Created demo users");
    }

    for task in demo_tasks(&owners) {
        tasks.insert_task(task).await?;
        summary.tasks_created += 1;
    }

    tracing::info!(target: "task.seeder", count = summary.tasks_created, "Seeded demo tasks");

    Ok(summary)
}
