//! Storage access for users, tasks and teams.
//!
//! The services only talk to these traits. [`postgres::PgStore`] is the production
//! implementation; [`memory::MemoryStore`] mirrors its semantics in-process and backs
//! the test-suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewUser, Task, TaskFields, Team, TeamFields, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Returns any user whose username or email matches.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Returns the users among `ids` that exist. Missing ids are simply absent.
    async fn find_users(&self, ids: &[i32]) -> Result<Vec<User>, AppError>;

    /// Fails with `Conflict` if the username or email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Sets `team_id` on every listed user in one write. Returns the number of rows changed.
    async fn set_users_team(&self, user_ids: &[i32], team_id: Option<i32>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts the task and its assignee links. Every id in `assignee_ids` must exist.
    async fn insert_task(&self, fields: TaskFields, assignee_ids: &[i32]) -> Result<Task, AppError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;

    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError>;

    /// Overwrites the scalar fields and, when `assignee_ids` is `Some`, replaces the
    /// assignee set. Both happen atomically. Returns `None` if the task is gone.
    async fn update_task(
        &self,
        id: i32,
        fields: TaskFields,
        assignee_ids: Option<&[i32]>,
    ) -> Result<Option<Task>, AppError>;

    /// Returns the number of rows deleted.
    async fn delete_task(&self, id: i32) -> Result<u64, AppError>;

    async fn list_tasks_by_assignee(&self, user_id: i32) -> Result<Vec<Task>, AppError>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn insert_team(&self, fields: TeamFields) -> Result<Team, AppError>;

    async fn list_teams(&self) -> Result<Vec<Team>, AppError>;

    async fn find_team(&self, id: i32) -> Result<Option<Team>, AppError>;

    /// Returns `None` if the team is gone.
    async fn update_team(&self, id: i32, fields: TeamFields) -> Result<Option<Team>, AppError>;

    /// Deletes the team and clears `team_id` on its former members.
    /// Returns the number of team rows deleted.
    async fn delete_team(&self, id: i32) -> Result<u64, AppError>;
}

/// Everything the services need from storage.
pub trait Store: UserStore + TaskStore + TeamStore {}

impl<T> Store for T where T: UserStore + TaskStore + TeamStore {}

/// Collapses repeated ids while keeping first-seen order.
pub fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
