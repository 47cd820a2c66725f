use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{TaskStore, TeamStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskFields, TaskStatus, Team, TeamFields, User, UserProfile};

/// Postgres-backed store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads assignees for every row with one query and assembles the tasks.
    async fn attach_assignees(&self, rows: Vec<TaskRow>) -> Result<Vec<Task>, AppError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut by_task: HashMap<i32, Vec<UserProfile>> = HashMap::new();

        if !ids.is_empty() {
            let assignees = sqlx::query_as::<_, AssigneeRow>(
                "SELECT ta.task_id, u.id, u.username, u.email, u.is_active, u.team_id
                 FROM task_assignees ta
                 JOIN users u ON u.id = ta.user_id
                 WHERE ta.task_id = ANY($1)
                 ORDER BY u.id",
            )
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await?;

            for row in assignees {
                by_task.entry(row.task_id).or_default().push(row.user);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let assignees = by_task.remove(&row.id).unwrap_or_default();
                row.into_task(assignees)
            })
            .collect())
    }

    async fn attach_one_assignee_set(&self, row: TaskRow) -> Result<Task, AppError> {
        let id = row.id;
        self.attach_assignees(vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::InternalServerError(format!("Task {} vanished while loading", id)))
    }

    /// Loads members for every row with one query and assembles the teams.
    async fn attach_members(&self, rows: Vec<TeamRow>) -> Result<Vec<Team>, AppError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut by_team: HashMap<i32, Vec<UserProfile>> = HashMap::new();

        if !ids.is_empty() {
            let members = sqlx::query_as::<_, UserProfile>(
                "SELECT id, username, email, is_active, team_id
                 FROM users
                 WHERE team_id = ANY($1)
                 ORDER BY id",
            )
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await?;

            for member in members {
                if let Some(team_id) = member.team_id {
                    by_team.entry(team_id).or_default().push(member);
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let members = by_team.remove(&row.id).unwrap_or_default();
                row.into_team(members)
            })
            .collect())
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i32,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_task(self, assignees: Vec<UserProfile>) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            status: self.status,
            assignees,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AssigneeRow {
    task_id: i32,
    #[sqlx(flatten)]
    user: UserProfile,
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: i32,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_team(self, members: Vec<UserProfile>) -> Team {
        Team {
            id: self.id,
            name: self.name,
            description: self.description,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn link_assignees(
    tx: &mut Transaction<'_, Postgres>,
    task_id: i32,
    user_ids: &[i32],
) -> Result<(), AppError> {
    if user_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO task_assignees (task_id, user_id)
         SELECT $1, UNNEST($2::int4[])
         ON CONFLICT DO NOTHING",
    )
    .bind(task_id)
    .bind(user_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_active, team_id, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_active, team_id, created_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_active, team_id, created_at
             FROM users WHERE username = $1 OR email = $2
             LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users(&self, ids: &[i32]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_active, team_id, created_at
             FROM users WHERE id = ANY($1)
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, email)
             VALUES ($1, $2, $3)
             RETURNING id, username, password_hash, email, is_active, team_id, created_at",
        )
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_users_team(&self, user_ids: &[i32], team_id: Option<i32>) -> Result<u64, AppError> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE users SET team_id = $1 WHERE id = ANY($2)")
            .bind(team_id)
            .bind(user_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, fields: TaskFields, assignee_ids: &[i32]) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(
            "INSERT INTO tasks (title, description, due_date, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, description, due_date, status, created_at, updated_at",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.due_date)
        .bind(fields.status)
        .fetch_one(&mut *tx)
        .await?;

        link_assignees(&mut tx, row.id, assignee_ids).await?;
        tx.commit().await?;

        self.attach_one_assignee_set(row).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT id, title, description, due_date, status, created_at, updated_at
             FROM tasks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_assignees(rows).await
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, title, description, due_date, status, created_at, updated_at
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.attach_one_assignee_set(row).await?)),
            None => Ok(None),
        }
    }

    async fn update_task(
        &self,
        id: i32,
        fields: TaskFields,
        assignee_ids: Option<&[i32]>,
    ) -> Result<Option<Task>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(
            "UPDATE tasks
             SET title = $1, description = $2, due_date = $3, status = $4, updated_at = NOW()
             WHERE id = $5
             RETURNING id, title, description, due_date, status, created_at, updated_at",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.due_date)
        .bind(fields.status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back.
        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(user_ids) = assignee_ids {
            sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_assignees(&mut tx, id, user_ids).await?;
        }
        tx.commit().await?;

        Ok(Some(self.attach_one_assignee_set(row).await?))
    }

    async fn delete_task(&self, id: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_tasks_by_assignee(&self, user_id: i32) -> Result<Vec<Task>, AppError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT t.id, t.title, t.description, t.due_date, t.status, t.created_at, t.updated_at
             FROM tasks t
             JOIN task_assignees ta ON ta.task_id = t.id
             WHERE ta.user_id = $1
             ORDER BY t.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_assignees(rows).await
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn insert_team(&self, fields: TeamFields) -> Result<Team, AppError> {
        let row = sqlx::query_as::<_, TeamRow>(
            "INSERT INTO teams (name, description)
             VALUES ($1, $2)
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(fields.name)
        .bind(fields.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into_team(Vec::new()))
    }

    async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let rows = sqlx::query_as::<_, TeamRow>(
            "SELECT id, name, description, created_at, updated_at FROM teams ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_members(rows).await
    }

    async fn find_team(&self, id: i32) -> Result<Option<Team>, AppError> {
        let row = sqlx::query_as::<_, TeamRow>(
            "SELECT id, name, description, created_at, updated_at FROM teams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_team(&self, id: i32, fields: TeamFields) -> Result<Option<Team>, AppError> {
        let row = sqlx::query_as::<_, TeamRow>(
            "UPDATE teams
             SET name = $1, description = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(fields.name)
        .bind(fields.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_team(&self, id: i32) -> Result<u64, AppError> {
        // users.team_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
