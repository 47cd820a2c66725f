use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{TaskStore, TeamStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskFields, Team, TeamFields, User, UserProfile};

/// In-process store with the same relational semantics as [`super::PgStore`]:
/// unique usernames and emails, cascading assignee links, and team deletion
/// clearing `team_id` on former members.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    tasks: BTreeMap<i32, StoredTask>,
    teams: BTreeMap<i32, StoredTeam>,
    /// (task_id, user_id)
    assignments: BTreeSet<(i32, i32)>,
    next_user_id: i32,
    next_task_id: i32,
    next_team_id: i32,
}

#[derive(Debug, Clone)]
struct StoredTask {
    fields: TaskFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredTeam {
    fields: TeamFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

impl Tables {
    fn task(&self, id: i32) -> Option<Task> {
        let stored = self.tasks.get(&id)?;
        let assignees = self
            .assignments
            .range((id, i32::MIN)..=(id, i32::MAX))
            .filter_map(|(_, user_id)| self.users.get(user_id))
            .cloned()
            .map(UserProfile::from)
            .collect();
        Some(Task {
            id,
            title: stored.fields.title.clone(),
            description: stored.fields.description.clone(),
            due_date: stored.fields.due_date,
            status: stored.fields.status,
            assignees,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn team(&self, id: i32) -> Option<Team> {
        let stored = self.teams.get(&id)?;
        let members = self
            .users
            .values()
            .filter(|user| user.team_id == Some(id))
            .cloned()
            .map(UserProfile::from)
            .collect();
        Some(Team {
            id,
            name: stored.fields.name.clone(),
            description: stored.fields.description.clone(),
            members,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn link(&mut self, task_id: i32, user_ids: &[i32]) -> Result<(), AppError> {
        if let Some(missing) = user_ids.iter().find(|id| !self.users.contains_key(id)) {
            return Err(AppError::DatabaseError(format!(
                "task_assignees references missing user {}",
                missing
            )));
        }
        for user_id in user_ids {
            self.assignments.insert((task_id, *user_id));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user and its assignee links, as a cascading delete would.
    pub async fn remove_user(&self, id: i32) -> bool {
        let mut tables = self.inner.write().await;
        tables.assignments.retain(|(_, user_id)| *user_id != id);
        tables.users.remove(&id).is_some()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn find_users(&self, ids: &[i32]) -> Result<Vec<User>, AppError> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.inner.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::Conflict("Username or email already exists".into()));
        }

        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            is_active: true,
            team_id: None,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_users_team(&self, user_ids: &[i32], team_id: Option<i32>) -> Result<u64, AppError> {
        let mut tables = self.inner.write().await;
        if let Some(team_id) = team_id {
            if !tables.teams.contains_key(&team_id) {
                return Err(AppError::DatabaseError(format!(
                    "users.team_id references missing team {}",
                    team_id
                )));
            }
        }

        let mut changed = 0;
        for user in tables.users.values_mut().filter(|u| user_ids.contains(&u.id)) {
            user.team_id = team_id;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, fields: TaskFields, assignee_ids: &[i32]) -> Result<Task, AppError> {
        let mut tables = self.inner.write().await;
        let id = next_id(&mut tables.next_task_id);
        tables.link(id, assignee_ids)?;

        let now = Utc::now();
        tables.tasks.insert(
            id,
            StoredTask {
                fields,
                created_at: now,
                updated_at: now,
            },
        );
        tables
            .task(id)
            .ok_or_else(|| AppError::InternalServerError(format!("Task {} vanished while loading", id)))
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let tables = self.inner.read().await;
        Ok(tables.tasks.keys().filter_map(|id| tables.task(*id)).collect())
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, AppError> {
        Ok(self.inner.read().await.task(id))
    }

    async fn update_task(
        &self,
        id: i32,
        fields: TaskFields,
        assignee_ids: Option<&[i32]>,
    ) -> Result<Option<Task>, AppError> {
        let mut tables = self.inner.write().await;
        if !tables.tasks.contains_key(&id) {
            return Ok(None);
        }

        if let Some(user_ids) = assignee_ids {
            let previous: Vec<(i32, i32)> = tables
                .assignments
                .range((id, i32::MIN)..=(id, i32::MAX))
                .copied()
                .collect();
            for link in &previous {
                tables.assignments.remove(link);
            }
            if let Err(e) = tables.link(id, user_ids) {
                // Roll the assignee set back so the update stays all-or-nothing.
                tables.assignments.retain(|(task_id, _)| *task_id != id);
                tables.assignments.extend(previous);
                return Err(e);
            }
        }

        if let Some(stored) = tables.tasks.get_mut(&id) {
            stored.fields = fields;
            stored.updated_at = Utc::now();
        }
        Ok(tables.task(id))
    }

    async fn delete_task(&self, id: i32) -> Result<u64, AppError> {
        let mut tables = self.inner.write().await;
        tables.assignments.retain(|(task_id, _)| *task_id != id);
        Ok(u64::from(tables.tasks.remove(&id).is_some()))
    }

    async fn list_tasks_by_assignee(&self, user_id: i32) -> Result<Vec<Task>, AppError> {
        let tables = self.inner.read().await;
        let task_ids: BTreeSet<i32> = tables
            .assignments
            .iter()
            .filter(|(_, assignee)| *assignee == user_id)
            .map(|(task_id, _)| *task_id)
            .collect();
        Ok(task_ids.into_iter().filter_map(|id| tables.task(id)).collect())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn insert_team(&self, fields: TeamFields) -> Result<Team, AppError> {
        let mut tables = self.inner.write().await;
        let id = next_id(&mut tables.next_team_id);
        let now = Utc::now();
        tables.teams.insert(
            id,
            StoredTeam {
                fields,
                created_at: now,
                updated_at: now,
            },
        );
        tables
            .team(id)
            .ok_or_else(|| AppError::InternalServerError(format!("Team {} vanished while loading", id)))
    }

    async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let tables = self.inner.read().await;
        Ok(tables.teams.keys().filter_map(|id| tables.team(*id)).collect())
    }

    async fn find_team(&self, id: i32) -> Result<Option<Team>, AppError> {
        Ok(self.inner.read().await.team(id))
    }

    async fn update_team(&self, id: i32, fields: TeamFields) -> Result<Option<Team>, AppError> {
        let mut tables = self.inner.write().await;
        match tables.teams.get_mut(&id) {
            Some(stored) => {
                stored.fields = fields;
                stored.updated_at = Utc::now();
            }
            None => return Ok(None),
        }
        Ok(tables.team(id))
    }

    async fn delete_team(&self, id: i32) -> Result<u64, AppError> {
        let mut tables = self.inner.write().await;
        if tables.teams.remove(&id).is_none() {
            return Ok(0);
        }
        for user in tables.users.values_mut().filter(|u| u.team_id == Some(id)) {
            user.team_id = None;
        }
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{}@example.com", name),
        }
    }

    fn task_fields(title: &str) -> TaskFields {
        TaskFields {
            title: title.to_string(),
            description: String::new(),
            due_date: Utc::now(),
            status: TaskStatus::Todo,
        }
    }

    #[actix_rt::test]
    async fn test_unique_username_and_email() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let same_name = NewUser {
            email: "other@example.com".to_string(),
            ..new_user("alice")
        };
        assert!(matches!(
            store.insert_user(same_name).await,
            Err(AppError::Conflict(_))
        ));

        let same_email = NewUser {
            username: "alicia".to_string(),
            ..new_user("alice")
        };
        assert!(matches!(
            store.insert_user(same_email).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[actix_rt::test]
    async fn test_deleting_team_clears_membership() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("bob")).await.unwrap();
        let team = store
            .insert_team(TeamFields {
                name: "Eng".to_string(),
                description: None,
            })
            .await
            .unwrap();

        store.set_users_team(&[user.id], Some(team.id)).await.unwrap();
        assert_eq!(store.find_team(team.id).await.unwrap().unwrap().member_ids(), vec![user.id]);

        assert_eq!(store.delete_team(team.id).await.unwrap(), 1);
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().team_id, None);
        assert_eq!(store.delete_team(team.id).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_failed_assignee_replacement_keeps_previous_set() {
        let store = MemoryStore::new();
        let carol = store.insert_user(new_user("carol")).await.unwrap();
        let task = store.insert_task(task_fields("T"), &[carol.id]).await.unwrap();

        let result = store
            .update_task(task.id, task_fields("Renamed"), Some(&[999][..]))
            .await;
        assert!(result.is_err());

        let task = store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(task.title, "T");
        assert_eq!(task.assignee_ids(), vec![carol.id]);
    }

    #[actix_rt::test]
    async fn test_removed_user_drops_out_of_assignments() {
        let store = MemoryStore::new();
        let dave = store.insert_user(new_user("dave")).await.unwrap();
        let task = store.insert_task(task_fields("T"), &[dave.id]).await.unwrap();

        assert!(store.remove_user(dave.id).await);
        assert!(store.find_task(task.id).await.unwrap().unwrap().assignees.is_empty());
        assert!(store.list_tasks_by_assignee(dave.id).await.unwrap().is_empty());
    }
}
