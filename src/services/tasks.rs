//! Task rules: due-date validation, forced initial status, batch assignee
//! resolution and partial updates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, info, warn};

use crate::error::AppError;
use crate::models::{CreateTaskInput, Task, TaskFields, TaskStatus, UpdateTaskInput};
use crate::store::{dedup_ids, Store, TaskStore, UserStore};

fn task_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Task with ID {} not found", id))
}

/// Rejects a due date whose calendar day (UTC) is before today's. Time of day is ignored.
pub fn ensure_due_date_not_past(due_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppError> {
    if due_date.date_naive() < now.date_naive() {
        warn!("Rejected due date {} (today is {})", due_date, now.date_naive());
        return Err(AppError::BadRequest("Due date cannot be in the past".into()));
    }
    Ok(())
}

/// Resolves every id against the user store and fails with one error naming
/// all ids that do not exist. Returns the ids with duplicates removed.
pub async fn resolve_users(store: &dyn Store, ids: &[i32]) -> Result<Vec<i32>, AppError> {
    let wanted = dedup_ids(ids);
    let found: HashSet<i32> = store
        .find_users(&wanted)
        .await?
        .into_iter()
        .map(|user| user.id)
        .collect();

    let missing: Vec<i32> = wanted
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    if !missing.is_empty() {
        warn!("Unknown user ids referenced: {:?}", missing);
        return Err(AppError::missing_users(&missing));
    }
    Ok(wanted)
}

async fn prepare_new_task(
    store: &dyn Store,
    input: CreateTaskInput,
    now: DateTime<Utc>,
) -> Result<(TaskFields, Vec<i32>), AppError> {
    ensure_due_date_not_past(input.due_date, now)?;

    let assignee_ids = match input.assignee_ids.as_deref() {
        Some(ids) if !ids.is_empty() => resolve_users(store, ids).await?,
        _ => Vec::new(),
    };

    let fields = TaskFields {
        title: input.title,
        description: input.description,
        due_date: input.due_date,
        status: TaskStatus::Todo,
    };
    Ok((fields, assignee_ids))
}

pub async fn create_task(store: &dyn Store, input: CreateTaskInput) -> Result<Task, AppError> {
    let (fields, assignee_ids) = prepare_new_task(store, input, Utc::now()).await?;
    let task = store.insert_task(fields, &assignee_ids).await?;
    info!("Created task {} with assignees {:?}", task.id, assignee_ids);
    Ok(task)
}

/// Creates several tasks.
///
/// Every item is checked (due date, assignees) before anything is written, so a
/// rule violation anywhere rejects the whole batch. The inserts then run
/// concurrently and are not wrapped in one transaction: a storage failure midway
/// can leave earlier items persisted.
pub async fn create_tasks(store: &dyn Store, inputs: Vec<CreateTaskInput>) -> Result<Vec<Task>, AppError> {
    let now = Utc::now();
    let mut prepared = Vec::with_capacity(inputs.len());
    for input in inputs {
        prepared.push(prepare_new_task(store, input, now).await?);
    }

    let tasks = try_join_all(
        prepared
            .iter()
            .map(|(fields, assignee_ids)| store.insert_task(fields.clone(), assignee_ids)),
    )
    .await?;

    info!("Created {} tasks in bulk", tasks.len());
    Ok(tasks)
}

pub async fn get_all_tasks(store: &dyn Store) -> Result<Vec<Task>, AppError> {
    store.list_tasks().await
}

pub async fn get_task_by_id(store: &dyn Store, id: i32) -> Result<Task, AppError> {
    debug!("Loading task {}", id);
    store.find_task(id).await?.ok_or_else(|| task_not_found(id))
}

/// Applies a partial update.
///
/// All checks run before the write, so a stale due date or an unknown assignee
/// leaves the task untouched. A non-empty `assigneeIds` replaces the assignee set.
pub async fn update_task(store: &dyn Store, id: i32, patch: UpdateTaskInput) -> Result<Task, AppError> {
    let current = get_task_by_id(store, id).await?;

    if let Some(due_date) = patch.due_date {
        ensure_due_date_not_past(due_date, Utc::now())?;
    }

    let assignee_ids = match patch.replacement_assignees() {
        Some(ids) => Some(resolve_users(store, ids).await?),
        None => None,
    };

    let mut fields = current.fields();
    patch.apply(&mut fields);

    let task = store
        .update_task(id, fields, assignee_ids.as_deref())
        .await?
        .ok_or_else(|| task_not_found(id))?;
    info!("Updated task {}", id);
    Ok(task)
}

pub async fn delete_task(store: &dyn Store, id: i32) -> Result<(), AppError> {
    if store.delete_task(id).await? == 0 {
        return Err(task_not_found(id));
    }
    info!("Deleted task {}", id);
    Ok(())
}

pub async fn get_tasks_by_assignee(store: &dyn Store, user_id: i32) -> Result<Vec<Task>, AppError> {
    store.list_tasks_by_assignee(user_id).await
}
