use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{CreateTaskInput, UpdateTaskInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::debug;
use validator::Validate;

/// Creates a new task.
///
/// The status of a new task is always `TODO`, whatever the payload says.
///
/// ## Request Body:
/// - `title`: required, 1 to 255 characters.
/// - `description`: required.
/// - `dueDate`: RFC 3339 timestamp or `YYYY-MM-DD`; must not be before today.
/// - `assigneeIds` (optional): ids of existing users.
///
/// ## Responses:
/// - `201 Created`: the created `Task` with its assignees.
/// - `400 Bad Request`: if the due date is in the past.
/// - `401 Unauthorized`: if the request lacks a valid token.
/// - `404 Not Found`: if any assignee id does not resolve; the message lists every missing id.
/// - `422 Unprocessable Entity`: if field validation fails.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<CreateTaskInput>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    debug!("User {} creating a task", user.id);

    let task = services::tasks::create_task(state.store.as_ref(), task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Creates several tasks at once.
///
/// Every item is validated before anything is written. The inserts themselves
/// do not share a transaction, so a storage failure can leave some items in place.
#[post("/bulk")]
pub async fn create_tasks(
    state: web::Data<AppState>,
    tasks_data: web::Json<Vec<CreateTaskInput>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    for item in tasks_data.iter() {
        item.validate()?;
    }
    debug!("User {} creating {} tasks", user.id, tasks_data.len());

    let tasks = services::tasks::create_tasks(state.store.as_ref(), tasks_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(tasks))
}

#[get("")]
pub async fn get_tasks(state: web::Data<AppState>, _user: CurrentUser) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::get_all_tasks(state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Lists the tasks assigned to a user. An unknown user simply has no tasks.
#[get("/user/{user_id}")]
pub async fn get_tasks_by_user(
    state: web::Data<AppState>,
    user_id: web::Path<i32>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::get_tasks_by_assignee(state.store.as_ref(), user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<i32>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = services::tasks::get_task_by_id(state.store.as_ref(), task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task.
///
/// Only supplied fields change. A non-empty `assigneeIds` replaces the whole
/// assignee set; an empty or absent one leaves it untouched.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: if a supplied due date is in the past.
/// - `404 Not Found`: if the task or any replacement assignee is missing.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<i32>,
    task_data: web::Json<UpdateTaskInput>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task_id = task_id.into_inner();
    debug!("User {} updating task {}", user.id, task_id);

    let task = services::tasks::update_task(state.store.as_ref(), task_id, task_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<i32>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();
    debug!("User {} deleting task {}", user.id, task_id);

    services::tasks::delete_task(state.store.as_ref(), task_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
