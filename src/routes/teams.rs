use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{AddMembersInput, CreateTeamInput, UpdateTeamInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::debug;
use validator::Validate;

/// Creates a team with no members.
///
/// ## Responses:
/// - `201 Created`: the new `Team`.
/// - `401 Unauthorized`: if the request lacks a valid token.
/// - `422 Unprocessable Entity`: if `name` is empty or too long.
#[post("")]
pub async fn create_team(
    state: web::Data<AppState>,
    team_data: web::Json<CreateTeamInput>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    team_data.validate()?;
    debug!("User {} creating team {:?}", user.id, team_data.name);

    let team = services::teams::create_team(state.store.as_ref(), team_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(team))
}

#[get("")]
pub async fn get_teams(state: web::Data<AppState>, _user: CurrentUser) -> Result<impl Responder, AppError> {
    let teams = services::teams::get_all_teams(state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(teams))
}

#[get("/{id}")]
pub async fn get_team(
    state: web::Data<AppState>,
    team_id: web::Path<i32>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let team = services::teams::get_team_by_id(state.store.as_ref(), team_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(team))
}

#[patch("/{id}")]
pub async fn update_team(
    state: web::Data<AppState>,
    team_id: web::Path<i32>,
    team_data: web::Json<UpdateTeamInput>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    team_data.validate()?;
    let team_id = team_id.into_inner();
    debug!("User {} updating team {}", user.id, team_id);

    let team = services::teams::update_team(state.store.as_ref(), team_id, team_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(team))
}

/// Deletes a team. Former members stay, without a team.
#[delete("/{id}")]
pub async fn delete_team(
    state: web::Data<AppState>,
    team_id: web::Path<i32>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    let team_id = team_id.into_inner();
    debug!("User {} deleting team {}", user.id, team_id);

    services::teams::delete_team(state.store.as_ref(), team_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Moves a single user into the team.
///
/// ## Responses:
/// - `200 OK`: the team with its refreshed member list.
/// - `404 Not Found`: if the team or the user does not exist.
#[post("/{id}/members/{user_id}")]
pub async fn add_member(
    state: web::Data<AppState>,
    path: web::Path<(i32, i32)>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let (team_id, user_id) = path.into_inner();
    let team = services::teams::add_member_to_team(state.store.as_ref(), team_id, user_id).await?;
    Ok(HttpResponse::Ok().json(team))
}

/// Moves every user in `userIds` into the team. Nothing changes if any id is unknown.
#[post("/{id}/members")]
pub async fn add_members(
    state: web::Data<AppState>,
    team_id: web::Path<i32>,
    members: web::Json<AddMembersInput>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let team = services::teams::add_members_to_team(state.store.as_ref(), team_id.into_inner(), &members.user_ids)
        .await?;
    Ok(HttpResponse::Ok().json(team))
}

/// Removes a user from the team.
///
/// ## Responses:
/// - `200 OK`: the team with its refreshed member list.
/// - `404 Not Found`: if the user does not exist or is not a member of this team.
#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    state: web::Data<AppState>,
    path: web::Path<(i32, i32)>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let (team_id, user_id) = path.into_inner();
    let team = services::teams::remove_member_from_team(state.store.as_ref(), team_id, user_id).await?;
    Ok(HttpResponse::Ok().json(team))
}
