//! Team CRUD and membership changes.
//!
//! Membership lives on `users.team_id`, so a user is in at most one team and
//! every change is a write to the user rows.

use log::{debug, info, warn};

use crate::error::AppError;
use crate::models::{CreateTeamInput, Team, UpdateTeamInput};
use crate::services::tasks::resolve_users;
use crate::store::{Store, TeamStore, UserStore};

fn team_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Team with ID {} not found", id))
}

fn user_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("User with ID {} not found", id))
}

pub async fn create_team(store: &dyn Store, input: CreateTeamInput) -> Result<Team, AppError> {
    let team = store.insert_team(input.into()).await?;
    info!("Created team {} ({})", team.id, team.name);
    Ok(team)
}

pub async fn get_all_teams(store: &dyn Store) -> Result<Vec<Team>, AppError> {
    store.list_teams().await
}

pub async fn get_team_by_id(store: &dyn Store, id: i32) -> Result<Team, AppError> {
    debug!("Loading team {}", id);
    store.find_team(id).await?.ok_or_else(|| team_not_found(id))
}

pub async fn update_team(store: &dyn Store, id: i32, patch: UpdateTeamInput) -> Result<Team, AppError> {
    let mut fields = get_team_by_id(store, id).await?.fields();
    patch.apply(&mut fields);

    let team = store
        .update_team(id, fields)
        .await?
        .ok_or_else(|| team_not_found(id))?;
    info!("Updated team {}", id);
    Ok(team)
}

pub async fn delete_team(store: &dyn Store, id: i32) -> Result<(), AppError> {
    if store.delete_team(id).await? == 0 {
        return Err(team_not_found(id));
    }
    info!("Deleted team {}", id);
    Ok(())
}

/// Moves one user into the team and returns the team with its refreshed member list.
pub async fn add_member_to_team(store: &dyn Store, team_id: i32, user_id: i32) -> Result<Team, AppError> {
    get_team_by_id(store, team_id).await?;
    if store.find_user(user_id).await?.is_none() {
        return Err(user_not_found(user_id));
    }

    store.set_users_team(&[user_id], Some(team_id)).await?;
    info!("Added user {} to team {}", user_id, team_id);
    get_team_by_id(store, team_id).await
}

/// Moves every listed user into the team.
///
/// All ids are resolved first; if any is missing nothing changes and the error
/// names every missing id. The membership change itself is a single write.
pub async fn add_members_to_team(
    store: &dyn Store,
    team_id: i32,
    user_ids: &[i32],
) -> Result<Team, AppError> {
    get_team_by_id(store, team_id).await?;
    let user_ids = resolve_users(store, user_ids).await?;

    store.set_users_team(&user_ids, Some(team_id)).await?;
    info!("Added users {:?} to team {}", user_ids, team_id);
    get_team_by_id(store, team_id).await
}

/// Clears the user's team reference if, and only if, the user belongs to `team_id`.
pub async fn remove_member_from_team(
    store: &dyn Store,
    team_id: i32,
    user_id: i32,
) -> Result<Team, AppError> {
    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    if user.team_id != Some(team_id) {
        warn!(
            "User {} is not in team {} (current team: {:?})",
            user_id, team_id, user.team_id
        );
        return Err(AppError::NotFound(format!(
            "User with ID {} is not a member of team {}",
            user_id, team_id
        )));
    }

    store.set_users_team(&[user_id], None).await?;
    info!("Removed user {} from team {}", user_id, team_id);
    get_team_by_id(store, team_id).await
}
