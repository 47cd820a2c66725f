//! Credential checks, session issuance and registration.

use log::{info, warn};

use crate::auth::{hash_password, verify_password, AuthResponse, LoginRequest, RegisterRequest, TokenKeys};
use crate::error::AppError;
use crate::models::{NewUser, UserProfile, UserSummary};
use crate::store::{Store, UserStore};

/// Looks the user up by username and checks the password against the stored hash.
///
/// Returns `None` both for an unknown username and for a wrong password.
pub async fn validate_credentials(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<Option<UserProfile>, AppError> {
    let Some(user) = store.find_user_by_username(username).await? else {
        return Ok(None);
    };

    if verify_password(password, &user.password_hash)? {
        Ok(Some(user.into()))
    } else {
        Ok(None)
    }
}

/// Signs a token for `user` and pairs it with the public summary.
pub fn issue_session(user: &UserProfile, tokens: &TokenKeys) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        access_token: tokens.generate(user)?,
        user: UserSummary::from(user),
    })
}

/// Validates credentials and issues a session.
pub async fn login(
    store: &dyn Store,
    tokens: &TokenKeys,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    match validate_credentials(store, &request.username, &request.password).await? {
        Some(user) => {
            info!("User {} logged in", user.id);
            issue_session(&user, tokens)
        }
        None => {
            warn!("Failed login attempt for username {:?}", request.username);
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
    }
}

/// Creates a new account. Fails with `Conflict` if the username or email is taken.
pub async fn register(store: &dyn Store, request: RegisterRequest) -> Result<UserProfile, AppError> {
    if store
        .find_user_by_username_or_email(&request.username, &request.email)
        .await?
        .is_some()
    {
        warn!("Registration rejected: username or email already in use");
        return Err(AppError::Conflict("Username or email already exists".into()));
    }

    let user = store
        .insert_user(NewUser {
            password_hash: hash_password(&request.password)?,
            username: request.username,
            email: request.email,
        })
        .await?;

    info!("Registered user {} ({})", user.id, user.username);
    Ok(user.into())
}
