use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user row as stored in the `users` table.
///
/// Carries the password hash, so it is never serialized. Handlers and services
/// hand out [`UserProfile`] or [`UserSummary`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub is_active: bool,
    /// The team this user belongs to, if any. A user is in at most one team.
    pub team_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new user. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

/// Public projection of a user: everything except credentials.
///
/// Used for registration results, task assignees and team members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub team_id: Option<i32>,
}

/// Compact user shape embedded in login responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            team_id: user.team_id,
        }
    }
}

impl From<&UserProfile> for UserSummary {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            email: profile.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
            email: "alice@example.com".to_string(),
            is_active: true,
            team_id: Some(3),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_never_exposes_password() {
        let profile = UserProfile::from(sample_user());
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["teamId"], 3);
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_summary_from_profile() {
        let profile = UserProfile::from(sample_user());
        let summary = UserSummary::from(&profile);
        assert_eq!(summary.id, 7);
        assert_eq!(summary.username, "alice");
        assert_eq!(summary.email, "alice@example.com");
    }
}
