pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::UserSummary;

pub use extractors::CurrentUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a login request.
///
/// Not validated: blank credentials simply fail the credential check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    /// Bounded by the `users.email` column width.
    #[validate(email, length(max = 255))]
    pub email: String,
}

/// Response body of a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed bearer token.
    pub access_token: String,
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "test_user-123".to_string(),
            password: "pw".to_string(),
            email: "test@example.com".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid_username = RegisterRequest {
            username: "test user!".to_string(),
            ..valid.clone()
        };
        assert!(invalid_username.validate().is_err());

        let short_username = RegisterRequest {
            username: "tu".to_string(),
            ..valid.clone()
        };
        assert!(short_username.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        // Well-formed (64-char local part, 60-char labels) but 259 characters long.
        let label = "d".repeat(60);
        let long_email = RegisterRequest {
            email: format!("{}@{}.{}.{}.example.com", "u".repeat(64), label, label, label),
            ..valid
        };
        assert_eq!(long_email.email.len(), 259);
        assert!(long_email.validate().is_err());
    }
}
