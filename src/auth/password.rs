use crate::error::AppError;
use bcrypt::{hash, verify};

/// bcrypt work factor for stored password hashes.
pub const HASH_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Checks `password` against a stored bcrypt hash.
///
/// A hash that is not valid bcrypt is an internal error, never a match.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_uses_configured_cost() {
        let stored = hash_password("Password123!").unwrap();

        assert!(stored.starts_with(&format!("$2b${}$", HASH_COST)));
        assert!(verify_password("Password123!", &stored).unwrap());
        assert!(!verify_password("password123!", &stored).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_hashes() {
        let first = hash_password("shared").unwrap();
        let second = hash_password("shared").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("shared", &first).unwrap());
        assert!(verify_password("shared", &second).unwrap());
    }

    #[test]
    fn test_corrupt_stored_hash_never_matches() {
        let outcome = verify_password("Password123!", "not-a-bcrypt-hash");
        assert!(!matches!(outcome, Ok(true)));
        if let Err(err) = outcome {
            assert!(matches!(err, AppError::InternalServerError(_)));
        }
    }
}
