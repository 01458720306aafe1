//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a player name contains at least one non-whitespace character.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Joe Root") // Ok
/// validate_player_name("   ")      // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name is required".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name() {
        assert!(validate_player_name("Joe Root").is_ok());
        assert!(validate_player_name(" x ").is_ok());
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name(" \t ").is_err());
    }
}
