//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted for a player.
pub const MAX_PLAYER_NAME_LEN: usize = 64;

/// Validates that a player display name is non-blank and reasonably short.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("alice") // Ok
/// validate_player_name("   ")   // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    let length = name.chars().count();
    if length > MAX_PLAYER_NAME_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_LEN} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}
