//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted player name, in characters.
pub const MAX_PLAYER_NAME_CHARS: usize = 32;

/// Validates that a player name has visible content and fits the leaderboard.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("ada")    // Ok
/// validate_player_name("   ")    // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be empty".into());
        return Err(err);
    }

    let chars = trimmed.chars().count();
    if chars > MAX_PLAYER_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_CHARS} characters (got {chars})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}
