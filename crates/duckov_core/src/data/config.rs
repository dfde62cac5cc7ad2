//! Game-wide settings.

use serde::{Deserialize, Serialize};

use crate::atm::MAX_DRAW_AMOUNT;
use crate::catalog::ItemTypeId;
use crate::error::Result;

/// Settings a [`crate::state::GameState`] is built from.
///
/// Every field has a default, so a config file only lists what it changes.
///
/// # Example RON
///
/// ```ron
/// GameConfig(
///     starting_money: 500,
///     cash_type: Some(451),
///     player_type: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Account balance of a new game.
    pub starting_money: i64,
    /// Item type used as physical cash.
    pub cash_type: Option<ItemTypeId>,
    /// Item type of the player character. Must carry an inventory.
    pub player_type: ItemTypeId,
    /// Per-draw ATM cap.
    pub atm_max_draw: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_money: 0,
            cash_type: None,
            player_type: ItemTypeId(1),
            atm_max_draw: MAX_DRAW_AMOUNT,
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::DataParseError`] on invalid RON.
    pub fn from_ron_str(text: &str, label: &str) -> Result<Self> {
        super::parse_ron(text, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GameConfig::from_ron_str("GameConfig()", "inline").expect("valid");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.atm_max_draw, 10_000_000);
    }

    #[test]
    fn test_config_partial_override() {
        let config =
            GameConfig::from_ron_str("GameConfig(starting_money: 150, cash_type: Some(451))", "inline")
                .expect("valid");
        assert_eq!(config.starting_money, 150);
        assert_eq!(config.cash_type, Some(ItemTypeId(451)));
        assert_eq!(config.player_type, ItemTypeId(1));
    }

    #[test]
    fn test_config_parse_error_is_labelled() {
        let err = GameConfig::from_ron_str("GameConfig(starting_money: \"lots\")", "game.ron")
            .expect_err("type mismatch");
        assert!(err.to_string().contains("game.ron"));
    }
}
