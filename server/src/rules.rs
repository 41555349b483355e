//! Gameplay tunables, optionally loaded from a JSON rules file.

use serde::{Deserialize, Serialize};
use shared::{COLS, MAX_GRID_DIM, ROWS};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rules file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rules: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub cols: usize,
    pub rows: usize,
    /// Scales the minimum distance between kings.
    pub king_multiplier: f64,
    pub king_start_army: u32,
    /// Cumulative thresholds: a roll below `city_chance` is a city, below
    /// `mountain_chance` a mountain, anything else plain land.
    pub city_chance: f64,
    pub mountain_chance: f64,
    pub city_army_min: u32,
    pub city_army_max: u32,
    /// Owned land grows by one every this many ticks.
    pub turns_to_reset: u32,
    pub tick_ms: u64,
    /// Consecutive rejected king sites tolerated before the separation is relaxed.
    pub max_placement_attempts: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            cols: COLS,
            rows: ROWS,
            king_multiplier: 0.9,
            king_start_army: 10,
            city_chance: 0.05,
            mountain_chance: 0.25,
            city_army_min: 38,
            city_army_max: 45,
            turns_to_reset: 25,
            tick_ms: 200,
            max_placement_attempts: 1000,
        }
    }
}

impl GameRules {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path)?;
        let rules: GameRules = serde_json::from_str(&text)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let invalid = |msg: String| -> Result<(), RulesError> { Err(RulesError::Invalid(msg)) };

        if !(1..=MAX_GRID_DIM).contains(&self.cols) || !(1..=MAX_GRID_DIM).contains(&self.rows) {
            return invalid(format!(
                "grid {}x{} outside 1..={}",
                self.cols, self.rows, MAX_GRID_DIM
            ));
        }
        if !(0.0..=1.0).contains(&self.city_chance) || !(0.0..=1.0).contains(&self.mountain_chance)
        {
            return invalid("chances must lie in [0, 1]".to_string());
        }
        if self.city_chance > self.mountain_chance {
            return invalid("city_chance must not exceed mountain_chance".to_string());
        }
        if self.city_army_min > self.city_army_max {
            return invalid(format!(
                "empty city army range {}..={}",
                self.city_army_min, self.city_army_max
            ));
        }
        if self.king_start_army == 0 {
            return invalid("king_start_army must be at least 1".to_string());
        }
        if self.turns_to_reset == 0 {
            return invalid("turns_to_reset must be at least 1".to_string());
        }
        if self.tick_ms == 0 {
            return invalid("tick_ms must be at least 1".to_string());
        }
        if self.max_placement_attempts == 0 {
            return invalid("max_placement_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let rules = GameRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.tick_duration(), Duration::from_millis(200));
        assert_eq!(rules.cols, COLS);
        assert_eq!(rules.rows, ROWS);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let rules: GameRules = serde_json::from_str(r#"{ "tick_ms": 50, "cols": 10 }"#).unwrap();
        assert_eq!(rules.tick_ms, 50);
        assert_eq!(rules.cols, 10);
        assert_eq!(rules.rows, ROWS);
        assert_eq!(rules.turns_to_reset, 25);
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let rules = GameRules {
            cols: 101,
            ..GameRules::default()
        };
        assert!(matches!(rules.validate(), Err(RulesError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_chances() {
        let rules = GameRules {
            city_chance: 0.5,
            mountain_chance: 0.2,
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_values() {
        for rules in [
            GameRules {
                turns_to_reset: 0,
                ..GameRules::default()
            },
            GameRules {
                tick_ms: 0,
                ..GameRules::default()
            },
            GameRules {
                king_start_army: 0,
                ..GameRules::default()
            },
            GameRules {
                city_army_min: 50,
                city_army_max: 40,
                ..GameRules::default()
            },
        ] {
            assert!(rules.validate().is_err(), "{:?} should be rejected", rules);
        }
    }

    #[test]
    fn test_from_file_round_trip() {
        let path = std::env::temp_dir().join(format!("rules-{}.json", std::process::id()));
        let rules = GameRules {
            tick_ms: 75,
            ..GameRules::default()
        };
        std::fs::write(&path, serde_json::to_string(&rules).unwrap()).unwrap();

        let loaded = GameRules::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, rules);
    }

    #[test]
    fn test_from_file_missing() {
        let result = GameRules::from_file("/nonexistent/rules.json");
        assert!(matches!(result, Err(RulesError::Io(_))));
    }

    #[test]
    fn test_from_file_bad_json() {
        let path = std::env::temp_dir().join(format!("bad-rules-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = GameRules::from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(RulesError::Parse(_))));
    }
}
