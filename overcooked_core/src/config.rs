//! Simulation tuning: reward table, recipes, cooking timers and planner knobs.
//!
//! Every field has a default so a TOML file only needs to name what it changes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::action::RewardTable;

/// Inverse temperature of the goal selector. Negative so that
/// `exp(-beta * reward)` grows with reward.
pub const DEFAULT_SOFTMAX_BETA: f64 = -0.01;

/// Upper bound on `max_branching_diagonals`; candidates grow as `3^n`.
pub const MAX_BRANCHING_DIAGONALS: usize = 8;

/// A dish made from `count` units of a single ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredient: String,
    pub count: usize,
}

impl Recipe {
    pub fn new(name: impl Into<String>, ingredient: impl Into<String>, count: usize) -> Self {
        Recipe {
            name: name.into(),
            ingredient: ingredient.into(),
            count,
        }
    }
}

/// Represents errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("recipe {name:?} needs at least one ingredient unit")]
    EmptyRecipe { name: String },
    #[error("ingredient {ingredient:?} is used by more than one recipe")]
    SharedIngredient { ingredient: String },
    #[error("softmax beta must be finite and non-zero, got {0}")]
    InvalidBeta(f64),
    #[error("max_branching_diagonals must be at most {max}, got {found}")]
    BranchingTooDeep { found: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed; agent `i` plans with `seed + i`.
    pub seed: u64,
    pub softmax_beta: f64,
    pub rewards: RewardTable,
    pub recipes: Vec<Recipe>,
    /// Ticks a full pot needs before its contents are cooked.
    pub cook_ticks: u32,
    /// Ticks a cooked pot may sit before burning. `None` disables burning.
    pub burn_ticks: Option<u32>,
    /// Number of orders kept in the queue.
    pub active_orders: usize,
    /// How many diagonal steps of a path are expanded into orthogonal pairs.
    pub max_branching_diagonals: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            seed: 0,
            softmax_beta: DEFAULT_SOFTMAX_BETA,
            rewards: RewardTable::default(),
            recipes: vec![Recipe::new("onion_soup", "onion", 3)],
            cook_ticks: 10,
            burn_ticks: None,
            active_orders: 1,
            max_branching_diagonals: 6,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Pots hold a single ingredient type, so each ingredient may feed only one recipe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.softmax_beta.is_finite() || self.softmax_beta == 0.0 {
            return Err(ConfigError::InvalidBeta(self.softmax_beta));
        }
        if self.max_branching_diagonals > MAX_BRANCHING_DIAGONALS {
            return Err(ConfigError::BranchingTooDeep {
                found: self.max_branching_diagonals,
                max: MAX_BRANCHING_DIAGONALS,
            });
        }
        let mut seen = HashSet::new();
        for recipe in &self.recipes {
            if recipe.count == 0 {
                return Err(ConfigError::EmptyRecipe {
                    name: recipe.name.clone(),
                });
            }
            if !seen.insert(recipe.ingredient.as_str()) {
                return Err(ConfigError::SharedIngredient {
                    ingredient: recipe.ingredient.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.name == name)
    }

    pub fn recipe_for_ingredient(&self, ingredient: &str) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|recipe| recipe.ingredient == ingredient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            seed = 7
            cook_ticks = 3

            [rewards]
            serve = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.cook_ticks, 3);
        assert_eq!(config.rewards.serve, 200);
        assert_eq!(config.rewards.chop, 30);
        assert_eq!(config.softmax_beta, DEFAULT_SOFTMAX_BETA);
        assert_eq!(config.recipes, vec![Recipe::new("onion_soup", "onion", 3)]);
        assert_eq!(config.burn_ticks, None);
    }

    #[test]
    fn recipes_table_replaces_default() {
        let config = SimConfig::from_toml_str(
            r#"
            burn_ticks = 5

            [[recipes]]
            name = "tomato_soup"
            ingredient = "tomato"
            count = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.burn_ticks, Some(5));
        assert_eq!(config.recipe_for_ingredient("tomato").unwrap().name, "tomato_soup");
        assert!(config.recipe("onion_soup").is_none());
    }

    #[test]
    fn rejects_shared_ingredients() {
        let err = SimConfig::from_toml_str(
            r#"
            [[recipes]]
            name = "a"
            ingredient = "onion"
            count = 1

            [[recipes]]
            name = "b"
            ingredient = "onion"
            count = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SharedIngredient { .. }));
    }

    #[test]
    fn rejects_zero_beta_and_empty_recipes() {
        assert!(matches!(
            SimConfig::from_toml_str("softmax_beta = 0.0").unwrap_err(),
            ConfigError::InvalidBeta(_)
        ));
        let err = SimConfig::from_toml_str(
            r#"
            [[recipes]]
            name = "air"
            ingredient = "nothing"
            count = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRecipe { .. }));
    }

    #[test]
    fn rejects_deep_decomposition_bounds() {
        let config = SimConfig::from_toml_str("max_branching_diagonals = 8").unwrap();
        assert_eq!(config.max_branching_diagonals, MAX_BRANCHING_DIAGONALS);
        assert!(matches!(
            SimConfig::from_toml_str("max_branching_diagonals = 20").unwrap_err(),
            ConfigError::BranchingTooDeep { found: 20, max: 8 }
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            SimConfig::from_toml_str("seed = \"seven\"").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
