//! MCTS configuration parameters.
//!
//! These parameters control the behavior of the Monte Carlo Tree Search algorithm.

use alphazero_core::{Result, ZeroError};
use serde::{Deserialize, Serialize};

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Number of simulations per search.
    #[serde(alias = "simulation_count")]
    pub num_simulations: usize,

    /// PUCT exploration constant.
    /// Part of the formula: Q + c_puct * P * sqrt(N_parent) / (1 + N)
    pub c_puct: f32,

    /// Dirichlet noise alpha (for root exploration).
    /// Higher values = more uniform noise, lower = more concentrated.
    pub dirichlet_alpha: f32,

    /// Fraction of prior replaced with Dirichlet noise at root.
    /// 0 = no exploration noise, 1 = pure noise.
    pub exploration_fraction: f32,

    /// Keep tree statistics between searches of the same engine.
    pub reuse_tree: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 100,
            c_puct: 1.0,
            dirichlet_alpha: 0.3,
            exploration_fraction: 0.25,
            reuse_tree: false,
        }
    }
}

impl MctsConfig {
    /// Create a new config with the specified number of simulations.
    pub fn with_simulations(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Default::default()
        }
    }

    /// Create a config for evaluation (no exploration noise).
    pub fn for_evaluation(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            exploration_fraction: 0.0,
            ..Default::default()
        }
    }

    /// Builder pattern: set c_puct exploration constant.
    pub fn with_c_puct(mut self, c_puct: f32) -> Self {
        self.c_puct = c_puct;
        self
    }

    /// Builder pattern: disable root noise.
    pub fn without_noise(mut self) -> Self {
        self.exploration_fraction = 0.0;
        self
    }

    /// Whether root priors get Dirichlet noise.
    pub fn uses_noise(&self) -> bool {
        self.exploration_fraction > 0.0 && self.dirichlet_alpha > 0.0
    }

    /// Reject settings the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(ZeroError::InvalidConfig(
                "num_simulations must be at least 1".to_string(),
            ));
        }
        if !(self.c_puct.is_finite() && self.c_puct >= 0.0) {
            return Err(ZeroError::InvalidConfig(format!(
                "c_puct must be a non-negative number, got {}",
                self.c_puct
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_fraction) {
            return Err(ZeroError::InvalidConfig(format!(
                "exploration_fraction must be in [0, 1], got {}",
                self.exploration_fraction
            )));
        }
        if self.dirichlet_alpha < 0.0 {
            return Err(ZeroError::InvalidConfig(format!(
                "dirichlet_alpha must be non-negative, got {}",
                self.dirichlet_alpha
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.num_simulations, 100);
        assert!((config.c_puct - 1.0).abs() < 1e-6);
        assert!((config.dirichlet_alpha - 0.3).abs() < 1e-6);
        assert!((config.exploration_fraction - 0.25).abs() < 1e-6);
        assert!(!config.reuse_tree);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_simulations() {
        let config = MctsConfig::with_simulations(25);
        assert_eq!(config.num_simulations, 25);
        assert!(config.uses_noise());
    }

    #[test]
    fn test_for_evaluation() {
        let config = MctsConfig::for_evaluation(100);
        assert_eq!(config.num_simulations, 100);
        assert_eq!(config.exploration_fraction, 0.0);
        assert!(!config.uses_noise());
    }

    #[test]
    fn test_validate_rejects_zero_simulations() {
        let config = MctsConfig::with_simulations(0);
        assert!(matches!(config.validate(), Err(ZeroError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_c_puct() {
        let config = MctsConfig::default().with_c_puct(f32::NAN);
        assert!(config.validate().is_err());
    }
}
