//! Configuration for self-play, arena gating and the training loop.
//!
//! All sections deserialize from JSON with defaults for missing keys. The
//! search settings are flattened into the self-play and arena sections, so
//! `simulation_count` and `c_puct` sit next to `max_ply`.

use alphazero_core::{Result, ZeroError};
use alphazero_mcts::MctsConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for generating one self-play game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    #[serde(flatten)]
    pub mcts: MctsConfig,

    /// Temperature for move selection before the threshold ply.
    pub temperature: f32,

    /// Ply from which moves are chosen greedily (temperature 0).
    pub temperature_threshold_ply: usize,

    /// Games still running after this many plies are scored as draws.
    pub max_ply: usize,

    /// Expand every example into all board symmetries.
    pub augment_symmetries: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            mcts: MctsConfig::default(),
            temperature: 1.0,
            temperature_threshold_ply: 15,
            max_ply: 512,
            augment_symmetries: false,
        }
    }
}

impl SelfPlayConfig {
    /// Temperature used at the given 0-based ply.
    pub fn effective_temperature(&self, ply: usize) -> f32 {
        if ply < self.temperature_threshold_ply {
            self.temperature
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.mcts.validate()?;
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(ZeroError::InvalidConfig(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if self.max_ply == 0 {
            return Err(ZeroError::InvalidConfig(
                "max_ply must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for candidate-versus-champion evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Number of arena games; the candidate moves first in even games.
    #[serde(alias = "arena_games")]
    pub games: usize,

    /// Minimum share of decisive games the candidate must win.
    pub win_threshold: f32,

    /// Search settings for both sides. Root noise is always off in the arena.
    #[serde(flatten)]
    pub mcts: MctsConfig,

    /// Arena games still running after this many plies are draws.
    pub max_ply: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            games: 20,
            win_threshold: 0.55,
            mcts: MctsConfig::for_evaluation(100),
            max_ply: 512,
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<()> {
        self.mcts.validate()?;
        if !(0.0..=1.0).contains(&self.win_threshold) {
            return Err(ZeroError::InvalidConfig(format!(
                "win_threshold must be in [0, 1], got {}",
                self.win_threshold
            )));
        }
        if self.max_ply == 0 {
            return Err(ZeroError::InvalidConfig(
                "arena max_ply must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level training loop configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Training iterations performed by `Coach::run`.
    pub iterations: usize,

    /// Self-play games per iteration.
    pub games_per_iteration: usize,

    /// Maximum number of examples kept; the oldest are evicted first.
    pub replay_buffer_capacity: usize,

    /// Passes over the replay buffer when training a candidate.
    pub training_epochs: usize,

    pub batch_size: usize,

    /// Seed for every random choice the loop makes.
    pub seed: u64,

    /// Play the self-play games of an iteration on the rayon pool.
    pub parallel: bool,

    /// Where the champion, replay buffer and metadata are persisted.
    pub checkpoint_dir: Option<PathBuf>,

    /// Step size of the tabular reference model.
    pub learning_rate: f32,

    pub self_play: SelfPlayConfig,

    pub arena: ArenaConfig,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            games_per_iteration: 50,
            replay_buffer_capacity: 20_000,
            training_epochs: 4,
            batch_size: 64,
            seed: 42,
            parallel: false,
            checkpoint_dir: None,
            learning_rate: 0.5,
            self_play: SelfPlayConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

impl CoachConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ZeroError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ZeroError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ZeroError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.games_per_iteration == 0 {
            return Err(ZeroError::InvalidConfig(
                "games_per_iteration must be at least 1".to_string(),
            ));
        }
        if self.replay_buffer_capacity == 0 {
            return Err(ZeroError::InvalidConfig(
                "replay_buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ZeroError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ZeroError::InvalidConfig(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        self.self_play.validate()?;
        self.arena.validate()
    }
}
