//! Loading quiz configuration (buffer sizing, round length, difficulty profiles) from TOML.
//!
//! See `QuizConfig` and `DifficultyProfile` for the expected schema. Every key is
//! optional; a profile table replaces the built-in profile for that difficulty.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Difficulty, Operator};
use crate::error::QuizError;

/// Largest operand or factor a profile may use. Keeps every sum and product
/// (at most `MAX_OPERAND²`) far inside `i64`.
pub const MAX_OPERAND: i64 = 1_000_000;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
  /// Questions kept ready per session.
  pub buffer_capacity: usize,
  /// Refill once fewer than this many are pending. Defaults to `buffer_capacity`.
  pub refill_below: Option<usize>,
  pub round_seconds: u64,
  /// Sessions whose round ended longer ago than this are dropped.
  pub evict_after_seconds: u64,
  pub default_difficulty: Difficulty,
  pub leaderboard_size: usize,
  /// Fixed RNG seed; makes every session generate the same sequence.
  pub rng_seed: Option<u64>,
  pub profiles: Profiles,
}

impl Default for QuizConfig {
  fn default() -> Self {
    Self {
      buffer_capacity: 8,
      refill_below: None,
      round_seconds: 60,
      evict_after_seconds: 300,
      default_difficulty: Difficulty::Easy,
      leaderboard_size: 10,
      rng_seed: None,
      profiles: Profiles::default(),
    }
  }
}

impl QuizConfig {
  pub fn refill_below(&self) -> usize {
    self.refill_below.unwrap_or(self.buffer_capacity)
  }

  pub fn validate(&self) -> Result<(), QuizError> {
    if self.buffer_capacity == 0 {
      return Err(QuizError::InvalidConfiguration("buffer_capacity must be at least 1".into()));
    }
    if self.refill_below() > self.buffer_capacity {
      return Err(QuizError::InvalidConfiguration(format!(
        "refill_below ({}) exceeds buffer_capacity ({})",
        self.refill_below(),
        self.buffer_capacity
      )));
    }
    if self.round_seconds == 0 {
      return Err(QuizError::InvalidConfiguration("round_seconds must be at least 1".into()));
    }
    for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
      self.profiles.get(d).validate(d)?;
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Profiles {
  #[serde(default = "DifficultyProfile::easy")]
  pub easy: DifficultyProfile,
  #[serde(default = "DifficultyProfile::medium")]
  pub medium: DifficultyProfile,
  #[serde(default = "DifficultyProfile::hard")]
  pub hard: DifficultyProfile,
}

impl Default for Profiles {
  fn default() -> Self {
    Self {
      easy: DifficultyProfile::easy(),
      medium: DifficultyProfile::medium(),
      hard: DifficultyProfile::hard(),
    }
  }
}

impl Profiles {
  pub fn get(&self, difficulty: Difficulty) -> &DifficultyProfile {
    match difficulty {
      Difficulty::Easy => &self.easy,
      Difficulty::Medium => &self.medium,
      Difficulty::Hard => &self.hard,
    }
  }
}

/// Operand ranges for one difficulty. Ranges are inclusive.
/// `factor_*` bounds multiplication factors and both divisor and quotient of a division.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DifficultyProfile {
  pub operators: Vec<Operator>,
  pub operand_min: i64,
  pub operand_max: i64,
  pub factor_min: i64,
  pub factor_max: i64,
}

impl DifficultyProfile {
  pub fn easy() -> Self {
    Self {
      operators: vec![Operator::Add, Operator::Sub],
      operand_min: 1,
      operand_max: 10,
      factor_min: 2,
      factor_max: 5,
    }
  }

  pub fn medium() -> Self {
    Self {
      operators: vec![Operator::Add, Operator::Sub, Operator::Mul],
      operand_min: 1,
      operand_max: 20,
      factor_min: 2,
      factor_max: 12,
    }
  }

  pub fn hard() -> Self {
    Self {
      operators: vec![Operator::Add, Operator::Sub, Operator::Mul, Operator::Div],
      operand_min: 1,
      operand_max: 50,
      factor_min: 2,
      factor_max: 12,
    }
  }

  fn validate(&self, difficulty: Difficulty) -> Result<(), QuizError> {
    if self.operators.is_empty() {
      return Err(QuizError::InvalidConfiguration(format!(
        "profile '{difficulty}' has no operators"
      )));
    }
    if self.operand_min > self.operand_max || self.factor_min > self.factor_max {
      return Err(QuizError::InvalidConfiguration(format!(
        "profile '{difficulty}' has an empty operand range"
      )));
    }
    let in_bounds = |v: i64| (0..=MAX_OPERAND).contains(&v);
    if ![self.operand_min, self.operand_max, self.factor_min, self.factor_max].into_iter().all(in_bounds) {
      return Err(QuizError::InvalidConfiguration(format!(
        "profile '{difficulty}' operands must lie within 0..={MAX_OPERAND}"
      )));
    }
    if self.operators.contains(&Operator::Div) && self.factor_min < 1 {
      return Err(QuizError::InvalidConfiguration(format!(
        "profile '{difficulty}' divides but factor_min < 1"
      )));
    }
    Ok(())
  }
}

/// Read and validate a TOML config file.
pub fn load_quiz_config(path: impl AsRef<Path>) -> Result<QuizConfig, QuizError> {
  let raw = std::fs::read_to_string(path)?;
  let cfg = toml::from_str::<QuizConfig>(&raw)?;
  cfg.validate()?;
  Ok(cfg)
}

/// Load `QuizConfig` from QUIZ_CONFIG_PATH, or defaults when unset.
/// A path that is set but unreadable or invalid is an error.
pub fn load_quiz_config_from_env() -> Result<QuizConfig, QuizError> {
  let Ok(path) = std::env::var("QUIZ_CONFIG_PATH") else {
    info!(target: "quiz_backend", "QUIZ_CONFIG_PATH not set; using built-in defaults");
    return Ok(QuizConfig::default());
  };
  match load_quiz_config(&path) {
    Ok(cfg) => {
      info!(target: "quiz_backend", %path, capacity = cfg.buffer_capacity, round_seconds = cfg.round_seconds, "Loaded quiz config (TOML)");
      Ok(cfg)
    }
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to load quiz config");
      Err(e)
    }
  }
}
