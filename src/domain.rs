//! Domain models: difficulty levels, operators, questions, players and round summaries.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuizError;

/// How hard the generated arithmetic is.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  /// Points awarded for a correct answer, before streak bonus.
  pub fn points(self) -> u32 {
    match self {
      Difficulty::Easy => 1,
      Difficulty::Medium => 2,
      Difficulty::Hard => 3,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Difficulty {
  type Err = QuizError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(QuizError::UnknownDifficulty(other.to_string())),
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
  Add,
  Sub,
  Mul,
  Div,
}

impl Operator {
  pub fn symbol(self) -> &'static str {
    match self {
      Operator::Add => "+",
      Operator::Sub => "-",
      Operator::Mul => "×",
      Operator::Div => "÷",
    }
  }
}

/// One generated question. Immutable once built; equality is by value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
  pub prompt: String,
  pub answer: i64,
}

impl Question {
  pub fn new(lhs: i64, op: Operator, rhs: i64, answer: i64) -> Self {
    Self { prompt: format!("{} {} {}", lhs, op.symbol(), rhs), answer }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Active,
  Finished,
}

/// Registered player (in-memory only).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
  pub id: Uuid,
  pub name: String,
  pub best_score: u32,
  pub games_played: u32,
  pub total_correct: u32,
}

/// Final result of a round, as stored on the leaderboard.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
  pub session_id: Uuid,
  pub round: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub player_id: Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub player_name: Option<String>,
  pub difficulty: Difficulty,
  pub score: u32,
  pub answered: u32,
  pub correct: u32,
  pub best_streak: u32,
}

impl SessionSummary {
  /// Share of correct answers in percent, 0 when nothing was answered.
  pub fn accuracy(&self) -> f32 {
    if self.answered == 0 {
      0.0
    } else {
      self.correct as f32 * 100.0 / self.answered as f32
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn difficulty_parses_case_insensitively() {
    assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
    assert!(matches!("expert".parse::<Difficulty>(), Err(QuizError::UnknownDifficulty(_))));
  }

  #[test]
  fn question_prompt_uses_operator_symbol() {
    let q = Question::new(7, Operator::Mul, 8, 56);
    assert_eq!(q.prompt, "7 × 8");
    assert_eq!(q.answer, 56);
  }
}
