//! One timed play round: a refill buffer of questions, the question on screen,
//! and the running score.
//!
//! Every method takes `now` explicitly so round timing stays testable.

use std::time::{Duration, Instant};

use tracing::{debug, enabled, trace, Level};
use uuid::Uuid;

use crate::buffer::BoundedRefillBuffer;
use crate::config::QuizConfig;
use crate::domain::{Difficulty, Question, SessionStatus, SessionSummary};
use crate::error::QuizError;
use crate::generator::QuestionGenerator;
use crate::util::parse_answer;

/// Consecutive correct answers needed for one bonus point.
const STREAK_BONUS_EVERY: u32 = 5;

pub type QuestionFn = Box<dyn FnMut() -> Question + Send + Sync>;
pub type QuestionBuffer = BoundedRefillBuffer<Question, QuestionFn>;

/// Result of a single submission.
#[derive(Clone, Debug)]
pub struct AnswerOutcome {
  pub correct: bool,
  pub expected: i64,
  pub points: u32,
  pub score: u32,
  pub streak: u32,
  pub next: Question,
}

pub struct GameSession {
  pub id: Uuid,
  pub player_id: Option<Uuid>,
  pub difficulty: Difficulty,
  /// Bumped on every reset; a summary is identified by session id + round.
  pub round_no: u32,
  buffer: QuestionBuffer,
  current: Question,
  refill_below: usize,
  pub score: u32,
  pub streak: u32,
  pub best_streak: u32,
  pub answered: u32,
  pub correct: u32,
  started_at: Instant,
  round: Duration,
  pub status: SessionStatus,
  /// The current round's summary has been handed out for recording.
  recorded: bool,
}

/// Build a fresh, filled buffer for `difficulty`.
fn new_buffer(cfg: &QuizConfig, difficulty: Difficulty) -> Result<QuestionBuffer, QuizError> {
  let generator = QuestionGenerator::new(cfg.profiles.get(difficulty).clone(), cfg.rng_seed);
  let generate: QuestionFn = Box::new(generator.into_fn());
  let mut buffer = BoundedRefillBuffer::new(cfg.buffer_capacity, generate)?;
  buffer.ensure_filled();
  Ok(buffer)
}

impl GameSession {
  pub fn start(
    cfg: &QuizConfig,
    difficulty: Difficulty,
    player_id: Option<Uuid>,
    now: Instant,
  ) -> Result<Self, QuizError> {
    let mut buffer = new_buffer(cfg, difficulty)?;
    let current = buffer.dequeue();
    Ok(Self {
      id: Uuid::new_v4(),
      player_id,
      difficulty,
      round_no: 1,
      buffer,
      current,
      refill_below: cfg.refill_below(),
      score: 0,
      streak: 0,
      best_streak: 0,
      answered: 0,
      correct: 0,
      started_at: now,
      round: Duration::from_secs(cfg.round_seconds),
      status: SessionStatus::Active,
      recorded: false,
    })
  }

  pub fn current(&self) -> &Question {
    &self.current
  }

  /// Questions waiting behind the current one.
  pub fn buffered(&self) -> usize {
    self.buffer.size()
  }

  pub fn buffer_capacity(&self) -> usize {
    self.buffer.capacity()
  }

  pub fn remaining(&self, now: Instant) -> Duration {
    self.round.saturating_sub(now.saturating_duration_since(self.started_at))
  }

  pub fn is_expired(&self, now: Instant) -> bool {
    self.remaining(now).is_zero()
  }

  pub fn is_finished(&self) -> bool {
    self.status == SessionStatus::Finished
  }

  /// How long ago the round clock ran out; zero while it is still running.
  pub fn overdue(&self, now: Instant) -> Duration {
    match self.started_at.checked_add(self.round) {
      Some(end) => now.saturating_duration_since(end),
      None => Duration::ZERO,
    }
  }

  /// Reject calls on a finished round; finish a round whose time ran out.
  fn check_playable(&mut self, now: Instant) -> Result<(), QuizError> {
    if self.is_finished() {
      return Err(QuizError::SessionFinished);
    }
    if self.is_expired(now) {
      self.status = SessionStatus::Finished;
      self.buffer.reset();
      return Err(QuizError::SessionExpired);
    }
    Ok(())
  }

  /// Swap in the next question and top the buffer up if it ran low.
  fn advance(&mut self) -> Question {
    let next = self.buffer.dequeue();
    if self.buffer.size() < self.refill_below {
      self.buffer.ensure_filled();
    }
    if enabled!(target: "session", Level::TRACE) {
      let pending: Vec<&str> = self.buffer.iter().map(|q| q.prompt.as_str()).collect();
      trace!(target: "session", id = %self.id, ?pending, "Pending questions");
    }
    std::mem::replace(&mut self.current, next)
  }

  pub fn submit(&mut self, raw_answer: &str, now: Instant) -> Result<AnswerOutcome, QuizError> {
    self.check_playable(now)?;

    let correct = parse_answer(raw_answer) == Some(self.current.answer);
    let mut points = 0;
    self.answered += 1;
    if correct {
      self.correct += 1;
      self.streak += 1;
      self.best_streak = self.best_streak.max(self.streak);
      points = self.difficulty.points();
      if self.streak % STREAK_BONUS_EVERY == 0 {
        points += 1;
      }
      self.score += points;
    } else {
      self.streak = 0;
    }

    let answered = self.advance();
    debug!(target: "session", id = %self.id, prompt = %answered.prompt, %correct, points, score = self.score, "Answer scored");
    Ok(AnswerOutcome {
      correct,
      expected: answered.answer,
      points,
      score: self.score,
      streak: self.streak,
      next: self.current.clone(),
    })
  }

  /// Move on without scoring; breaks the streak.
  pub fn skip(&mut self, now: Instant) -> Result<&Question, QuizError> {
    self.check_playable(now)?;
    self.streak = 0;
    self.advance();
    Ok(&self.current)
  }

  /// Start over, possibly at another difficulty. The buffer is rebuilt from a new
  /// generator so nothing generated for the old round carries over.
  pub fn reset(&mut self, cfg: &QuizConfig, difficulty: Difficulty, now: Instant) -> Result<(), QuizError> {
    let mut buffer = new_buffer(cfg, difficulty)?;
    self.current = buffer.dequeue();
    self.buffer = buffer;
    self.difficulty = difficulty;
    self.round_no += 1;
    self.refill_below = cfg.refill_below();
    self.round = Duration::from_secs(cfg.round_seconds);
    self.score = 0;
    self.streak = 0;
    self.best_streak = 0;
    self.answered = 0;
    self.correct = 0;
    self.started_at = now;
    self.status = SessionStatus::Active;
    self.recorded = false;
    Ok(())
  }

  pub fn finish(&mut self) -> SessionSummary {
    self.status = SessionStatus::Finished;
    self.buffer.reset();
    self.summary()
  }

  /// Finish the round if it is still running and return its summary, but only
  /// the first time per round; later calls get `None`.
  pub fn close(&mut self) -> Option<SessionSummary> {
    let summary = if self.is_finished() { self.summary() } else { self.finish() };
    if self.recorded {
      return None;
    }
    self.recorded = true;
    Some(summary)
  }

  pub fn summary(&self) -> SessionSummary {
    SessionSummary {
      session_id: self.id,
      round: self.round_no,
      player_id: self.player_id,
      player_name: None,
      difficulty: self.difficulty,
      score: self.score,
      answered: self.answered,
      correct: self.correct,
      best_streak: self.best_streak,
    }
  }
}
