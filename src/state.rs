//! Application state: quiz config, live sessions, players and finished rounds.
//!
//! This module owns:
//!   - the validated `QuizConfig`
//!   - live game sessions by id
//!   - the player registry (in-memory "accounts")
//!   - the leaderboard: the best finished rounds, at most `leaderboard_size`
//!
//! No two of these locks are ever held at once. Each session's refill + dequeue
//! runs entirely under the sessions write lock.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_quiz_config_from_env, QuizConfig};
use crate::domain::{Difficulty, Player, SessionSummary};
use crate::error::QuizError;
use crate::session::GameSession;
use crate::util::clean_name;

const MAX_NAME_CHARS: usize = 32;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<QuizConfig>,
  sessions: Arc<RwLock<HashMap<Uuid, GameSession>>>,
  /// Score-descending; equal scores stay in finishing order.
  board: Arc<RwLock<Vec<SessionSummary>>>,
  players: Arc<RwLock<HashMap<Uuid, Player>>>,
}

impl AppState {
  /// Build state from env (QUIZ_CONFIG_PATH), failing on invalid configuration.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Result<Self, QuizError> {
    Self::with_config(load_quiz_config_from_env()?)
  }

  pub fn with_config(config: QuizConfig) -> Result<Self, QuizError> {
    config.validate()?;
    info!(target: "quiz_backend", capacity = config.buffer_capacity, refill_below = config.refill_below(), round_seconds = config.round_seconds, default_difficulty = %config.default_difficulty, seeded = config.rng_seed.is_some(), "Quiz state ready");
    Ok(Self {
      config: Arc::new(config),
      sessions: Arc::new(RwLock::new(HashMap::new())),
      board: Arc::new(RwLock::new(Vec::new())),
      players: Arc::new(RwLock::new(HashMap::new())),
    })
  }

  /// Create a session and run `f` on it while the map is still locked.
  #[instrument(level = "debug", skip(self, f))]
  pub async fn create_session<R>(
    &self,
    difficulty: Option<Difficulty>,
    player_id: Option<Uuid>,
    f: impl FnOnce(&GameSession) -> R,
  ) -> Result<R, QuizError> {
    if let Some(pid) = player_id {
      if !self.players.read().await.contains_key(&pid) {
        return Err(QuizError::PlayerNotFound(pid));
      }
    }
    self.sweep().await;
    let difficulty = difficulty.unwrap_or(self.config.default_difficulty);
    let session = GameSession::start(&self.config, difficulty, player_id, Instant::now())?;
    let id = session.id;
    let mut sessions = self.sessions.write().await;
    let out = f(&session);
    sessions.insert(id, session);
    info!(target: "session", %id, %difficulty, player = ?player_id, live = sessions.len(), "Session started");
    Ok(out)
  }

  /// Run `f` against a live session under the write lock.
  pub async fn with_session<R>(
    &self,
    id: Uuid,
    f: impl FnOnce(&mut GameSession) -> R,
  ) -> Result<R, QuizError> {
    let mut sessions = self.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(QuizError::SessionNotFound(id))?;
    Ok(f(session))
  }

  /// Finish a session (if not already) and record its summary exactly once.
  /// Later calls return the same summary without recording it again.
  #[instrument(level = "debug", skip(self), fields(%id))]
  pub async fn finish_session(&self, id: Uuid) -> Result<SessionSummary, QuizError> {
    let (fresh, summary) = {
      let mut sessions = self.sessions.write().await;
      let session = sessions.get_mut(&id).ok_or(QuizError::SessionNotFound(id))?;
      match session.close() {
        Some(summary) => (true, summary),
        None => (false, session.summary()),
      }
    };
    if fresh {
      Ok(self.record(summary).await)
    } else {
      Ok(self.with_player_name(summary).await)
    }
  }

  /// Close rounds whose time ran out, recording them, and drop sessions whose
  /// round ended more than `evict_after_seconds` ago. Returns how many were dropped.
  #[instrument(level = "debug", skip(self))]
  pub async fn sweep(&self) -> usize {
    let now = Instant::now();
    let grace = Duration::from_secs(self.config.evict_after_seconds);
    let (closed, evicted, live) = {
      let mut sessions = self.sessions.write().await;
      let closed: Vec<SessionSummary> = sessions
        .values_mut()
        .filter(|s| s.is_expired(now))
        .filter_map(GameSession::close)
        .collect();
      let before = sessions.len();
      sessions.retain(|_, s| !(s.is_expired(now) && s.overdue(now) >= grace));
      (closed, before - sessions.len(), sessions.len())
    };
    for summary in closed {
      info!(target: "session", id = %summary.session_id, round = summary.round, "Round timed out unattended");
      self.record(summary).await;
    }
    if evicted > 0 {
      debug!(target: "session", evicted, live, "Swept stale sessions");
    }
    evicted
  }

  /// Credit the player and place a newly finished round on the leaderboard.
  /// Callers obtain `summary` from `GameSession::close`, so each round arrives once.
  pub(crate) async fn record(&self, summary: SessionSummary) -> SessionSummary {
    if let Some(pid) = summary.player_id {
      match self.players.write().await.get_mut(&pid) {
        Some(p) => {
          p.games_played += 1;
          p.total_correct += summary.correct;
          p.best_score = p.best_score.max(summary.score);
        }
        None => warn!(target: "session", id = %summary.session_id, player = %pid, "Finished session references unknown player"),
      }
    }
    let summary = self.with_player_name(summary).await;
    info!(target: "session", id = %summary.session_id, round = summary.round, score = summary.score, answered = summary.answered, accuracy = %format!("{:.1}", summary.accuracy()), "Session recorded");

    let size = self.config.leaderboard_size;
    let mut board = self.board.write().await;
    let at = board.iter().position(|s| s.score < summary.score).unwrap_or(board.len());
    if at < size {
      board.insert(at, summary.clone());
      board.truncate(size);
    }
    summary
  }

  async fn with_player_name(&self, mut summary: SessionSummary) -> SessionSummary {
    if let Some(pid) = summary.player_id {
      summary.player_name = self.players.read().await.get(&pid).map(|p| p.name.clone());
    }
    summary
  }

  /// Top rounds by score; ties keep the earlier finish first.
  pub async fn leaderboard(&self) -> Vec<SessionSummary> {
    self.board.read().await.clone()
  }

  #[instrument(level = "info", skip(self))]
  pub async fn register_player(&self, raw_name: &str) -> Result<Player, QuizError> {
    let name = clean_name(raw_name, MAX_NAME_CHARS)
      .ok_or_else(|| QuizError::InvalidPlayerName(raw_name.to_string()))?;
    let mut players = self.players.write().await;
    if players.values().any(|p| p.name.eq_ignore_ascii_case(&name)) {
      return Err(QuizError::PlayerNameTaken(name));
    }
    let player = Player { id: Uuid::new_v4(), name, best_score: 0, games_played: 0, total_correct: 0 };
    players.insert(player.id, player.clone());
    info!(target: "quiz_backend", id = %player.id, name = %player.name, "Player registered");
    Ok(player)
  }

  pub async fn get_player(&self, id: Uuid) -> Result<Player, QuizError> {
    self.players.read().await.get(&id).cloned().ok_or(QuizError::PlayerNotFound(id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state() -> AppState {
    AppState::with_config(QuizConfig { rng_seed: Some(3), leaderboard_size: 2, ..QuizConfig::default() })
      .unwrap()
  }

  #[test]
  fn invalid_config_is_rejected() {
    let err = AppState::with_config(QuizConfig { buffer_capacity: 0, ..QuizConfig::default() }).err();
    assert!(matches!(err, Some(QuizError::InvalidConfiguration(_))));
  }

  #[tokio::test]
  async fn player_names_are_unique_ignoring_case() {
    let st = state();
    let p = st.register_player(" Ada ").await.unwrap();
    assert_eq!(p.name, "Ada");
    assert!(matches!(st.register_player("ada").await, Err(QuizError::PlayerNameTaken(_))));
    assert!(matches!(st.register_player("").await, Err(QuizError::InvalidPlayerName(_))));
    assert_eq!(st.get_player(p.id).await.unwrap().name, "Ada");
  }

  #[tokio::test]
  async fn unknown_player_cannot_start_session() {
    let st = state();
    let missing = Uuid::new_v4();
    let res = st.create_session(None, Some(missing), |s| s.id).await;
    assert!(matches!(res, Err(QuizError::PlayerNotFound(id)) if id == missing));
  }

  #[tokio::test]
  async fn finishing_records_once_and_credits_player() {
    let st = state();
    let player = st.register_player("bob").await.unwrap();
    let id = st.create_session(Some(Difficulty::Medium), Some(player.id), |s| s.id).await.unwrap();
    st.with_session(id, |s| {
      let ans = s.current().answer.to_string();
      s.submit(&ans, Instant::now()).unwrap();
    })
    .await
    .unwrap();

    let first = st.finish_session(id).await.unwrap();
    let second = st.finish_session(id).await.unwrap();
    assert_eq!(first.score, 2);
    assert_eq!(second.score, 2);
    assert_eq!(first.player_name.as_deref(), Some("bob"));

    let p = st.get_player(player.id).await.unwrap();
    assert_eq!((p.games_played, p.best_score, p.total_correct), (1, 2, 1));
    assert_eq!(st.leaderboard().await.len(), 1);
  }

  #[tokio::test]
  async fn leaderboard_sorts_by_score_and_truncates() {
    let st = state();
    let mut ids = Vec::new();
    for correct in [1, 3, 2, 3] {
      let id = st.create_session(Some(Difficulty::Easy), None, |s| s.id).await.unwrap();
      st.with_session(id, |s| {
        for _ in 0..correct {
          let ans = s.current().answer.to_string();
          s.submit(&ans, Instant::now()).unwrap();
        }
      })
      .await
      .unwrap();
      st.finish_session(id).await.unwrap();
      ids.push(id);
    }
    let board = st.leaderboard().await;
    let scores: Vec<u32> = board.iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![3, 3]);
    assert_eq!(board[0].session_id, ids[1]);
    assert_eq!(board[1].session_id, ids[3]);
  }

  fn short_rounds(evict_after_seconds: u64) -> AppState {
    AppState::with_config(QuizConfig { round_seconds: 1, evict_after_seconds, ..QuizConfig::default() })
      .unwrap()
  }

  #[tokio::test]
  async fn abandoned_round_is_recorded_and_evicted() {
    let st = short_rounds(0);
    let player = st.register_player("zed").await.unwrap();
    let id = st.create_session(None, Some(player.id), |s| s.id).await.unwrap();
    st.with_session(id, |s| {
      let ans = s.current().answer.to_string();
      s.submit(&ans, Instant::now()).unwrap();
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(st.sweep().await, 1);
    let board = st.leaderboard().await;
    assert_eq!(board.len(), 1);
    assert_eq!((board[0].session_id, board[0].correct), (id, 1));
    assert_eq!(board[0].player_name.as_deref(), Some("zed"));
    assert_eq!(st.get_player(player.id).await.unwrap().games_played, 1);
    assert!(matches!(st.with_session(id, |_| ()).await, Err(QuizError::SessionNotFound(_))));
    assert_eq!(st.sweep().await, 0);
  }

  #[tokio::test]
  async fn timed_out_round_stays_readable_until_grace_ends() {
    let st = short_rounds(300);
    let live = st.create_session(None, None, |s| s.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(st.sweep().await, 0);
    assert!(st.with_session(live, |s| s.is_finished()).await.unwrap());
    assert_eq!(st.leaderboard().await.len(), 1);
    let summary = st.finish_session(live).await.unwrap();
    assert_eq!(summary.session_id, live);
    assert_eq!(st.leaderboard().await.len(), 1);
  }

  #[tokio::test]
  async fn starting_a_session_sweeps_stale_ones() {
    let st = short_rounds(0);
    let stale = st.create_session(None, None, |s| s.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let fresh = st.create_session(None, None, |s| s.id).await.unwrap();
    assert!(matches!(st.with_session(stale, |_| ()).await, Err(QuizError::SessionNotFound(_))));
    assert!(st.with_session(fresh, |s| !s.is_finished()).await.unwrap());
    assert_eq!(st.leaderboard().await.len(), 1);
  }

  #[tokio::test]
  async fn missing_session_is_not_found() {
    let st = state();
    let id = Uuid::new_v4();
    assert!(matches!(st.with_session(id, |_| ()).await, Err(QuizError::SessionNotFound(_))));
    assert!(matches!(st.finish_session(id).await, Err(QuizError::SessionNotFound(_))));
  }
}
