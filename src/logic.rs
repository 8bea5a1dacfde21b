//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting, resetting and finishing rounds
//!   - Scoring submissions (an expired round is recorded on the spot)
//!   - Skipping questions

use std::time::Instant;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{Difficulty, SessionSummary};
use crate::error::QuizError;
use crate::protocol::{to_answer_out, to_view, AnswerOut, SessionView};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn start_session(
  state: &AppState,
  difficulty: Option<Difficulty>,
  player_id: Option<Uuid>,
) -> Result<SessionView, QuizError> {
  state.create_session(difficulty, player_id, |s| to_view(s, Instant::now())).await
}

#[instrument(level = "debug", skip(state))]
pub async fn get_session(state: &AppState, id: Uuid) -> Result<SessionView, QuizError> {
  state.with_session(id, |s| to_view(s, Instant::now())).await
}

#[instrument(level = "info", skip(state, answer), fields(%id, answer_len = answer.len()))]
pub async fn submit_answer(state: &AppState, id: Uuid, answer: &str) -> Result<AnswerOut, QuizError> {
  let res = state
    .with_session(id, |s| {
      let now = Instant::now();
      s.submit(answer, now).map(|o| to_answer_out(o, s.remaining(now).as_secs()))
    })
    .await?;

  match res {
    Ok(out) => {
      debug!(target: "session", %id, answer = %trunc_for_log(answer, 32), correct = out.correct, score = out.score, "Answer evaluated");
      Ok(out)
    }
    Err(QuizError::SessionExpired) => {
      let summary = state.finish_session(id).await?;
      info!(target: "session", %id, score = summary.score, "Round time over; session closed");
      Err(QuizError::SessionExpired)
    }
    Err(e) => Err(e),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn skip_question(state: &AppState, id: Uuid) -> Result<SessionView, QuizError> {
  let res = state
    .with_session(id, |s| -> Result<SessionView, QuizError> {
      let now = Instant::now();
      s.skip(now)?;
      Ok(to_view(s, now))
    })
    .await?;
  if matches!(res, Err(QuizError::SessionExpired)) {
    state.finish_session(id).await?;
  }
  res
}

/// Restart the round. A played or finished round that was never recorded is
/// closed under the same lock as the reset and recorded right after.
#[instrument(level = "info", skip(state))]
pub async fn reset_session(
  state: &AppState,
  id: Uuid,
  difficulty: Option<Difficulty>,
) -> Result<SessionView, QuizError> {
  let cfg = state.config.clone();
  let (pending, view) = state
    .with_session(id, |s| {
      let now = Instant::now();
      let pending = if s.answered > 0 || s.is_finished() { s.close() } else { None };
      let difficulty = difficulty.unwrap_or(s.difficulty);
      let view = s.reset(&cfg, difficulty, now).map(|()| to_view(s, now));
      (pending, view)
    })
    .await?;
  if let Some(summary) = pending {
    state.record(summary).await;
  }
  let view = view?;
  info!(target: "session", %id, difficulty = %view.difficulty, "Session reset");
  Ok(view)
}

#[instrument(level = "info", skip(state))]
pub async fn finish_session(state: &AppState, id: Uuid) -> Result<SessionSummary, QuizError> {
  state.finish_session(id).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::QuizConfig;

  fn state() -> AppState {
    AppState::with_config(QuizConfig { rng_seed: Some(5), ..QuizConfig::default() }).unwrap()
  }

  async fn answer_correctly(state: &AppState, id: Uuid) -> AnswerOut {
    let ans = state.with_session(id, |s| s.current().answer.to_string()).await.unwrap();
    submit_answer(state, id, &ans).await.unwrap()
  }

  #[tokio::test]
  async fn start_submit_finish_flow() {
    let st = state();
    let view = start_session(&st, Some(Difficulty::Easy), None).await.unwrap();
    assert_eq!(view.buffered, 7);
    assert!((59..=60).contains(&view.remaining_secs));

    let out = answer_correctly(&st, view.id).await;
    assert!(out.correct);
    assert_eq!(out.score, 1);

    let wrong = submit_answer(&st, view.id, "not a number").await.unwrap();
    assert!(!wrong.correct);

    let summary = finish_session(&st, view.id).await.unwrap();
    assert_eq!((summary.answered, summary.correct, summary.round), (2, 1, 1));
    assert!(matches!(
      submit_answer(&st, view.id, "1").await,
      Err(QuizError::SessionFinished)
    ));
  }

  #[tokio::test]
  async fn reset_records_played_round_and_starts_next() {
    let st = state();
    let view = start_session(&st, None, None).await.unwrap();
    answer_correctly(&st, view.id).await;

    let fresh = reset_session(&st, view.id, Some(Difficulty::Hard)).await.unwrap();
    assert_eq!(fresh.difficulty, Difficulty::Hard);
    assert_eq!(fresh.score, 0);
    assert_eq!(st.leaderboard().await.len(), 1);

    answer_correctly(&st, view.id).await;
    let summary = finish_session(&st, view.id).await.unwrap();
    assert_eq!((summary.round, summary.score), (2, 3));
    assert_eq!(st.leaderboard().await.len(), 2);
  }

  #[tokio::test]
  async fn reset_of_untouched_round_records_nothing() {
    let st = state();
    let view = start_session(&st, None, None).await.unwrap();
    reset_session(&st, view.id, None).await.unwrap();
    assert!(st.leaderboard().await.is_empty());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_resets_never_drop_answers() {
    let st = state();
    let player = st.register_player("ivy").await.unwrap();
    let view = start_session(&st, None, Some(player.id)).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..60 {
      let st = st.clone();
      tasks.push(tokio::spawn(async move {
        if i % 3 == 0 {
          reset_session(&st, view.id, None).await.map(|_| 0)
        } else {
          let ans = st.with_session(view.id, |s| s.current().answer.to_string()).await?;
          submit_answer(&st, view.id, &ans).await.map(|o| u32::from(o.correct))
        }
      }));
    }
    let mut correct = 0;
    for t in tasks {
      correct += t.await.unwrap().unwrap();
    }
    finish_session(&st, view.id).await.unwrap();

    let p = st.get_player(player.id).await.unwrap();
    assert_eq!(p.total_correct, correct);
  }

  #[tokio::test]
  async fn reset_records_round_that_timed_out() {
    let st = AppState::with_config(QuizConfig { round_seconds: 1, ..QuizConfig::default() }).unwrap();
    let view = start_session(&st, None, None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert!(matches!(skip_question(&st, view.id).await, Err(QuizError::SessionExpired)));
    assert_eq!(st.leaderboard().await.len(), 1);

    let fresh = reset_session(&st, view.id, None).await.unwrap();
    assert_eq!(fresh.buffered, 7);
    assert_eq!(st.leaderboard().await.len(), 1);
  }

  #[tokio::test]
  async fn skip_serves_next_question() {
    let st = state();
    let view = start_session(&st, None, None).await.unwrap();
    let after = skip_question(&st, view.id).await.unwrap();
    assert_eq!(after.answered, 0);
    assert_eq!(after.buffered, 8);
  }

  #[tokio::test]
  async fn expired_round_is_closed_and_recorded() {
    let st = AppState::with_config(QuizConfig { round_seconds: 1, ..QuizConfig::default() }).unwrap();
    let view = start_session(&st, None, None).await.unwrap();
    answer_correctly(&st, view.id).await;
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let res = submit_answer(&st, view.id, "1").await;
    assert!(matches!(res, Err(QuizError::SessionExpired)));
    let board = st.leaderboard().await;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].correct, 1);
    assert!(matches!(submit_answer(&st, view.id, "1").await, Err(QuizError::SessionFinished)));
  }

  #[tokio::test]
  async fn unknown_session_is_reported() {
    let st = state();
    let res = get_session(&st, Uuid::new_v4()).await;
    assert!(matches!(res, Err(QuizError::SessionNotFound(_))));
  }
}
