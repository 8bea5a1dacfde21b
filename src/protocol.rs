//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Difficulty, Player, SessionStatus, SessionSummary};
use crate::error::QuizError;
use crate::session::{AnswerOutcome, GameSession};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartSession {
        #[serde(default)]
        difficulty: Option<Difficulty>,
        #[serde(default, rename = "playerId")]
        player_id: Option<Uuid>,
    },
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        answer: String,
    },
    Skip {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    ResetSession {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(default)]
        difficulty: Option<Difficulty>,
    },
    FinishSession {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Leaderboard,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    AnswerResult {
        result: AnswerOut,
    },
    Summary {
        summary: SessionSummary,
    },
    Leaderboard {
        entries: Vec<SessionSummary>,
    },
    Error {
        message: String,
    },
}

/// The question on screen. The expected answer stays server-side.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub prompt: String,
}

/// DTO used by both WS and HTTP for session delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
    pub difficulty: Difficulty,
    pub status: SessionStatus,
    pub question: QuestionOut,
    pub score: u32,
    pub streak: u32,
    pub answered: u32,
    pub correct: u32,
    /// Questions pre-generated behind the current one (display only).
    pub buffered: usize,
    pub capacity: usize,
    pub remaining_secs: u64,
}

/// Snapshot a live session for the client.
pub fn to_view(s: &GameSession, now: Instant) -> SessionView {
    SessionView {
        id: s.id,
        player_id: s.player_id,
        difficulty: s.difficulty,
        status: s.status,
        question: QuestionOut { prompt: s.current().prompt.clone() },
        score: s.score,
        streak: s.streak,
        answered: s.answered,
        correct: s.correct,
        buffered: s.buffered(),
        capacity: s.buffer_capacity(),
        remaining_secs: s.remaining(now).as_secs(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub correct: bool,
    pub expected: i64,
    pub points: u32,
    pub score: u32,
    pub streak: u32,
    pub next: QuestionOut,
    pub remaining_secs: u64,
}

pub fn to_answer_out(o: AnswerOutcome, remaining_secs: u64) -> AnswerOut {
    AnswerOut {
        correct: o.correct,
        expected: o.expected,
        points: o.points,
        score: o.score,
        streak: o.streak,
        next: QuestionOut { prompt: o.next.prompt },
        remaining_secs,
    }
}

//
// HTTP request/response DTOs
//

/// Parse an optional difficulty name; unknown names are rejected.
pub fn parse_difficulty(raw: Option<&str>) -> Result<Option<Difficulty>, QuizError> {
    raw.map(str::parse::<Difficulty>).transpose()
}

#[derive(Debug, Default, Deserialize)]
pub struct StartIn {
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, rename = "playerId")]
    pub player_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetIn {
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Deserialize)]
pub struct PlayerIn {
    pub name: String,
}

pub type PlayerOut = Player;

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub entries: Vec<SessionSummary>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_messages_use_snake_case_tags() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_session","difficulty":"hard"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientWsMessage::StartSession { difficulty: Some(Difficulty::Hard), player_id: None }
        ));

        let out = serde_json::to_value(ServerWsMessage::Error { message: "x".into() }).unwrap();
        assert_eq!(out, serde_json::json!({ "type": "error", "message": "x" }));
    }

    #[test]
    fn difficulty_names_are_checked() {
        assert_eq!(parse_difficulty(None).unwrap(), None);
        assert_eq!(parse_difficulty(Some("Medium")).unwrap(), Some(Difficulty::Medium));
        assert!(matches!(parse_difficulty(Some("expert")), Err(QuizError::UnknownDifficulty(_))));
    }
}
