use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::duel::{ParticipantScore, SessionId};
use crate::models::events::{AnswerResult, DuelEnd, DuelFound, EndReason, ScoreBoard};
use crate::models::player::Participant;
use crate::models::question::Question;

/// How a completed duel resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuelOutcome {
    Winner(String),
    Tie,
}

/// In-memory state of one running duel.
#[derive(Debug, Clone)]
pub struct DuelSession {
    pub id: SessionId,
    pub players: [Participant; 2],
    pub questions: Vec<Question>,
    pub scores: ScoreBoard,
    pub current_index: usize,
    pub subject_id: Option<String>,
    /// Participant rows exist in storage and should receive final scores.
    pub participants_recorded: bool,
    pub created_at: DateTime<Utc>,
}

impl DuelSession {
    pub fn new(
        id: SessionId,
        first: Participant,
        second: Participant,
        questions: Vec<Question>,
        subject_id: Option<String>,
    ) -> Self {
        let mut scores = ScoreBoard::new();
        scores.insert(first.connection_id.clone(), 0);
        scores.insert(second.connection_id.clone(), 0);

        DuelSession {
            id,
            players: [first, second],
            questions,
            scores,
            current_index: 0,
            subject_id,
            participants_recorded: false,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &str {
        self.id.as_str()
    }

    pub fn connection_ids(&self) -> [&str; 2] {
        [
            self.players[0].connection_id.as_str(),
            self.players[1].connection_id.as_str(),
        ]
    }

    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        self.players
            .iter()
            .find(|player| player.connection_id == connection_id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// Applies one answer to the current question and advances the cursor.
    ///
    /// Returns `None` without touching any state when the connection is not part
    /// of this duel or `question_id` is not the current question.
    pub fn answer(
        &mut self,
        connection_id: &str,
        question_id: &str,
        answer_id: Option<&str>,
    ) -> Option<AnswerResult> {
        self.participant(connection_id)?;
        let question = self.current_question()?;
        if question.question_id != question_id {
            return None;
        }

        let correct = question.is_correct_answer(answer_id);
        let question_id = question.question_id.clone();
        let correct_answer_id = question
            .correct_option()
            .map(|option| option.option_id.clone());

        if correct {
            *self.scores.entry(connection_id.to_string()).or_insert(0) += 1;
        }
        self.current_index += 1;

        Some(AnswerResult {
            question_id,
            correct_answer_id,
            correct_player_id: correct.then(|| connection_id.to_string()),
            scores: self.scores.clone(),
        })
    }

    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }

    pub fn score_of(&self, connection_id: &str) -> u32 {
        self.scores.get(connection_id).copied().unwrap_or(0)
    }

    pub fn outcome(&self) -> DuelOutcome {
        let [first, second] = &self.players;
        match self
            .score_of(&first.connection_id)
            .cmp(&self.score_of(&second.connection_id))
        {
            Ordering::Greater => DuelOutcome::Winner(first.connection_id.clone()),
            Ordering::Less => DuelOutcome::Winner(second.connection_id.clone()),
            Ordering::Equal => DuelOutcome::Tie,
        }
    }

    /// User id to record as the winner. `None` on a tie or for an anonymous winner.
    pub fn winner_user_id(&self, outcome: &DuelOutcome) -> Option<String> {
        match outcome {
            DuelOutcome::Winner(connection_id) => self
                .participant(connection_id)
                .and_then(|player| player.profile.user_id.clone()),
            DuelOutcome::Tie => None,
        }
    }

    pub fn participant_scores(&self) -> Vec<ParticipantScore> {
        self.players
            .iter()
            .filter_map(|player| {
                player.user_id().map(|user_id| ParticipantScore {
                    user_id: user_id.to_string(),
                    score: self.score_of(&player.connection_id),
                })
            })
            .collect()
    }

    pub fn player_names(&self) -> BTreeMap<String, String> {
        self.players
            .iter()
            .map(|player| {
                (
                    player.connection_id.clone(),
                    player.profile.display_name.clone(),
                )
            })
            .collect()
    }

    pub fn duel_found(&self) -> DuelFound {
        DuelFound {
            session_id: self.key().to_string(),
            players: self
                .players
                .iter()
                .map(|player| (player.connection_id.clone(), player.profile.clone()))
                .collect(),
            questions: self.questions.iter().map(Question::to_view).collect(),
        }
    }

    pub fn completed_event(&self, outcome: &DuelOutcome) -> DuelEnd {
        let (winner_id, tie) = match outcome {
            DuelOutcome::Winner(connection_id) => (Some(connection_id.clone()), false),
            DuelOutcome::Tie => (None, true),
        };
        DuelEnd {
            winner_id,
            tie,
            final_scores: self.scores.clone(),
            player_names: self.player_names(),
            reason: None,
        }
    }

    pub fn abandoned_event(&self) -> DuelEnd {
        DuelEnd {
            winner_id: None,
            tie: false,
            final_scores: self.scores.clone(),
            player_names: self.player_names(),
            reason: Some(EndReason::Disconnect),
        }
    }
}
