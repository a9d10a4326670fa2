use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub option_id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// A multiple-choice question as stored in the question table or the fallback file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
}

impl Question {
    /// The single option flagged correct, if the question is well formed.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        let mut correct = self.options.iter().filter(|option| option.is_correct);
        match (correct.next(), correct.next()) {
            (Some(option), None) => Some(option),
            _ => None,
        }
    }

    pub fn is_playable(&self) -> bool {
        !self.question_id.is_empty() && self.correct_option().is_some()
    }

    pub fn is_correct_answer(&self, answer_id: Option<&str>) -> bool {
        match (answer_id, self.correct_option()) {
            (Some(answer_id), Some(correct)) => correct.option_id == answer_id,
            _ => false,
        }
    }

    pub fn to_view(&self) -> QuestionView {
        QuestionView {
            id: self.question_id.clone(),
            text: self.prompt.clone(),
            options: self
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.option_id.clone(),
                    text: option.text.clone(),
                })
                .collect(),
        }
    }
}

/// Client-facing question. Carries no correctness information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}
