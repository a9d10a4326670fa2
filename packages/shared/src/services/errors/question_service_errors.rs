#[derive(Debug, PartialEq)]
pub enum QuestionServiceError {
    NoQuestionsAvailable(Option<String>),
}

impl std::fmt::Display for QuestionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionServiceError::NoQuestionsAvailable(Some(subject_id)) => {
                write!(f, "No questions available for subject {}", subject_id)
            }
            QuestionServiceError::NoQuestionsAvailable(None) => {
                write!(f, "No questions available")
            }
        }
    }
}

impl std::error::Error for QuestionServiceError {}
