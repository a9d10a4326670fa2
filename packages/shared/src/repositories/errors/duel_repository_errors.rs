#[derive(Debug)]
pub enum DuelRepositoryError {
    Serialization(String),
    DynamoDb(String),
    TransactionError(String),
}

impl std::fmt::Display for DuelRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuelRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            DuelRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            DuelRepositoryError::TransactionError(msg) => {
                write!(f, "Transaction error: {}", msg)
            }
        }
    }
}

impl std::error::Error for DuelRepositoryError {}
