// ==========================================
// Каталог автозапчастей - ошибки слоя хранения
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("запись не найдена: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("не удалось открыть базу данных: {0}")]
    DatabaseConnectionError(String),

    #[error("не удалось захватить соединение: {0}")]
    LockError(String),

    #[error("ошибка транзакции: {0}")]
    DatabaseTransactionError(String),

    #[error("ошибка запроса: {0}")]
    DatabaseQueryError(String),

    #[error("нарушение уникальности: {0}")]
    UniqueConstraintViolation(String),

    #[error("нарушение внешнего ключа: {0}")]
    ForeignKeyViolation(String),

    #[error("некорректное значение поля {field}: {message}")]
    FieldValueError { field: String, message: String },

    #[error("внутренняя ошибка: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl RepositoryError {
    /// Ошибки, для которых имеет смысл один повтор внутри батча.
    pub fn is_retryable(&self) -> bool {
        match self {
            RepositoryError::DatabaseQueryError(msg) => {
                msg.contains("locked") || msg.contains("busy")
            }
            RepositoryError::LockError(_) => true,
            _ => false,
        }
    }
}

/// Result слоя хранения.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
