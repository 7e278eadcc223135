// ==========================================
// Каталог автозапчастей - журнал синхронизации
// ==========================================
// Append-only журнал: одна запись на каждую попытку
// импорта или выгрузки.
// ==========================================

use crate::domain::types::{OperationType, SyncStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Предел хранимых ошибок в одной записи журнала.
pub const MAX_LOGGED_ERRORS: usize = 50;

/// Сколько ошибок возвращается вызывающей стороне.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    /// external_id, артикул или номер строки.
    pub identifier: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: i64,
    pub operation_type: OperationType,
    pub status: SyncStatus,
    pub message: String,

    pub processed_count: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub hidden_count: i64,
    pub errors_count: i64,

    /// Первые MAX_LOGGED_ERRORS ошибок батча.
    pub errors: Vec<SyncErrorEntry>,

    pub request_ip: Option<String>,
    pub request_format: Option<String>,
    pub filename: Option<String>,

    /// Время обработки, секунды.
    pub processing_time: f64,
    pub created_at: DateTime<Utc>,
}

/// Заготовка записи журнала: всё, кроме id и created_at,
/// которые назначает репозиторий.
#[derive(Debug, Clone)]
pub struct NewSyncLog {
    pub operation_type: OperationType,
    pub status: SyncStatus,
    pub message: String,
    pub processed_count: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub hidden_count: i64,
    pub errors_count: i64,
    pub errors: Vec<SyncErrorEntry>,
    pub request_ip: Option<String>,
    pub request_format: Option<String>,
    pub filename: Option<String>,
    pub processing_time: f64,
}

impl NewSyncLog {
    pub fn new(operation_type: OperationType, status: SyncStatus) -> Self {
        NewSyncLog {
            operation_type,
            status,
            message: String::new(),
            processed_count: 0,
            created_count: 0,
            updated_count: 0,
            hidden_count: 0,
            errors_count: 0,
            errors: Vec::new(),
            request_ip: None,
            request_format: None,
            filename: None,
            processing_time: 0.0,
        }
    }

    /// Усечение списка ошибок до лимита журнала.
    /// errors_count при этом сохраняет полное число.
    pub fn with_errors(mut self, errors: Vec<SyncErrorEntry>) -> Self {
        self.errors_count = errors.len() as i64;
        self.errors = errors.into_iter().take(MAX_LOGGED_ERRORS).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_truncated_at_limit() {
        let errors: Vec<SyncErrorEntry> = (0..80)
            .map(|i| SyncErrorEntry {
                identifier: format!("id-{i}"),
                message: "ошибка".to_string(),
            })
            .collect();
        let log = NewSyncLog::new(OperationType::FileUpload, SyncStatus::Partial)
            .with_errors(errors);
        assert_eq!(log.errors.len(), MAX_LOGGED_ERRORS);
        assert_eq!(log.errors_count, 80);
    }
}
