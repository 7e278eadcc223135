// ==========================================
// Каталог автозапчастей - репозиторий журнала
// ==========================================
// Только вставка и чтение: журнал append-only.
// ==========================================

use crate::db::SharedConnection;
use crate::domain::types::{OperationType, SyncStatus};
use crate::domain::{NewSyncLog, SyncErrorEntry, SyncLog};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;

pub struct SyncLogRepository {
    conn: SharedConnection,
}

const SYNC_LOG_COLUMNS: &str = "id, operation_type, status, message, processed_count, \
    created_count, updated_count, hidden_count, errors_count, errors, request_ip, \
    request_format, filename, processing_time, created_at";

impl SyncLogRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, log: NewSyncLog) -> RepositoryResult<i64> {
        let errors_json = serde_json::to_string(&log.errors)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sync_log (
                operation_type, status, message, processed_count, created_count,
                updated_count, hidden_count, errors_count, errors, request_ip,
                request_format, filename, processing_time, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                log.operation_type.as_str(),
                log.status.as_str(),
                log.message,
                log.processed_count,
                log.created_count,
                log.updated_count,
                log.hidden_count,
                log.errors_count,
                errors_json,
                log.request_ip,
                log.request_format,
                log.filename,
                log.processing_time,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent(&self, limit: i64) -> RepositoryResult<Vec<SyncLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYNC_LOG_COLUMNS} FROM sync_log ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], map_sync_log_row)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<SyncLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYNC_LOG_COLUMNS} FROM sync_log WHERE id = ?1"
        ))?;
        match stmt.query_row(params![id], map_sync_log_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn map_sync_log_row(row: &Row<'_>) -> rusqlite::Result<SyncLog> {
    let errors_text: String = row.get(9)?;
    let errors: Vec<SyncErrorEntry> = serde_json::from_str(&errors_text).unwrap_or_default();
    Ok(SyncLog {
        id: row.get(0)?,
        operation_type: OperationType::parse(&row.get::<_, String>(1)?)
            .unwrap_or(OperationType::FileUpload),
        status: SyncStatus::parse(&row.get::<_, String>(2)?).unwrap_or(SyncStatus::Error),
        message: row.get(3)?,
        processed_count: row.get(4)?,
        created_count: row.get(5)?,
        updated_count: row.get(6)?,
        hidden_count: row.get(7)?,
        errors_count: row.get(8)?,
        errors,
        request_ip: row.get(10)?,
        request_format: row.get(11)?,
        filename: row.get(12)?,
        processing_time: row.get(13)?,
        created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(14)?)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
