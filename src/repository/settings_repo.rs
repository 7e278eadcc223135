// ==========================================
// Каталог автозапчастей - настройки маркетплейса
// ==========================================
// Учётные данные выгрузки: логин, подписанный пароль,
// идентификатор пакета, статус последней синхронизации.
// Пароль хранится только в подписанном виде
// (см. marketplace::settings).
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;

#[derive(Debug, Clone)]
pub struct MarketplaceSettings {
    pub id: i64,
    pub login: String,
    /// Пароль в обратимом подписанном представлении.
    pub password_signed: String,
    pub packet_id: String,
    pub is_active: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_sync_status: String,
    pub last_sync_error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SettingsRepository {
    conn: SharedConnection,
}

const SETTINGS_COLUMNS: &str = "id, login, password_signed, packet_id, is_active, \
    last_sync, last_sync_status, last_sync_error, created_at, updated_at";

impl SettingsRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Активная запись настроек (первая по порядку создания).
    pub fn active(&self) -> RepositoryResult<Option<MarketplaceSettings>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM marketplace_settings \
             WHERE is_active = 1 ORDER BY id LIMIT 1"
        ))?;
        match stmt.query_row([], map_settings_row) {
            Ok(settings) => Ok(Some(settings)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert(
        &self,
        login: &str,
        password_signed: &str,
        packet_id: &str,
    ) -> RepositoryResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO marketplace_settings \
             (login, password_signed, packet_id, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![login, password_signed, packet_id, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Фиксация результата попытки синхронизации.
    pub fn update_sync_status(
        &self,
        id: i64,
        status: &str,
        error: &str,
    ) -> RepositoryResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE marketplace_settings SET \
             last_sync = ?1, last_sync_status = ?2, last_sync_error = ?3, updated_at = ?1 \
             WHERE id = ?4",
            params![now, status, error, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MarketplaceSettings".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn map_settings_row(row: &Row<'_>) -> rusqlite::Result<MarketplaceSettings> {
    Ok(MarketplaceSettings {
        id: row.get(0)?,
        login: row.get(1)?,
        password_signed: row.get(2)?,
        packet_id: row.get(3)?,
        is_active: row.get(4)?,
        last_sync: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        last_sync_status: row.get(6)?,
        last_sync_error: row.get(7)?,
        created_at: parse_timestamp(row.get::<_, String>(8)?),
        updated_at: parse_timestamp(row.get::<_, String>(9)?),
    })
}

fn parse_timestamp(text: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_repo() -> SettingsRepository {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        SettingsRepository::from_connection(std::sync::Arc::new(std::sync::Mutex::new(conn)))
    }

    #[test]
    fn test_insert_active_and_update_status() {
        let repo = test_repo();
        assert!(repo.active().unwrap().is_none());

        let id = repo.insert("dealer", "signed-password", "12345").unwrap();
        let settings = repo.active().unwrap().unwrap();
        assert_eq!(settings.id, id);
        assert_eq!(settings.packet_id, "12345");
        assert!(settings.last_sync.is_none());

        repo.update_sync_status(id, "error", "HTTP 502").unwrap();
        let settings = repo.active().unwrap().unwrap();
        assert_eq!(settings.last_sync_status, "error");
        assert_eq!(settings.last_sync_error, "HTTP 502");
        assert!(settings.last_sync.is_some());
    }
}
