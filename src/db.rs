// ==========================================
// Каталог автозапчастей - инициализация SQLite
// ==========================================
// Цели:
// - единые PRAGMA для всех соединений (foreign_keys, busy_timeout)
// - идемпотентное создание схемы
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// busy_timeout по умолчанию (мс)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Общий для всех репозиториев хендл соединения.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Единые PRAGMA для соединения.
///
/// foreign_keys и busy_timeout настраиваются на каждое соединение отдельно.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Открыть соединение и применить единую конфигурацию.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Открыть разделяемое соединение.
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<SharedConnection> {
    Ok(Arc::new(Mutex::new(open_sqlite_connection(db_path)?)))
}

/// Создание схемы (идемпотентно).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE,
            parent_id   INTEGER REFERENCES categories(id) ON DELETE CASCADE,
            is_active   INTEGER NOT NULL DEFAULT 1,
            order_no    INTEGER NOT NULL DEFAULT 0,
            keywords    TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);

        CREATE TABLE IF NOT EXISTS products (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id       TEXT UNIQUE,
            article           TEXT NOT NULL DEFAULT '',
            name              TEXT NOT NULL,
            brand             TEXT NOT NULL DEFAULT '',
            category_id       INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            price             TEXT NOT NULL DEFAULT '0',
            wholesale_price   TEXT,
            old_price         TEXT,
            quantity          INTEGER NOT NULL DEFAULT 0,
            availability      TEXT NOT NULL DEFAULT 'in_stock',
            condition         TEXT NOT NULL DEFAULT 'new',
            short_description TEXT NOT NULL DEFAULT '',
            description       TEXT NOT NULL DEFAULT '',
            characteristics   TEXT NOT NULL DEFAULT '',
            applicability     TEXT NOT NULL DEFAULT '',
            cross_numbers     TEXT NOT NULL DEFAULT '',
            catalog_type      TEXT NOT NULL DEFAULT 'retail',
            properties        TEXT NOT NULL DEFAULT '{}',
            is_active         INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_article ON products(article, catalog_type);
        CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand);
        CREATE INDEX IF NOT EXISTS idx_products_active ON products(is_active, availability);

        CREATE TABLE IF NOT EXISTS sync_log (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            operation_type   TEXT NOT NULL,
            status           TEXT NOT NULL,
            message          TEXT NOT NULL DEFAULT '',
            processed_count  INTEGER NOT NULL DEFAULT 0,
            created_count    INTEGER NOT NULL DEFAULT 0,
            updated_count    INTEGER NOT NULL DEFAULT 0,
            hidden_count     INTEGER NOT NULL DEFAULT 0,
            errors_count     INTEGER NOT NULL DEFAULT 0,
            errors           TEXT NOT NULL DEFAULT '[]',
            request_ip       TEXT,
            request_format   TEXT,
            filename         TEXT,
            processing_time  REAL NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sync_log_created ON sync_log(created_at DESC);

        CREATE TABLE IF NOT EXISTS marketplace_settings (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            login            TEXT NOT NULL,
            password_signed  TEXT NOT NULL,
            packet_id        TEXT NOT NULL,
            is_active        INTEGER NOT NULL DEFAULT 1,
            last_sync        TEXT,
            last_sync_status TEXT NOT NULL DEFAULT '',
            last_sync_error  TEXT NOT NULL DEFAULT '',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('products','categories','sync_log','marketplace_settings')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}
