// ==========================================
// Каталог автозапчастей - конфигурация
// ==========================================
// Все параметры берутся из окружения (.env подхватывается
// в main). Значения по умолчанию пригодны для разработки,
// кроме секретов - они обязательны.
// ==========================================

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Лимит размера файла обмена по умолчанию: 100 MB.
pub const DEFAULT_FILE_LIMIT: u64 = 104_857_600;

/// TTL сессии обмена по умолчанию: 1 час.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3_600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Путь к файлу SQLite.
    pub database_path: String,
    /// Адрес HTTP-сервера.
    pub bind_addr: String,

    /// Секрет входящего API (X-API-Key / Bearer).
    pub api_key: String,
    /// Секрет процесса: подпись хранимых учётных данных.
    pub secret_key: String,

    /// Логин/пароль обмена (HTTP Basic в режиме checkauth).
    pub exchange_login: String,
    pub exchange_password: String,

    /// Каталог приёма файлов обмена.
    pub exchange_dir: PathBuf,
    /// Лимит размера одного файла обмена, байт.
    pub exchange_file_limit: u64,
    /// TTL сессии обмена, секунд.
    pub exchange_session_ttl_secs: u64,

    /// URL приёмника выгрузки на маркетплейс.
    pub marketplace_sync_url: String,
    /// Базовый адрес сайта для ссылок в выгрузке.
    pub site_base_url: String,

    /// Необязательный путь к файлу таблиц обогащения.
    pub enrichment_tables_path: Option<PathBuf>,
}

impl AppConfig {
    /// Чтение конфигурации из окружения.
    pub fn from_env() -> Result<Self> {
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "autoparts.db".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let api_key = env::var("API_KEY").context("не задана переменная API_KEY")?;
        if api_key.trim().is_empty() {
            bail!("API_KEY не может быть пустым");
        }
        let secret_key = env::var("SECRET_KEY").context("не задана переменная SECRET_KEY")?;
        if secret_key.trim().is_empty() {
            bail!("SECRET_KEY не может быть пустым");
        }

        let exchange_login =
            env::var("EXCHANGE_LOGIN").context("не задана переменная EXCHANGE_LOGIN")?;
        let exchange_password =
            env::var("EXCHANGE_PASSWORD").context("не задана переменная EXCHANGE_PASSWORD")?;

        let exchange_dir = PathBuf::from(
            env::var("EXCHANGE_DIR").unwrap_or_else(|_| "exchange".to_string()),
        );
        let exchange_file_limit = match env::var("EXCHANGE_FILE_LIMIT") {
            Ok(v) => v
                .parse::<u64>()
                .context("EXCHANGE_FILE_LIMIT: ожидается число байт")?,
            Err(_) => DEFAULT_FILE_LIMIT,
        };
        let exchange_session_ttl_secs = match env::var("EXCHANGE_SESSION_TTL_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .context("EXCHANGE_SESSION_TTL_SECS: ожидается число секунд")?,
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        let marketplace_sync_url = env::var("MARKETPLACE_SYNC_URL")
            .unwrap_or_else(|_| "https://www.farpost.ru/good/packet/api/sync".to_string());
        let site_base_url = env::var("SITE_BASE_URL").unwrap_or_default();

        let enrichment_tables_path = env::var("ENRICHMENT_TABLES_PATH").ok().map(PathBuf::from);

        Ok(AppConfig {
            database_path,
            bind_addr,
            api_key,
            secret_key,
            exchange_login,
            exchange_password,
            exchange_dir,
            exchange_file_limit,
            exchange_session_ttl_secs,
            marketplace_sync_url,
            site_base_url,
            enrichment_tables_path,
        })
    }
}
