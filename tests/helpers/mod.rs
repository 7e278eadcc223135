// ==========================================
// Вспомогательные функции интеграционных тестов
// ==========================================
#![allow(dead_code)]

use autoparts_sync::config::AppConfig;
use autoparts_sync::AppState;
use std::path::PathBuf;

pub const EXCHANGE_LOGIN: &str = "exchange";
pub const EXCHANGE_PASSWORD: &str = "exchange-password";
pub const API_KEY: &str = "test-api-key";

/// Конфигурация поверх временного каталога.
pub fn test_config(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        database_path: dir
            .join("test.db")
            .to_str()
            .expect("путь к базе")
            .to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        api_key: API_KEY.to_string(),
        secret_key: "test-secret-key".to_string(),
        exchange_login: EXCHANGE_LOGIN.to_string(),
        exchange_password: EXCHANGE_PASSWORD.to_string(),
        exchange_dir: dir.join("exchange"),
        exchange_file_limit: 104_857_600,
        exchange_session_ttl_secs: 3_600,
        marketplace_sync_url: "https://localhost/api/sync".to_string(),
        site_base_url: "https://parts.example.ru".to_string(),
        enrichment_tables_path: None,
    }
}

/// Состояние приложения поверх временного каталога.
pub fn build_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().expect("временный каталог");
    let state = AppState::initialize(test_config(dir.path())).expect("инициализация состояния");
    (dir, state)
}

/// Состояние с нестандартной конфигурацией.
pub fn build_state_with(
    mutate: impl FnOnce(&mut AppConfig),
) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().expect("временный каталог");
    let mut config = test_config(dir.path());
    mutate(&mut config);
    let state = AppState::initialize(config).expect("инициализация состояния");
    (dir, state)
}

#[allow(dead_code)]
pub fn staged_path(dir: &tempfile::TempDir, filename: &str) -> PathBuf {
    dir.path().join("exchange").join(filename)
}
