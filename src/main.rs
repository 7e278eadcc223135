// ==========================================
// Каталог автозапчастей - HTTP сервер
// ==========================================

use anyhow::Context;
use autoparts_sync::{config::AppConfig, logging, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - конвейер импорта и синхронизации", autoparts_sync::APP_NAME);
    tracing::info!("версия: {}", autoparts_sync::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("ошибка конфигурации")?;
    tracing::info!(database = %config.database_path, "используется база данных");
    tracing::info!(staging = %config.exchange_dir.display(), "каталог приёма файлов");

    let bind_addr = config.bind_addr.clone();
    let state = AppState::initialize(config).context("не удалось инициализировать состояние")?;
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("не удалось открыть порт {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "сервер запущен");

    axum::serve(listener, app).await.context("ошибка сервера")?;
    Ok(())
}
