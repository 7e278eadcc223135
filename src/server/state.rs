// ==========================================
// Каталог автозапчастей - состояние приложения
// ==========================================
// Все обработчики делят одно состояние: конфигурация,
// репозитории поверх общего соединения, кеш сессий обмена,
// каталог приёма и конвейер импорта.
// ==========================================

use crate::config::AppConfig;
use crate::db;
use crate::enricher::EnrichmentTables;
use crate::exchange::{SessionCache, StagingArea};
use crate::importer::ProductImporter;
use crate::marketplace::{MarketplaceClient, MarketplaceSync};
use crate::reconcile::ReconcileEngine;
use crate::repository::{
    CategoryRepository, ProductRepository, SettingsRepository, SyncLogRepository,
};
use anyhow::{Context, Result};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

pub struct AppStateInner {
    pub config: AppConfig,
    pub products: ProductRepository,
    pub categories: CategoryRepository,
    pub sync_logs: SyncLogRepository,
    pub settings: SettingsRepository,
    pub importer: ProductImporter,
    pub marketplace: MarketplaceSync,
    pub sessions: SessionCache,
    pub staging: StagingArea,
    pub tables: Arc<EnrichmentTables>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    /// Сборка состояния: соединение, схема, справочник корневых
    /// категорий, конвейер.
    pub fn initialize(config: AppConfig) -> Result<Self> {
        let shared = db::open_shared_connection(&config.database_path)
            .with_context(|| format!("не удалось открыть базу {}", config.database_path))?;
        {
            let conn = shared
                .lock()
                .map_err(|e| anyhow::anyhow!("соединение недоступно: {e}"))?;
            db::init_schema(&conn).context("не удалось создать схему")?;
        }

        let tables = Arc::new(
            EnrichmentTables::load(config.enrichment_tables_path.as_deref())
                .context("не удалось загрузить таблицы обогащения")?,
        );

        let categories = CategoryRepository::from_connection(shared.clone());
        categories
            .ensure_roots(&tables.root_seed())
            .context("не удалось посеять корневые категории")?;

        let products = ProductRepository::from_connection(shared.clone());
        let sync_logs = SyncLogRepository::from_connection(shared.clone());
        let settings = SettingsRepository::from_connection(shared.clone());

        let engine = ReconcileEngine::new(
            ProductRepository::from_connection(shared.clone()),
            CategoryRepository::from_connection(shared.clone()),
            tables.clone(),
        );
        let importer = ProductImporter::new(
            engine,
            SyncLogRepository::from_connection(shared.clone()),
        );

        let marketplace = MarketplaceSync::new(
            MarketplaceClient::new(config.marketplace_sync_url.clone()),
            SettingsRepository::from_connection(shared.clone()),
            SyncLogRepository::from_connection(shared.clone()),
            config.secret_key.clone(),
        );

        let sessions = SessionCache::new(Duration::from_secs(config.exchange_session_ttl_secs));
        let staging = StagingArea::new(config.exchange_dir.clone())
            .map_err(|e| anyhow::anyhow!("каталог приёма недоступен: {e}"))?;

        Ok(AppState {
            inner: Arc::new(AppStateInner {
                config,
                products,
                categories,
                sync_logs,
                settings,
                importer,
                marketplace,
                sessions,
                staging,
                tables,
            }),
        })
    }
}
