// ==========================================
// Каталог автозапчастей - библиотека
// ==========================================
// Конвейер импорта и синхронизации товаров:
// разбор прайс-листов и выгрузок учётной системы,
// нормализация и обогащение, сверка с хранилищем,
// выгрузка на маркетплейс.
// ==========================================

// Доменный слой - сущности и типы
pub mod domain;

// Слой хранения - доступ к данным
pub mod repository;

// Импорт - парсеры, маппинг, конвейер
pub mod importer;

// Обогащение - вывод атрибутов из наименований
pub mod enricher;

// Сверка - upsert-семантика и мягкое скрытие
pub mod reconcile;

// Протокол обмена - сессии и каталог приёма
pub mod exchange;

// Выгрузка на маркетплейс
pub mod marketplace;

// HTTP сервер
pub mod server;

// Инфраструктура
pub mod config;
pub mod db;
pub mod logging;

// ==========================================
// Реэкспорт основных типов
// ==========================================

pub use config::AppConfig;
pub use domain::{
    Availability, CatalogType, Category, Condition, OperationType, Product, RawProductRecord,
    SyncLog, SyncStatus,
};
pub use enricher::EnrichmentTables;
pub use importer::{ImportError, ImportRequest, ProductImporter, SourceFormat};
pub use reconcile::{BatchOutcome, ReconcileEngine, ReconcileOptions};
pub use server::AppState;

// Версия системы
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Название системы
pub const APP_NAME: &str = "Каталог автозапчастей";
