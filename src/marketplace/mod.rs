// ==========================================
// Каталог автозапчастей - выгрузка на маркетплейс
// ==========================================
// Формирование файла в трёх форматах и авторизованная
// отправка multipart/form-data с масштабируемым таймаутом.
// ==========================================

pub mod client;
pub mod export;
pub mod settings;

pub use client::{
    auth_hash, sync_timeout, MarketplaceClient, MarketplaceSync, SyncReport, SOFT_SIZE_LIMIT,
};
pub use export::{render, ExportContext, ExportFile, ExportFormat};
pub use settings::{sign_password, unsign_password};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("нет активной записи настроек маркетплейса")]
    NoSettings,

    #[error("подпись сохранённых учётных данных недействительна")]
    BadCredentialSignature,

    #[error("ошибка формирования файла выгрузки: {0}")]
    Render(String),

    #[error("ошибка HTTP при отправке: {0}")]
    Http(String),

    #[error(transparent)]
    Repository(#[from] crate::repository::RepositoryError),
}
