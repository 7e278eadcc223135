// ==========================================
// Каталог автозапчастей - клиент выгрузки
// ==========================================
// multipart/form-data POST на фиксированный адрес приёмника:
//   packetId - идентификатор пакет-объявления
//   auth     - sha512(логин + ":" + пароль), hex в нижнем регистре
//   data     - файл выгрузки
// Таймаут масштабируется от объёма: max(60, 30 + N/100) секунд.
// Файлы больше 5 MB не блокируются, но вызывают предупреждение
// с советом разбить выгрузку на пакеты.
// ==========================================

use crate::domain::types::{OperationType, SyncStatus};
use crate::domain::NewSyncLog;
use crate::marketplace::export::ExportFile;
use crate::marketplace::settings::unsign_password;
use crate::marketplace::SyncError;
use crate::repository::{MarketplaceSettings, SettingsRepository, SyncLogRepository};
use sha2::{Digest, Sha512};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Мягкий предел размера файла выгрузки: 5 MB.
pub const SOFT_SIZE_LIMIT: usize = 5 * 1024 * 1024;

/// Учётный хеш выгрузки: sha512(логин:пароль), hex в нижнем регистре.
pub fn auth_hash(login: &str, password: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(format!("{login}:{password}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Таймаут запроса по числу товаров: max(60, 30 + N/100) секунд.
pub fn sync_timeout(product_count: usize) -> Duration {
    let seconds = std::cmp::max(60, 30 + product_count / 100);
    Duration::from_secs(seconds as u64)
}

/// Итог попытки выгрузки.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub status_code: Option<u16>,
    /// Первые 500 байт ответа приёмника.
    pub response_excerpt: String,
    pub oversize_warning: bool,
}

pub struct MarketplaceClient {
    http: reqwest::Client,
    sync_url: String,
}

impl MarketplaceClient {
    pub fn new(sync_url: String) -> Self {
        MarketplaceClient {
            http: reqwest::Client::new(),
            sync_url,
        }
    }

    /// Отправка файла выгрузки.
    pub async fn upload(
        &self,
        file: ExportFile,
        settings: &MarketplaceSettings,
        secret_key: &str,
        product_count: usize,
    ) -> Result<SyncReport, SyncError> {
        let password = unsign_password(secret_key, &settings.password_signed)?;
        let auth = auth_hash(&settings.login, &password);
        let timeout = sync_timeout(product_count);

        let oversize_warning = file.content.len() > SOFT_SIZE_LIMIT;
        if oversize_warning {
            warn!(
                size = file.content.len(),
                limit = SOFT_SIZE_LIMIT,
                "файл выгрузки превышает мягкий предел; разбейте товары на пакеты"
            );
        }

        let part = reqwest::multipart::Part::bytes(file.content)
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| SyncError::Http(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("packetId", settings.packet_id.clone())
            .text("auth", auth)
            .part("data", part);

        info!(
            url = %self.sync_url,
            packet_id = %settings.packet_id,
            products = product_count,
            timeout_s = timeout.as_secs(),
            "отправка выгрузки"
        );

        let response = self
            .http
            .post(&self.sync_url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(500).collect();

        if status.as_u16() == 200 {
            Ok(SyncReport {
                success: true,
                message: "товары успешно синхронизированы".to_string(),
                status_code: Some(status.as_u16()),
                response_excerpt: excerpt,
                oversize_warning,
            })
        } else {
            Ok(SyncReport {
                success: false,
                message: format!("приёмник ответил статусом {}", status.as_u16()),
                status_code: Some(status.as_u16()),
                response_excerpt: excerpt,
                oversize_warning,
            })
        }
    }
}

/// Оркестратор выгрузки: статус на записи настроек и запись
/// в журнал фиксируются при любом исходе. Повторов нет.
pub struct MarketplaceSync {
    client: MarketplaceClient,
    settings_repo: SettingsRepository,
    sync_logs: SyncLogRepository,
    secret_key: String,
}

impl MarketplaceSync {
    pub fn new(
        client: MarketplaceClient,
        settings_repo: SettingsRepository,
        sync_logs: SyncLogRepository,
        secret_key: String,
    ) -> Self {
        MarketplaceSync {
            client,
            settings_repo,
            sync_logs,
            secret_key,
        }
    }

    pub async fn sync_file(
        &self,
        file: ExportFile,
        product_count: usize,
    ) -> Result<SyncReport, SyncError> {
        let settings = self
            .settings_repo
            .active()?
            .ok_or(SyncError::NoSettings)?;

        let started = Instant::now();
        let filename = file.filename.clone();
        let result = self
            .client
            .upload(file, &settings, &self.secret_key, product_count)
            .await;

        let (status, report_message) = match &result {
            Ok(report) if report.success => (SyncStatus::Success, report.message.clone()),
            Ok(report) => (
                SyncStatus::Error,
                format!("{} - {}", report.message, report.response_excerpt),
            ),
            Err(e) => (SyncStatus::Error, e.to_string()),
        };

        self.settings_repo.update_sync_status(
            settings.id,
            status.as_str(),
            if status == SyncStatus::Success {
                ""
            } else {
                report_message.as_str()
            },
        )?;

        let mut log = NewSyncLog::new(OperationType::ApiSync, status);
        log.message = report_message;
        log.processed_count = product_count as i64;
        log.filename = Some(filename);
        log.processing_time = started.elapsed().as_secs_f64();
        self.sync_logs.insert(log)?;

        result
    }
}
