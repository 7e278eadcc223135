// ==========================================
// Каталог автозапчастей - конвейер импорта
// ==========================================
// Поток: байты источника -> парсер -> сырые строки ->
// поиск заголовка + маппер колонок -> нормализованные
// записи -> обогащение + сверка -> мутация хранилища ->
// запись в журнал синхронизации.
//
// Ошибка разбора фатальна для батча: в журнал пишется
// одна запись об ошибке, хранилище не мутируется.
// ==========================================

use crate::domain::types::{CatalogType, OperationType, SyncStatus};
use crate::domain::{NewSyncLog, RawProductRecord};
use crate::importer::commerceml::{CommerceMlDocument, CommerceMlParser, OfferUpdate};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{CsvParser, XlsParser, XlsxParser};
use crate::importer::json::JsonParser;
use crate::importer::raw::{RawRow, SourceFormat};
use crate::importer::xml::{is_commerceml, XmlParser};
use crate::importer::header;
use crate::reconcile::{BatchOutcome, ReconcileEngine, ReconcileOptions};
use crate::repository::SyncLogRepository;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Разобранное содержимое источника.
pub enum ParsedPayload {
    Records(Vec<RawProductRecord>),
    Offers(Vec<OfferUpdate>),
}

/// Итог одного импорта.
pub struct ImportReport {
    pub format: SourceFormat,
    pub outcome: BatchOutcome,
    pub status: SyncStatus,
    pub log_id: i64,
    pub processing_time: f64,
}

/// Параметры импорта.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub operation: OperationType,
    pub options: ReconcileOptions,
    pub request_ip: Option<String>,
    pub filename: Option<String>,
}

impl ImportRequest {
    pub fn new(operation: OperationType) -> Self {
        ImportRequest {
            operation,
            options: ReconcileOptions::default(),
            request_ip: None,
            filename: None,
        }
    }
}

pub struct ProductImporter {
    engine: ReconcileEngine,
    sync_logs: SyncLogRepository,
}

impl ProductImporter {
    pub fn new(engine: ReconcileEngine, sync_logs: SyncLogRepository) -> Self {
        Self { engine, sync_logs }
    }

    /// Определение формата: суффикс имени файла, затем сигнатура содержимого.
    pub fn detect_format(bytes: &[u8], filename_hint: Option<&str>) -> ImportResult<SourceFormat> {
        if let Some(name) = filename_hint {
            let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
            match ext.as_str() {
                "csv" => return Ok(SourceFormat::Csv),
                "xlsx" => return Ok(SourceFormat::Xlsx),
                "xls" => return Ok(SourceFormat::Xls),
                "json" => return Ok(SourceFormat::Json),
                "xml" => return Ok(Self::xml_flavor(bytes)),
                _ => {}
            }
        }

        // сигнатуры содержимого
        if bytes.starts_with(b"PK") {
            return Ok(SourceFormat::Xlsx);
        }
        if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            return Ok(SourceFormat::Xls);
        }
        let head: String = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).into_owned();
        let trimmed = head.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            return Ok(Self::xml_flavor(bytes));
        }
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Ok(SourceFormat::Json);
        }

        Err(ImportError::UnsupportedFormat(
            filename_hint.unwrap_or("без имени").to_string(),
        ))
    }

    fn xml_flavor(bytes: &[u8]) -> SourceFormat {
        let text = String::from_utf8_lossy(bytes);
        if is_commerceml(&text) {
            SourceFormat::CommerceMl
        } else {
            SourceFormat::Xml
        }
    }

    /// Разбор байтов источника в канонические записи.
    pub fn parse_payload(bytes: &[u8], format: SourceFormat) -> ImportResult<ParsedPayload> {
        let mapper = FieldMapper;

        let rows: Vec<RawRow> = match format {
            SourceFormat::Csv => tabular_rows(CsvParser.parse(bytes)?),
            SourceFormat::Xlsx => tabular_rows(XlsxParser.parse(bytes)?),
            SourceFormat::Xls => tabular_rows(XlsParser.parse(bytes)?),
            SourceFormat::Json => JsonParser.parse(bytes)?,
            SourceFormat::Xml => {
                let text = String::from_utf8_lossy(bytes);
                XmlParser.parse(&text)?
            }
            SourceFormat::CommerceMl => {
                let text = String::from_utf8_lossy(bytes);
                match CommerceMlParser.parse(&text)? {
                    CommerceMlDocument::Offers(offers) => {
                        return Ok(ParsedPayload::Offers(offers))
                    }
                    CommerceMlDocument::Catalog(rows) => rows,
                }
            }
        };

        let records = rows.into_iter().map(|row| mapper.map_row(row)).collect();
        Ok(ParsedPayload::Records(records))
    }

    /// Импорт содержимого источника с записью в журнал.
    #[instrument(skip(self, bytes), fields(filename = request.filename.as_deref().unwrap_or("-")))]
    pub fn import_bytes(&self, bytes: &[u8], request: &ImportRequest) -> ImportResult<ImportReport> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        info!(batch_id = %batch_id, size = bytes.len(), "начало импорта");

        let format = match Self::detect_format(bytes, request.filename.as_deref()) {
            Ok(format) => format,
            Err(e) => {
                self.log_failure(request, None, &e, started.elapsed().as_secs_f64())?;
                return Err(e);
            }
        };

        let payload = match Self::parse_payload(bytes, format) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(format = format.as_str(), error = %e, "ошибка разбора источника");
                self.log_failure(request, Some(format), &e, started.elapsed().as_secs_f64())?;
                return Err(e);
            }
        };

        let outcome = match payload {
            ParsedPayload::Records(records) => {
                if records.is_empty() {
                    let e = ImportError::EmptySource;
                    self.log_failure(request, Some(format), &e, started.elapsed().as_secs_f64())?;
                    return Err(e);
                }
                info!(
                    format = format.as_str(),
                    total = records.len(),
                    "начало сверки батча"
                );
                self.engine.reconcile_batch(records, &request.options)?
            }
            ParsedPayload::Offers(offers) => {
                info!(total = offers.len(), "применение файла предложений");
                self.engine.apply_offers(offers)?
            }
        };

        let processing_time = started.elapsed().as_secs_f64();
        let status = outcome.status();

        let mut log = NewSyncLog::new(request.operation, status);
        log.message = format!("Обработано {} товаров", outcome.total);
        log.processed_count = outcome.total as i64;
        log.created_count = outcome.created as i64;
        log.updated_count = outcome.updated as i64;
        log.hidden_count = outcome.hidden as i64;
        log.request_ip = request.request_ip.clone();
        log.request_format = Some(format.as_str().to_string());
        log.filename = request.filename.clone();
        log.processing_time = processing_time;
        let log = log.with_errors(outcome.errors.clone());
        let log_id = self.sync_logs.insert(log)?;

        info!(
            batch_id = %batch_id,
            format = format.as_str(),
            total = outcome.total,
            created = outcome.created,
            updated = outcome.updated,
            hidden = outcome.hidden,
            errors = outcome.errors.len(),
            elapsed_s = processing_time,
            "импорт завершён"
        );

        Ok(ImportReport {
            format,
            outcome,
            status,
            log_id,
            processing_time,
        })
    }

    /// Импорт файла из каталога приёма.
    pub fn import_staged_file(
        &self,
        path: &Path,
        request: &ImportRequest,
    ) -> ImportResult<ImportReport> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let mut request = request.clone();
        if request.filename.is_none() {
            request.filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_string());
        }
        self.import_bytes(&bytes, &request)
    }

    fn log_failure(
        &self,
        request: &ImportRequest,
        format: Option<SourceFormat>,
        error: &ImportError,
        processing_time: f64,
    ) -> ImportResult<()> {
        let mut log = NewSyncLog::new(request.operation, SyncStatus::Error);
        log.message = error.to_string();
        log.request_ip = request.request_ip.clone();
        log.request_format = format.map(|f| f.as_str().to_string());
        log.filename = request.filename.clone();
        log.processing_time = processing_time;
        self.sync_logs.insert(log)?;
        Ok(())
    }
}

fn tabular_rows(table: crate::importer::raw::Table) -> Vec<RawRow> {
    let info = header::discover(&table);
    table.into_rows(info.index, &info.headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::enricher::EnrichmentTables;
    use crate::repository::{CategoryRepository, ProductRepository};
    use std::sync::{Arc, Mutex};

    fn importer() -> (ProductImporter, ProductRepository) {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let tables = Arc::new(EnrichmentTables::load_default().unwrap());
        let categories = CategoryRepository::from_connection(shared.clone());
        categories.ensure_roots(&tables.root_seed()).unwrap();
        let engine = ReconcileEngine::new(
            ProductRepository::from_connection(shared.clone()),
            categories,
            tables,
        );
        let sync_logs = SyncLogRepository::from_connection(shared.clone());
        (
            ProductImporter::new(engine, sync_logs),
            ProductRepository::from_connection(shared),
        )
    }

    #[test]
    fn test_detect_format_by_extension_and_sniff() {
        assert_eq!(
            ProductImporter::detect_format(b"a;b", Some("price.csv")).unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            ProductImporter::detect_format(b"{\"a\":1}", None).unwrap(),
            SourceFormat::Json
        );
        assert_eq!(
            ProductImporter::detect_format(b"<catalog/>", None).unwrap(),
            SourceFormat::Xml
        );
        assert_eq!(
            ProductImporter::detect_format(b"PK\x03\x04", None).unwrap(),
            SourceFormat::Xlsx
        );
        assert!(ProductImporter::detect_format(b"plain text", None).is_err());
    }

    #[test]
    fn test_detect_commerceml_flavor() {
        let xml = br#"<root xmlns="http://v8.1c.ru/8.3/commerceml"><a/></root>"#;
        assert_eq!(
            ProductImporter::detect_format(xml, Some("import.xml")).unwrap(),
            SourceFormat::CommerceMl
        );
    }

    #[test]
    fn test_import_csv_locale_numerics() {
        let (importer, products) = importer();
        // цена "2 000,00", остаток "4 000" с неразрывным пробелом
        let csv = "Наименование;Цена;Остаток\nАмортизатор 332120;2 000,00;4\u{00A0}000\n";
        let mut request = ImportRequest::new(OperationType::FileUpload);
        request.filename = Some("price.csv".to_string());

        let report = importer.import_bytes(csv.as_bytes(), &request).unwrap();
        assert_eq!(report.outcome.created, 1);
        assert_eq!(report.status, SyncStatus::Success);

        let product = products
            .find_by_article("332120", CatalogType::Retail)
            .unwrap()
            .unwrap();
        assert_eq!(product.price.to_string(), "2000.00");
        assert_eq!(product.quantity, 4000);
        assert_eq!(
            product.availability,
            crate::domain::Availability::InStock
        );
    }

    #[test]
    fn test_import_json_api_shape() {
        let (importer, products) = importer();
        let json = r#"{"products": [
            {"external_id": "guid-1", "name": "Стартер MITSUBISHI ME220745",
             "price": 15000, "quantity": 2}
        ]}"#;
        let report = importer
            .import_bytes(json.as_bytes(), &ImportRequest::new(OperationType::ApiSync))
            .unwrap();
        assert_eq!(report.outcome.created, 1);
        assert!(products.find_by_external_id("guid-1").unwrap().is_some());
    }

    #[test]
    fn test_import_parse_error_logs_and_fails() {
        let (importer, products) = importer();
        let mut request = ImportRequest::new(OperationType::FileUpload);
        request.filename = Some("import.xml".to_string());

        let result = importer.import_bytes(b"<broken", &request);
        assert!(result.is_err());
        assert_eq!(products.count_all().unwrap(), 0);
    }

    #[test]
    fn test_import_csv_with_preamble_header_discovery() {
        let (importer, products) = importer();
        let csv = "ООО Запчасть-Сервис;;\nПрайс-лист;;\nАртикул;Наименование;Цена\nME220745;Стартер MITSUBISHI;15000\n";
        let mut request = ImportRequest::new(OperationType::FileUpload);
        request.filename = Some("price.csv".to_string());

        let report = importer.import_bytes(csv.as_bytes(), &request).unwrap();
        assert_eq!(report.outcome.created, 1);
        assert!(products
            .find_by_article("ME220745", CatalogType::Retail)
            .unwrap()
            .is_some());
    }
}
