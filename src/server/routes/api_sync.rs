// ==========================================
// Каталог автозапчастей - входящий API синхронизации
// ==========================================
// POST с телом JSON или XML. Авторизация: X-API-Key или
// Authorization: Bearer против настроенного секрета.
// Ответ JSON: {success, total, updated, created, hidden,
// errors_count, errors[<=10]}; 200 - полный успех,
// 207 - частичный, 400 - ошибка разбора/валидации,
// 401 - отказ авторизации, 500 - внутренняя ошибка.
// ==========================================

use crate::domain::types::{CatalogType, OperationType, SyncStatus};
use crate::domain::{NewSyncLog, MAX_REPORTED_ERRORS};
use crate::importer::{ImportError, ImportRequest};
use crate::reconcile::ReconcileOptions;
use crate::server::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct ApiSyncParams {
    /// Полная выгрузка: отсутствующие external_id скрываются.
    #[serde(default)]
    pub full_snapshot: Option<String>,
    /// Целевой каталог: retail (по умолчанию) или wholesale.
    #[serde(default)]
    pub catalog: Option<String>,
}

/// POST /api/sync/products
pub async fn import(
    State(state): State<AppState>,
    Query(params): Query<ApiSyncParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !check_api_key(&state, &headers) {
        let mut log = NewSyncLog::new(OperationType::ApiSync, SyncStatus::Unauthorized);
        log.message = "неверный API ключ".to_string();
        log.request_ip = client_ip(&headers);
        if let Err(e) = state.sync_logs.insert(log) {
            warn!(error = %e, "не удалось записать журнал");
        }
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "неверный API ключ"})),
        )
            .into_response();
    }

    let full_snapshot = params
        .full_snapshot
        .as_deref()
        .map(|v| matches!(v, "1" | "true" | "yes"))
        .unwrap_or(false);
    let catalog_type = params
        .catalog
        .as_deref()
        .and_then(CatalogType::parse)
        .unwrap_or(CatalogType::Retail);

    let mut request = ImportRequest::new(OperationType::ApiSync);
    request.options = ReconcileOptions {
        catalog_type,
        full_snapshot,
    };
    request.request_ip = client_ip(&headers);
    request.filename = filename_hint(&headers);

    match state.importer.import_bytes(&body, &request) {
        Ok(report) => {
            let status_code = match report.status {
                SyncStatus::Success => StatusCode::OK,
                SyncStatus::Partial => StatusCode::MULTI_STATUS,
                _ => StatusCode::BAD_REQUEST,
            };
            let errors: Vec<serde_json::Value> = report
                .outcome
                .errors
                .iter()
                .take(MAX_REPORTED_ERRORS)
                .map(|e| json!({"identifier": e.identifier, "message": e.message}))
                .collect();
            (
                status_code,
                Json(json!({
                    "success": report.status == SyncStatus::Success,
                    "total": report.outcome.total,
                    "updated": report.outcome.updated,
                    "created": report.outcome.created,
                    "hidden": report.outcome.hidden,
                    "errors_count": report.outcome.errors.len(),
                    "errors": errors,
                })),
            )
                .into_response()
        }
        Err(e) => {
            let status_code = match &e {
                ImportError::Repository(_) | ImportError::InternalError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            };
            (
                status_code,
                Json(json!({"success": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Ключ из X-API-Key либо Authorization: Bearer.
fn check_api_key(state: &AppState, headers: &HeaderMap) -> bool {
    let supplied = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|v| v.trim().to_string())
        });
    match supplied {
        Some(key) if !key.is_empty() => key == state.config.api_key,
        _ => false,
    }
}

/// Подсказка формата: XML выдаёт себя content-type'ом,
/// остальное разбирается по сигнатуре тела.
fn filename_hint(headers: &HeaderMap) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())?
        .to_lowercase();
    if content_type.contains("xml") {
        Some("body.xml".to_string())
    } else if content_type.contains("json") {
        Some("body.json".to_string())
    } else {
        None
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}
