// ==========================================
// Каталог автозапчастей - запуск выгрузки на маркетплейс
// ==========================================
// POST /api/marketplace/sync?format=csv|xls|xml
// Авторизация та же, что у входящего API. Выгружаются
// активные товары розничного каталога; итог фиксируется
// в журнале и на записи настроек.
// ==========================================

use crate::domain::types::CatalogType;
use crate::marketplace::{self, ExportContext, ExportFormat, SyncError};
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct MarketplaceSyncParams {
    /// Формат файла: csv, xls или xml (по умолчанию xls).
    pub format: Option<String>,
}

pub async fn sync(
    State(state): State<AppState>,
    Query(params): Query<MarketplaceSyncParams>,
    headers: HeaderMap,
) -> Response {
    if !check_api_key(&state, &headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "неверный API ключ"})),
        )
            .into_response();
    }

    let format = match params.format.as_deref() {
        None => ExportFormat::Xls,
        Some(value) => match ExportFormat::parse(value) {
            Some(format) => format,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": format!("неизвестный формат выгрузки: {value}"),
                    })),
                )
                    .into_response()
            }
        },
    };

    let products = match state.products.list_active(CatalogType::Retail) {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "не удалось прочитать товары");
            return internal_error(&e.to_string());
        }
    };
    if products.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "нет активных товаров для выгрузки"})),
        )
            .into_response();
    }

    let category_names: HashMap<i64, String> = match state.categories.list_all() {
        Ok(categories) => categories.into_iter().map(|c| (c.id, c.name)).collect(),
        Err(e) => return internal_error(&e.to_string()),
    };
    let context = ExportContext {
        category_names,
        site_base_url: state.config.site_base_url.clone(),
    };

    let file = match marketplace::render(&products, format, &context) {
        Ok(file) => file,
        Err(e) => return internal_error(&e.to_string()),
    };
    let size = file.content.len();

    match state.marketplace.sync_file(file, products.len()).await {
        Ok(report) => {
            let status = if report.success {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                Json(json!({
                    "success": report.success,
                    "message": report.message,
                    "products": products.len(),
                    "file_size": size,
                    "oversize_warning": report.oversize_warning,
                    "status_code": report.status_code,
                })),
            )
                .into_response()
        }
        Err(SyncError::NoSettings) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "нет активной записи настроек маркетплейса",
            })),
        )
            .into_response(),
        Err(e) => internal_error(&e.to_string()),
    }
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"success": false, "error": message})),
    )
        .into_response()
}

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
