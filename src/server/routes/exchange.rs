// ==========================================
// Каталог автозапчастей - endpoint протокола обмена
// ==========================================
// Один путь, четыре режима по параметру mode:
//   checkauth - HTTP Basic, выпуск cookie сеанса
//   init      - параметры обмена: zip=..., file_limit=...
//   file      - приём файла (POST, дозапись в каталог приёма)
//   import    - импорт принятого файла конвейером
// Ответы - plain text; успех/отказ кодируется первым словом
// тела (success | failure | progress), как того требует
// legacy-клиент. HTTP-статус 200 даже при failure-теле;
// 4xx/5xx остаются за транспортными отказами.
// ==========================================

use crate::domain::types::{CatalogType, OperationType, SyncStatus};
use crate::domain::NewSyncLog;
use crate::exchange::SESSION_COOKIE_NAME;
use crate::importer::ImportRequest;
use crate::reconcile::ReconcileOptions;
use crate::server::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct ExchangeParams {
    #[serde(rename = "type")]
    pub exchange_type: Option<String>,
    pub mode: Option<String>,
    pub filename: Option<String>,
}

/// Обработчик протокола обмена (GET и POST на одном пути).
pub async fn exchange(
    State(state): State<AppState>,
    Query(params): Query<ExchangeParams>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let exchange_type = params.exchange_type.as_deref().unwrap_or("");
    if exchange_type != "catalog" {
        warn!(exchange_type, "неподдерживаемый тип обмена");
        return plain(
            StatusCode::BAD_REQUEST,
            "failure\nНеподдерживаемый тип обмена",
        );
    }

    let mode = params.mode.as_deref().unwrap_or("");
    info!(mode, filename = params.filename.as_deref().unwrap_or("-"), "запрос обмена");

    match mode {
        "checkauth" => handle_checkauth(&state, &headers).await,
        "init" => handle_init(&state, &headers),
        "file" => handle_file(&state, &headers, &method, params.filename.as_deref(), &body),
        "import" => handle_import(&state, &headers, params.filename.as_deref()).await,
        _ => plain(StatusCode::BAD_REQUEST, "failure\nНеизвестный режим обмена"),
    }
}

// ==========================================
// Режим A: checkauth
// ==========================================
// Три строки ответа: success, имя cookie, значение cookie.
async fn handle_checkauth(state: &AppState, headers: &HeaderMap) -> Response {
    if !check_basic_auth(state, headers) {
        warn!("отказ авторизации в checkauth");
        let mut log = NewSyncLog::new(OperationType::ExchangeSession, SyncStatus::Unauthorized);
        log.message = "отказ авторизации в checkauth".to_string();
        log.request_ip = client_ip(headers);
        if let Err(e) = state.sync_logs.insert(log) {
            warn!(error = %e, "не удалось записать журнал");
        }
        return plain(StatusCode::OK, "failure\nОшибка авторизации");
    }

    let token = state.sessions.mint();
    info!("сеанс обмена открыт");

    let body = format!("success\n{SESSION_COOKIE_NAME}\n{token}");
    let cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Max-Age={}; Path=/",
        state.config.exchange_session_ttl_secs
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::SET_COOKIE, cookie),
        ],
        body,
    )
        .into_response()
}

// ==========================================
// Режим B: init
// ==========================================
// Две строки: zip=yes|no и file_limit=<байты>.
fn handle_init(state: &AppState, headers: &HeaderMap) -> Response {
    if !check_session(state, headers) {
        return plain(StatusCode::OK, "failure\nСессия недействительна");
    }
    let body = format!("zip=yes\nfile_limit={}", state.config.exchange_file_limit);
    plain(StatusCode::OK, &body)
}

// ==========================================
// Режим C: file
// ==========================================
fn handle_file(
    state: &AppState,
    headers: &HeaderMap,
    method: &Method,
    filename: Option<&str>,
    body: &Bytes,
) -> Response {
    if !check_session(state, headers) {
        return plain(StatusCode::OK, "failure\nСессия недействительна");
    }
    if method != Method::POST {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "failure\nТребуется POST запрос");
    }
    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return plain(StatusCode::BAD_REQUEST, "failure\nНе указано имя файла"),
    };
    if let Err(reason) = crate::exchange::StagingArea::validate_filename(filename) {
        warn!(filename, reason, "отклонено имя файла");
        return plain(StatusCode::BAD_REQUEST, &format!("failure\n{reason}"));
    }
    if body.len() as u64 > state.config.exchange_file_limit {
        warn!(
            filename,
            size = body.len(),
            limit = state.config.exchange_file_limit,
            "файл превышает лимит"
        );
        return plain(
            StatusCode::PAYLOAD_TOO_LARGE,
            "failure\nФайл превышает лимит размера",
        );
    }

    match state.staging.append(filename, body) {
        Ok(size) => {
            info!(filename, size, "файл обмена принят");
            // архивы распаковываются сразу: import придёт
            // по имени файла внутри архива
            if filename.to_lowercase().ends_with(".zip") {
                match state.staging.extract_zip_archive(filename) {
                    Ok(extracted) => {
                        info!(filename, count = extracted.len(), "архив распакован");
                    }
                    Err(e) => {
                        warn!(filename, error = %e, "не удалось распаковать архив");
                        return plain(
                            StatusCode::OK,
                            &format!("failure\nОшибка распаковки архива: {e}"),
                        );
                    }
                }
            }
            plain(StatusCode::OK, "success")
        }
        Err(e) => {
            warn!(filename, error = %e, "не удалось сохранить файл");
            plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("failure\nОшибка сохранения файла: {e}"),
            )
        }
    }
}

// ==========================================
// Режим D: import
// ==========================================
async fn handle_import(state: &AppState, headers: &HeaderMap, filename: Option<&str>) -> Response {
    if !check_session(state, headers) {
        return plain(StatusCode::OK, "failure\nСессия недействительна");
    }
    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return plain(StatusCode::BAD_REQUEST, "failure\nНе указано имя файла"),
    };
    if let Err(reason) = crate::exchange::StagingArea::validate_filename(filename) {
        return plain(StatusCode::BAD_REQUEST, &format!("failure\n{reason}"));
    }
    if !state.staging.exists(filename) {
        return plain(StatusCode::NOT_FOUND, "failure\nФайл не найден");
    }

    let mut request = ImportRequest::new(OperationType::ExchangeSession);
    request.options = ReconcileOptions {
        catalog_type: CatalogType::Retail,
        full_snapshot: false,
    };
    request.request_ip = client_ip(headers);
    request.filename = Some(filename.to_string());

    let path = state.staging.root().join(filename);
    match state.importer.import_staged_file(&path, &request) {
        Ok(report) => {
            if let Err(e) = state.staging.mark_processed(filename) {
                warn!(filename, error = %e, "не удалось записать маркер");
            }
            info!(
                filename,
                created = report.outcome.created,
                updated = report.outcome.updated,
                "импорт файла обмена завершён"
            );
            plain(StatusCode::OK, "success")
        }
        Err(e) => {
            warn!(filename, error = %e, "ошибка импорта файла обмена");
            plain(StatusCode::OK, &format!("failure\nОшибка обработки: {e}"))
        }
    }
}

// ==========================================
// Вспомогательные
// ==========================================

fn plain(status: StatusCode, body: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.to_string(),
    )
        .into_response()
}

/// Проверка HTTP Basic против учётки обмена.
fn check_basic_auth(state: &AppState, headers: &HeaderMap) -> bool {
    let value = match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) => value,
        None => return false,
    };
    let encoded = match value.strip_prefix("Basic ") {
        Some(encoded) => encoded.trim(),
        None => return false,
    };
    let decoded = match STANDARD.decode(encoded) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };
    let decoded = match String::from_utf8(decoded) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };
    match decoded.split_once(':') {
        Some((login, password)) => {
            login == state.config.exchange_login && password == state.config.exchange_password
        }
        None => false,
    }
}

/// Сеанс действителен, если cookie несёт живой токен.
fn check_session(state: &AppState, headers: &HeaderMap) -> bool {
    match session_token(headers) {
        Some(token) => state.sessions.validate(&token),
        None => false,
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE_NAME {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
}
