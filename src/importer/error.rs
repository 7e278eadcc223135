// ==========================================
// Каталог автозапчастей - ошибки импорта
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== Файлы =====
    #[error("файл не найден: {0}")]
    FileNotFound(String),

    #[error("формат файла не поддерживается: {0} (ожидается .csv/.xls/.xlsx/.xml/.json)")]
    UnsupportedFormat(String),

    #[error("не удалось прочитать файл: {0}")]
    FileReadError(String),

    // ===== Разбор =====
    #[error("ошибка разбора CSV: {0}")]
    CsvParseError(String),

    #[error("ошибка разбора Excel: {0}")]
    ExcelParseError(String),

    #[error("ошибка разбора XML: {0}")]
    XmlParseError(String),

    #[error("ошибка разбора JSON: {0}")]
    JsonParseError(String),

    #[error("файл не содержит данных")]
    EmptySource,

    // ===== Маппинг и значения =====
    #[error("ошибка преобразования значения (строка {row}, поле {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== Хранилище =====
    #[error(transparent)]
    Repository(#[from] crate::repository::RepositoryError),

    // ===== Общие =====
    #[error("внутренняя ошибка импорта: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

/// Result слоя импорта.
pub type ImportResult<T> = Result<T, ImportError>;
