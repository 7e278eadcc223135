// ==========================================
// Каталог автозапчастей - слой импорта
// ==========================================
// Парсеры форматов, поиск заголовков, маппинг колонок,
// нормализация значений и конвейер целиком.
// ==========================================

pub mod commerceml;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod header;
pub mod json;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod xml;

pub use commerceml::{CommerceMlDocument, CommerceMlParser, OfferUpdate};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{classify_column, CanonicalField, FieldMapper};
pub use file_parser::{CsvParser, XlsParser, XlsxParser};
pub use json::JsonParser;
pub use pipeline::{ImportReport, ImportRequest, ParsedPayload, ProductImporter};
pub use raw::{RawRow, RawValue, SourceFormat, Table};
pub use xml::XmlParser;
