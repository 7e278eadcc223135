// ==========================================
// Каталог автозапчастей - табличные парсеры
// ==========================================
// CSV  - точка с запятой; UTF-8 с BOM, затем cp1251,
//        затем UTF-8 с заменой битых байтов
// XLSX - потоковое чтение, ячейки сохраняют числовой тип
// XLS  - старый бинарный формат, тип ячейки различается
// Парсеры не выбрасывают нераспознанные колонки:
// маппинг - отдельный шаг.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::raw::{RawValue, Table};
use calamine::{Data, Reader, Xls, Xlsx};
use std::io::Cursor;

// ==========================================
// CSV
// ==========================================
pub struct CsvParser;

impl CsvParser {
    pub fn parse(&self, bytes: &[u8]) -> ImportResult<Table> {
        let text = decode_csv_bytes(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut table = Table::default();
        for record in reader.records() {
            let record = record?;
            let row: Vec<RawValue> = record
                .iter()
                .map(|field| RawValue::text(field.trim()))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }
}

/// Декодирование байтов CSV: UTF-8 (с BOM) -> cp1251 -> UTF-8 lossy.
pub fn decode_csv_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}

// ==========================================
// XLSX (современный формат)
// ==========================================
pub struct XlsxParser;

impl XlsxParser {
    pub fn parse(&self, bytes: &[u8]) -> ImportResult<Table> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook: Xlsx<_> = Xlsx::new(cursor)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
        read_first_sheet(&mut workbook)
    }
}

// ==========================================
// XLS (старый бинарный формат)
// ==========================================
pub struct XlsParser;

impl XlsParser {
    pub fn parse(&self, bytes: &[u8]) -> ImportResult<Table> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook: Xls<_> = Xls::new(cursor)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
        read_first_sheet(&mut workbook)
    }
}

fn read_first_sheet<RS, R>(workbook: &mut R) -> ImportResult<Table>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_names = workbook.sheet_names();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("в книге нет листов".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    let mut table = Table::default();
    for row in range.rows() {
        let cells: Vec<RawValue> = row.iter().map(cell_to_raw_value).collect();
        table.rows.push(cells);
    }
    Ok(table)
}

fn cell_to_raw_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::text(""),
        Data::Int(v) => RawValue::number(*v as f64),
        Data::Float(v) => RawValue::number(*v),
        Data::Bool(v) => RawValue::text(if *v { "1" } else { "0" }),
        Data::String(s) => RawValue::text(s.trim()),
        other => RawValue::text(other.to_string().trim()),
    }
}
