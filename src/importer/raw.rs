// ==========================================
// Каталог автозапчастей - сырые строки источников
// ==========================================
// Все парсеры отдают единый поток слабо типизированных строк.
// Исходные имена колонок сохраняются как есть; числовая
// форма значения хранится параллельно строковой, когда
// приведение однозначно (нативные ячейки Excel).
// ==========================================

use serde::{Deserialize, Serialize};

/// Значение ячейки: исходный текст + необязательная числовая форма.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawValue {
    pub text: String,
    pub number: Option<f64>,
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue {
            text: value.into(),
            number: None,
        }
    }

    pub fn number(value: f64) -> Self {
        // Целые числа печатаются без дробной части: остатки и
        // артикулы из Excel не должны превращаться в "5.0"
        let text = if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{value}")
        };
        RawValue {
            text,
            number: Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.number.is_none()
    }
}

/// Строка источника: упорядоченные пары (имя колонки, значение).
/// Порядок колонок важен: при конфликте маппинга выигрывает
/// первая непустая колонка.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub cells: Vec<(String, RawValue)>,
    /// Номер строки исходного файла (1-based, для сообщений об ошибках).
    pub row_number: usize,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        RawRow {
            cells: Vec::new(),
            row_number,
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: RawValue) {
        self.cells.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_empty())
    }
}

/// Таблица до обнаружения заголовка: позиционные ячейки.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Vec<RawValue>>,
}

impl Table {
    /// Сборка строк по найденному заголовку.
    ///
    /// `header_index` - номер строки заголовка (0-based); строки выше
    /// отбрасываются, ниже - данные. Полностью пустые строки пропускаются.
    pub fn into_rows(self, header_index: usize, headers: &[String]) -> Vec<RawRow> {
        let mut rows = Vec::new();
        for (offset, cells) in self.rows.into_iter().enumerate().skip(header_index + 1) {
            let mut row = RawRow::new(offset + 1);
            for (col, value) in cells.into_iter().enumerate() {
                if let Some(header) = headers.get(col) {
                    if !header.trim().is_empty() {
                        row.push(header.trim(), value);
                    }
                }
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }
        rows
    }
}

/// Распознанный формат источника.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Xls,
    Xml,
    CommerceMl,
    Json,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Xlsx => "XLSX",
            SourceFormat::Xls => "XLS",
            SourceFormat::Xml => "XML",
            SourceFormat::CommerceMl => "CommerceML",
            SourceFormat::Json => "JSON",
        }
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, SourceFormat::Csv | SourceFormat::Xlsx | SourceFormat::Xls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_number_formatting() {
        assert_eq!(RawValue::number(4000.0).text, "4000");
        assert_eq!(RawValue::number(2.5).text, "2.5");
    }

    #[test]
    fn test_table_into_rows_skips_preamble_and_empty() {
        let table = Table {
            rows: vec![
                vec![RawValue::text("Прайс-лист от 01.01.2025")],
                vec![RawValue::text("Артикул"), RawValue::text("Цена")],
                vec![RawValue::text("ME220745"), RawValue::number(1500.0)],
                vec![RawValue::text(""), RawValue::text("")],
                vec![RawValue::text("332120"), RawValue::number(2000.0)],
            ],
        };
        let headers = vec!["Артикул".to_string(), "Цена".to_string()];
        let rows = table.into_rows(1, &headers);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Артикул").unwrap().text, "ME220745");
        assert_eq!(rows[0].row_number, 3);
        assert_eq!(rows[1].row_number, 5);
    }
}
