// ==========================================
// Каталог автозапчастей - поиск строки заголовков
// ==========================================
// Прайс-листы часто начинаются с шапки документа.
// Заголовок ищется в первых 15 строках по плотности
// ключевых слов: первая строка с >= 2 совпадениями.
// Если не нашли - заголовком считается первая строка.
// ==========================================

use crate::importer::raw::{RawValue, Table};

/// Сколько строк сканируется в поисках заголовка.
pub const HEADER_SCAN_LIMIT: usize = 15;

/// Минимум ключевых слов в строке заголовка.
pub const HEADER_KEYWORD_THRESHOLD: usize = 2;

const HEADER_KEYWORDS: &[&str] = &[
    "артикул",
    "номенклатура",
    "наименование",
    "цена",
    "остаток",
    "склад",
    "розничная",
    "фарпост",
    "опт",
    "wholesale",
];

#[derive(Debug, Clone)]
pub struct HeaderInfo {
    /// Индекс строки заголовка (0-based).
    pub index: usize,
    /// Значения ячеек строки заголовка.
    pub headers: Vec<String>,
}

/// Поиск строки заголовков в таблице.
pub fn discover(table: &Table) -> HeaderInfo {
    for (index, row) in table.rows.iter().take(HEADER_SCAN_LIMIT).enumerate() {
        let keyword_count = row
            .iter()
            .filter(|cell| contains_keyword(&cell.text))
            .count();
        if keyword_count >= HEADER_KEYWORD_THRESHOLD {
            return HeaderInfo {
                index,
                headers: collect_headers(row),
            };
        }
    }

    HeaderInfo {
        index: 0,
        headers: table.rows.first().map(|r| collect_headers(r)).unwrap_or_default(),
    }
}

fn contains_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    HEADER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn collect_headers(row: &[RawValue]) -> Vec<String> {
    row.iter().map(|cell| cell.text.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::raw::RawValue;

    fn text_row(cells: &[&str]) -> Vec<RawValue> {
        cells.iter().map(|c| RawValue::text(*c)).collect()
    }

    #[test]
    fn test_discover_header_below_preamble() {
        let table = Table {
            rows: vec![
                text_row(&["ООО Запчасть-Сервис", ""]),
                text_row(&["Прайс-лист", "01.05.2025"]),
                text_row(&["Артикул", "Номенклатура", "Цена", "Остаток"]),
                text_row(&["ME220745", "Стартер", "15000", "2"]),
            ],
        };
        let info = discover(&table);
        assert_eq!(info.index, 2);
        assert_eq!(info.headers[0], "Артикул");
    }

    #[test]
    fn test_discover_single_keyword_not_enough() {
        let table = Table {
            rows: vec![
                text_row(&["Цена действует до конца месяца"]),
                text_row(&["Артикул", "Розничная Фарпост RUB"]),
            ],
        };
        // Первая строка содержит лишь одно ключевое слово ("цена"),
        // заголовком становится вторая
        let info = discover(&table);
        assert_eq!(info.index, 1);
    }

    #[test]
    fn test_discover_fallback_to_first_row() {
        let table = Table {
            rows: vec![
                text_row(&["sku", "title", "amount"]),
                text_row(&["ME220745", "Стартер", "2"]),
            ],
        };
        let info = discover(&table);
        assert_eq!(info.index, 0);
        assert_eq!(info.headers, vec!["sku", "title", "amount"]);
    }

    #[test]
    fn test_discover_exact_row_k() {
        // Инвариант: заголовок с >=2 ключевыми словами в строке k <= 15
        // выбирается ровно в строке k
        for k in 0..10 {
            let mut rows: Vec<Vec<RawValue>> =
                (0..k).map(|i| text_row(&[&format!("шапка {i}")])).collect();
            rows.push(text_row(&["Артикул", "Цена"]));
            rows.push(text_row(&["ME220745", "100"]));
            let info = discover(&Table { rows });
            assert_eq!(info.index, k);
        }
    }
}
