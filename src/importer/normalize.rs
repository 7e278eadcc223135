// ==========================================
// Каталог автозапчастей - нормализация значений
// ==========================================
// Локальные числовые форматы:
//   цена    "2 000,00"  - пробел/неразрывный пробел как
//            разделитель тысяч, запятая как десятичный
//   остаток "4 000" или "4,000" - целое, запятая только
//            как разделитель тысяч
// Нормализация идемпотентна: normalize(normalize(x)) == normalize(x).
// ==========================================

use rust_decimal::Decimal;
use std::str::FromStr;

/// Пробельные символы-разделители тысяч.
const THOUSANDS_SPACES: [char; 4] = [' ', '\u{00A0}', '\u{202F}', '\u{2009}'];

/// TRIM строки; пустая строка и "none"/"null" считаются отсутствием значения.
pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_lowercase().as_str() {
        "none" | "null" => None,
        _ => Some(trimmed.to_string()),
    }
}

/// Разбор денежного значения в локальном формате.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let mut cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !THOUSANDS_SPACES.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned = cleaned.replace(',', ".");
    Decimal::from_str(&cleaned).ok()
}

/// Разбор остатка: целое число, запятая и пробелы - разделители тысяч.
pub fn parse_quantity(value: &str) -> Option<i64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !THOUSANDS_SPACES.contains(c) && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    // Excel отдаёт остатки как float ("4.0")
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.trunc() as i64))
}

/// Булев флаг из распространённых словесных форм.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "да" | "y" => Some(true),
        "0" | "false" | "no" | "нет" | "n" | "" => Some(false),
        _ => None,
    }
}

/// Классификация значения колонки "размер": вольтаж, материал или размер.
///
/// Возвращает (название характеристики, значение).
pub fn classify_size_value(value: &str) -> (&'static str, String) {
    let trimmed = value.trim();
    let upper = trimmed.to_uppercase();
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
    if upper.contains('V') && has_digit {
        return ("Напряжение", trimmed.to_string());
    }
    if matches!(
        upper.as_str(),
        "IRIDIUM" | "PLATINUM" | "COPPER" | "ИРИДИЙ" | "ПЛАТИНА" | "МЕДЬ"
    ) {
        return ("Материал", trimmed.to_string());
    }
    ("Размер", trimmed.to_string())
}

/// Похоже ли 6-значное число на дату YYYYMM.
///
/// Отсекает кандидатов в артикулы вида "202512": год 20xx
/// и месяц 01-12.
pub fn looks_like_yyyymm(candidate: &str) -> bool {
    if candidate.len() != 6 || !candidate.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !candidate.starts_with("20") {
        return false;
    }
    let month: u32 = match candidate[4..6].parse() {
        Ok(m) => m,
        Err(_) => return false,
    };
    (1..=12).contains(&month)
}
