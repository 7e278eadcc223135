// ==========================================
// Каталог автозапчастей - определение бренда
// ==========================================
// Поиск по списку известных брендов: целое слово,
// без учёта регистра. Более длинные бренды проверяются
// первыми: TOYO и TOYOTA - разные производители,
// и в строке "TOYOTA" должен находиться TOYOTA,
// а не TOYO.
// ==========================================

use crate::enricher::tables::EnrichmentTables;

/// Определить бренд по тексту наименования.
///
/// Возвращает каноническое написание из списка брендов.
pub fn detect_brand(text: &str, tables: &EnrichmentTables) -> Option<String> {
    let upper = text.to_uppercase();

    let mut brands: Vec<&String> = tables.brands.iter().collect();
    brands.sort_by_key(|b| std::cmp::Reverse(b.len()));

    for brand in brands {
        if contains_whole_word(&upper, &brand.to_uppercase()) {
            return Some(brand.clone());
        }
    }
    None
}

/// Вхождение целым словом: слева и справа не буква/цифра.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();

        let left_ok = haystack[..begin]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let right_ok = haystack[end..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);

        if left_ok && right_ok {
            return true;
        }
        // продолжаем поиск со следующего символа после начала вхождения
        start = begin + needle.chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        if start >= haystack.len() {
            break;
        }
    }
    false
}
