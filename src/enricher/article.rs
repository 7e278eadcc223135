// ==========================================
// Каталог автозапчастей - извлечение артикула
// ==========================================
// Упорядоченный каскад шаблонов; поиск останавливается на
// первом кандидате, который не является известным брендом
// и не похож на дату YYYYMM.
//
// Примеры форматов:
//   23300-78090     (пять-пять)
//   ME220745        (две буквы + шесть цифр)
//   1-13200-469-0   (цифра-пять-три-цифра)
//   332120          (шесть цифр)
//   48510-B1020     (общий буквенно-цифровой)
// ==========================================

use crate::enricher::tables::EnrichmentTables;
use crate::importer::normalize::looks_like_yyyymm;
use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(\d{5}-\d{5})\b",
        r"\b([A-Z]{2}\d{6})\b",
        r"\b(\d-\d{5}-\d{3}-\d)\b",
        r"\b(\d{6})\b",
        r"\b([A-Z0-9][A-Z0-9\-]{4,18}[A-Z0-9])\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("некорректный шаблон артикула"))
    .collect()
});

/// Извлечь артикул из текста наименования.
pub fn extract_article(text: &str, tables: &EnrichmentTables) -> Option<String> {
    for pattern in ARTICLE_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let candidate = captures.get(1)?.as_str().to_uppercase();
            if accept_candidate(&candidate, tables) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Проверка кандидата: не бренд, не дата, содержит цифры.
pub fn accept_candidate(candidate: &str, tables: &EnrichmentTables) -> bool {
    if tables.is_known_brand(candidate) {
        return false;
    }
    if looks_like_yyyymm(candidate) {
        return false;
    }
    // артикул без единой цифры - это слово, а не номер
    candidate.chars().any(|c| c.is_ascii_digit())
}
