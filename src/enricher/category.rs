// ==========================================
// Каталог автозапчастей - определение категории
// ==========================================
// Подстрочный поиск без учёта регистра по таблицам
// обогащения. Сначала подкатегория (более точное правило),
// затем корневая категория, затем категория по умолчанию.
// ==========================================

use crate::enricher::tables::EnrichmentTables;

/// Результат определения: корень и, возможно, подкатегория.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub root: String,
    pub subcategory: Option<String>,
}

/// Корневая категория по ключевым словам; первое совпадение выигрывает.
pub fn detect_root(text: &str, tables: &EnrichmentTables) -> Option<String> {
    let lower = text.to_lowercase();
    for rule in &tables.categories {
        for keyword in &rule.keywords {
            if lower.contains(&keyword.to_lowercase()) {
                return Some(rule.name.clone());
            }
        }
    }
    None
}

/// Подкатегория по ключевым словам; первое совпадение выигрывает.
pub fn detect_subcategory(text: &str, tables: &EnrichmentTables) -> Option<(String, String)> {
    let lower = text.to_lowercase();
    for rule in &tables.subcategories {
        if lower.contains(&rule.keyword.to_lowercase()) {
            return Some((rule.root.clone(), rule.name.clone()));
        }
    }
    None
}

/// Полное определение категории для товара.
///
/// Если ни одно слово не совпало, возвращается категория по умолчанию
/// без подкатегории.
pub fn detect(text: &str, tables: &EnrichmentTables) -> CategoryMatch {
    if let Some((root, sub)) = detect_subcategory(text, tables) {
        return CategoryMatch {
            root,
            subcategory: Some(sub),
        };
    }
    if let Some(root) = detect_root(text, tables) {
        return CategoryMatch {
            root,
            subcategory: None,
        };
    }
    CategoryMatch {
        root: tables.default_category.clone(),
        subcategory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> EnrichmentTables {
        EnrichmentTables::load_default().unwrap()
    }

    #[test]
    fn test_detect_suspension() {
        let m = detect("Амортизатор DAIHATSU 332120", &tables());
        assert_eq!(m.root, "Детали подвески");
        assert_eq!(m.subcategory.as_deref(), Some("Амортизаторы"));
    }

    #[test]
    fn test_detect_glow_plug_before_generic_plug() {
        let m = detect("Свеча накала 24V", &tables());
        assert_eq!(m.subcategory.as_deref(), Some("Свечи накала"));

        let m = detect("Свеча NGK BKR6E", &tables());
        assert_eq!(m.subcategory.as_deref(), Some("Свечи зажигания"));
    }

    #[test]
    fn test_detect_default_category() {
        let m = detect("Непонятная запчасть X100", &tables());
        assert_eq!(m.root, tables().default_category);
        assert!(m.subcategory.is_none());
    }

    #[test]
    fn test_detect_case_insensitive() {
        let m = detect("СТАРТЕР ISUZU", &tables());
        assert_eq!(m.root, "Автоэлектрика");
        assert_eq!(m.subcategory.as_deref(), Some("Стартеры"));
    }
}
