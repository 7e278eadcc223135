// ==========================================
// Каталог автозапчастей - таблицы обогащения
// ==========================================
// Ключевые слова категорий, подкатегорий и список брендов -
// это данные, а не код: правила подбора меняются без
// перекомпиляции. Встроенный вариант грузится из
// data/enrichment.json, путь к внешнему файлу задаётся
// конфигурацией.
// ==========================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const EMBEDDED_TABLES: &str = include_str!("../../data/enrichment.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryRule {
    pub keyword: String,
    pub root: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentTables {
    /// Категория по умолчанию, когда ни одно слово не совпало.
    pub default_category: String,
    /// Корневые категории с ключевыми словами; порядок задаёт
    /// приоритет ("первое совпадение выигрывает").
    pub categories: Vec<CategoryRule>,
    /// Подкатегории; порядок важен: "свеча накала" должна
    /// проверяться раньше, чем "свеча".
    pub subcategories: Vec<SubcategoryRule>,
    pub brands: Vec<String>,
    /// Бренды с артикулами вида TT-124 / GUT-25.
    pub dash_article_brands: Vec<String>,
}

impl EnrichmentTables {
    /// Встроенные таблицы.
    pub fn load_default() -> Result<Self> {
        serde_json::from_str(EMBEDDED_TABLES).context("встроенный файл таблиц повреждён")
    }

    /// Таблицы из внешнего файла.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("не удалось прочитать {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("не удалось разобрать {}", path.display()))
    }

    /// Внешний файл, если задан, иначе встроенные таблицы.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }

    /// Пары (имя корня, ключевые слова через запятую) для посева справочника.
    pub fn root_seed(&self) -> Vec<(String, String)> {
        self.categories
            .iter()
            .map(|rule| (rule.name.clone(), rule.keywords.join(", ")))
            .collect()
    }

    pub fn is_known_brand(&self, candidate: &str) -> bool {
        self.brands
            .iter()
            .any(|b| b.eq_ignore_ascii_case(candidate))
    }

    pub fn is_dash_article_brand(&self, brand: &str) -> bool {
        self.dash_article_brands
            .iter()
            .any(|b| b.eq_ignore_ascii_case(brand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_tables_load() {
        let tables = EnrichmentTables::load_default().unwrap();
        assert_eq!(tables.categories.len(), 4);
        assert!(tables.brands.len() > 50);
        assert!(!tables.default_category.is_empty());
        // категория по умолчанию существует среди корней
        assert!(tables
            .categories
            .iter()
            .any(|c| c.name == tables.default_category));
        // корни подкатегорий существуют
        for sub in &tables.subcategories {
            assert!(
                tables.categories.iter().any(|c| c.name == sub.root),
                "подкатегория {} ссылается на неизвестный корень {}",
                sub.name,
                sub.root
            );
        }
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        std::fs::write(
            &path,
            r#"{
              "default_category": "Прочее",
              "categories": [{"name": "Прочее", "keywords": ["деталь"]}],
              "subcategories": [],
              "brands": ["Bosch"],
              "dash_article_brands": []
            }"#,
        )
        .unwrap();
        let tables = EnrichmentTables::load(Some(&path)).unwrap();
        assert_eq!(tables.categories.len(), 1);
        assert!(tables.is_known_brand("BOSCH"));
    }

    #[test]
    fn test_spark_plug_order_before_generic() {
        // "свеча накала" должна идти раньше "свеча"
        let tables = EnrichmentTables::load_default().unwrap();
        let glow = tables
            .subcategories
            .iter()
            .position(|s| s.keyword == "свеча накала")
            .unwrap();
        let generic = tables
            .subcategories
            .iter()
            .position(|s| s.keyword == "свеча")
            .unwrap();
        assert!(glow < generic);
    }
}
