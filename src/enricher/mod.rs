// ==========================================
// Каталог автозапчастей - обогащение записей
// ==========================================
// Детерминированный вывод структурных атрибутов из
// свободного текста наименования: категория, бренд,
// артикул, OEM-номер, применимость.
//
// Все выводы носят рекомендательный характер: явно
// заданное в источнике значение всегда важнее выведенного.
// ==========================================

pub mod article;
pub mod brand;
pub mod category;
pub mod name_parser;
pub mod tables;

pub use article::extract_article;
pub use brand::detect_brand;
pub use category::CategoryMatch;
pub use name_parser::{parse_product_name, ParsedName};
pub use tables::{CategoryRule, EnrichmentTables, SubcategoryRule};

use crate::domain::RawProductRecord;

/// Дозаполнение записи выводами из наименования.
///
/// Поля, уже присутствующие в записи, не перезаписываются.
pub fn enrich_record(record: &mut RawProductRecord, tables: &EnrichmentTables) {
    let name = match record.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => return,
    };

    let parsed = parse_product_name(&name, tables);

    if record.brand.is_none() {
        record.brand = parsed.brand;
    }
    if record.article.is_none() {
        record.article = parsed.article;
    }
    if let Some(oem) = parsed.oem_number {
        record.push_cross_number(&oem);
    }
    if let Some(applicability) = parsed.applicability {
        record.push_applicability(&applicability);
    }
    // категорию по тексту разрешает движок сверки: явное имя
    // категории из источника важнее наименования товара
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_fills_missing_fields() {
        let tables = EnrichmentTables::load_default().unwrap();
        let mut record = RawProductRecord::new(1);
        record.name =
            Some("Амортизатор DAIHATSU 332120 /48510-B1020 M300/M301 F/R/L 2WD".to_string());

        enrich_record(&mut record, &tables);

        assert_eq!(record.brand.as_deref(), Some("Daihatsu"));
        assert_eq!(record.article.as_deref(), Some("332120"));
        assert!(record
            .cross_numbers
            .iter()
            .any(|n| n == "48510-B1020"));
        assert_eq!(record.applicability, vec!["M300/M301 F/R/L 2WD"]);
    }

    #[test]
    fn test_enrich_does_not_override_explicit() {
        let tables = EnrichmentTables::load_default().unwrap();
        let mut record = RawProductRecord::new(1);
        record.name = Some("Амортизатор DAIHATSU 332120".to_string());
        record.brand = Some("KYB".to_string());
        record.article = Some("333433".to_string());

        enrich_record(&mut record, &tables);

        assert_eq!(record.brand.as_deref(), Some("KYB"));
        assert_eq!(record.article.as_deref(), Some("333433"));
    }

    #[test]
    fn test_enrich_without_name_is_noop() {
        let tables = EnrichmentTables::load_default().unwrap();
        let mut record = RawProductRecord::new(1);
        enrich_record(&mut record, &tables);
        assert!(record.brand.is_none());
        assert!(record.article.is_none());
    }
}
