// ==========================================
// Каталог автозапчастей - разбор наименования
// ==========================================
// Типичное наименование из прайс-листа:
//   "Амортизатор DAIHATSU 332120 /48510-B1020 M300/M301 F/R/L 2WD"
//    тип        бренд     артикул OEM-номер   применимость
//
// OEM-номер стоит после слеша с пробелом перед ним; слеши
// внутри применимости (M300/M301, F/R/L) пробелом не
// предваряются. Хвост после OEM-номера - применимость,
// служебные слова НОВЫЙ/NEW отбрасываются.
// ==========================================

use crate::enricher::article::{accept_candidate, extract_article};
use crate::enricher::brand::detect_brand;
use crate::enricher::category;
use crate::enricher::tables::EnrichmentTables;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct ParsedName {
    pub brand: Option<String>,
    pub article: Option<String>,
    pub oem_number: Option<String>,
    pub applicability: Option<String>,
    pub category_root: Option<String>,
    pub subcategory: Option<String>,
}

/// OEM-номер: слеш с пробелом перед ним, затем код.
static OEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+/\s*([A-Za-z0-9\-]{3,20})").expect("шаблон OEM"));

/// Коды двигателей вида 1NZ-FE / 2ZRFE не являются OEM-номерами.
static ENGINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d?[A-Z]{2,4}-?F[ED]$").expect("шаблон кода двигателя"));

/// Служебные слова, отбрасываемые из применимости.
static ORNAMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(НОВЫЙ|NEW)\b").expect("шаблон служебных слов"));

/// Артикул вида TT-124 / GUT-25 после бренда.
static DASH_ARTICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([A-Z]{2,3}-\d{1,4})\b").expect("шаблон короткого артикула"));

/// Полный разбор наименования.
pub fn parse_product_name(name: &str, tables: &EnrichmentTables) -> ParsedName {
    let mut parsed = ParsedName::default();

    let category_match = category::detect(name, tables);
    parsed.category_root = Some(category_match.root);
    parsed.subcategory = category_match.subcategory;

    parsed.brand = detect_brand(name, tables);

    // OEM-номер и применимость за ним
    if let Some(captures) = OEM_RE.captures(name) {
        let candidate = captures.get(1).map(|m| m.as_str().to_uppercase());
        if let Some(candidate) = candidate {
            if !ENGINE_CODE_RE.is_match(&candidate) {
                let oem_end = captures.get(1).map(|m| m.end()).unwrap_or(name.len());
                parsed.oem_number = Some(candidate);
                let tail = &name[oem_end..];
                let tail = ORNAMENT_RE.replace_all(tail, "");
                let tail = tail.trim().trim_matches(',').trim();
                if !tail.is_empty() {
                    parsed.applicability = Some(tail.to_string());
                }
            }
        }
    }

    parsed.article = extract_article_for_brand(name, parsed.brand.as_deref(), tables);

    parsed
}

/// Извлечение артикула с учётом бренда.
///
/// Для брендов с коротким дефисным форматом (TOYO, GMB, FEBEST...)
/// сначала ищется артикул вида TT-124 рядом с брендом; затем
/// длинные форматы после бренда; затем общий каскад.
fn extract_article_for_brand(
    name: &str,
    brand: Option<&str>,
    tables: &EnrichmentTables,
) -> Option<String> {
    // часть наименования до OEM-номера: сам OEM - кросс-номер,
    // а не артикул
    let search_area = match OEM_RE.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    };

    if let Some(brand) = brand {
        let brand_upper = brand.to_uppercase();
        let area_upper = search_area.to_uppercase();
        if let Some(after_brand) = area_upper
            .find(&brand_upper)
            .and_then(|pos| search_area.get(pos + brand_upper.len()..))
        {

            if tables.is_dash_article_brand(brand) {
                if let Some(captures) = DASH_ARTICLE_RE.captures(after_brand) {
                    let candidate = captures.get(1).map(|m| m.as_str().to_uppercase());
                    if let Some(c) = candidate.filter(|c| accept_candidate(c, tables)) {
                        return Some(c);
                    }
                }
            }

            // шесть цифр сразу после бренда: "DAIHATSU 332120"
            static AFTER_BRAND_SIX: Lazy<Regex> =
                Lazy::new(|| Regex::new(r"^[\s,]+(\d{6})\b").expect("шаблон артикула"));
            if let Some(captures) = AFTER_BRAND_SIX.captures(after_brand) {
                let candidate = captures.get(1).map(|m| m.as_str().to_string());
                if let Some(c) = candidate.filter(|c| accept_candidate(c, tables)) {
                    return Some(c);
                }
            }

            // длинный формат после бренда: "TOYOTA 90919-A2002"
            static AFTER_BRAND_LONG: Lazy<Regex> = Lazy::new(|| {
                Regex::new(r"(?i)^[\s,]+(\d{5}-[A-Z0-9]{3,6})\b").expect("шаблон артикула")
            });
            if let Some(captures) = AFTER_BRAND_LONG.captures(after_brand) {
                let candidate = captures.get(1).map(|m| m.as_str().to_uppercase());
                if let Some(c) = candidate.filter(|c| accept_candidate(c, tables)) {
                    return Some(c);
                }
            }
        }
    }

    extract_article(search_area, tables)
}
