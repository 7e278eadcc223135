// ==========================================
// Каталог автозапчастей - маппер колонок
// ==========================================
// Тотальная функция: имя колонки источника -> каноническое
// поле либо "неизвестно" (уходит в properties).
// Диалекты: русский/английский, с подчёркиваниями и без,
// формулировки конкретных прайс-листов
// ("Розничная Фарпост RUB", "Склад Уссурийск Остаток").
// При конфликте выигрывает первая непустая колонка.
// ==========================================

use crate::domain::types::Condition;
use crate::domain::RawProductRecord;
use crate::importer::normalize;
use crate::importer::raw::{RawRow, RawValue};
use rust_decimal::Decimal;

/// Каноническое поле, на которое ложится колонка источника.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalField {
    Name,
    Article,
    OemNumber,
    ExternalId,
    Price,
    WholesalePrice,
    OldPrice,
    Quantity,
    Brand,
    Category,
    Description,
    ShortDescription,
    CrossNumbers,
    /// Текстовый блок характеристик целиком (строки `ключ: значение`).
    CharacteristicsBlob,
    /// Текстовый блок применимости целиком.
    Applicability,
    Condition,
    Availability,
    IsActive,
    /// Части применимости: двигатель / кузов / модель.
    Engine,
    Body,
    Model,
    /// Колонки-характеристики: (название характеристики).
    Characteristic(&'static str),
    /// Колонка "размер": тип значения определяется содержимым.
    Size,
    Unknown,
}

/// Идентификаторы учётной системы сверяются по нормализованному
/// равенству, а не по вхождению: "id" как подстрока дал бы
/// ложные срабатывания.
const EXTERNAL_ID_KEYS: &[&str] = &["ид", "id", "guid", "uuid", "externalid", "id1c"];

/// Классификация имени колонки.
pub fn classify_column(key: &str) -> CanonicalField {
    let lower = key.trim().to_lowercase();
    if lower.is_empty() {
        return CanonicalField::Unknown;
    }
    let normalized: String = lower
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .collect();

    if EXTERNAL_ID_KEYS.contains(&normalized.as_str()) {
        return CanonicalField::ExternalId;
    }

    // OEM-номер до артикула: "артикул2" содержит "артикул"
    if lower.contains("артикул2")
        || lower.contains("oem")
        || lower.contains("oe_number")
        || lower.contains("original_number")
    {
        return CanonicalField::OemNumber;
    }
    if lower.contains("артикул") || normalized == "article" || normalized == "sku" {
        return CanonicalField::Article;
    }

    if lower.contains("кросс") || lower.contains("cross") {
        return CanonicalField::CrossNumbers;
    }

    // Блоки целиком (например, при обратном разборе собственной выгрузки).
    // Проверяются до триггеров названия: "характеристика" в
    // единственном числе - признак колонки наименования.
    if normalized == "характеристики" || normalized == "characteristics" {
        return CanonicalField::CharacteristicsBlob;
    }
    if lower.contains("применимость") || normalized == "applicability" {
        return CanonicalField::Applicability;
    }

    // Оптовая цена до розничной: "оптовая цена" содержит "цена"
    if lower.contains("опт") || lower.contains("wholesale") {
        return CanonicalField::WholesalePrice;
    }
    if lower.contains("стар") && lower.contains("цена") || lower.contains("old_price") {
        return CanonicalField::OldPrice;
    }
    if lower.contains("цена")
        || lower.contains("розничная")
        || lower.contains("farpost")
        || lower.contains("руб")
        || lower.contains("price")
    {
        return CanonicalField::Price;
    }

    if lower.contains("остаток")
        || lower.contains("склад")
        || lower.contains("уссурийск")
        || lower.contains("quantity")
        || lower.contains("количество")
        || normalized == "stock"
        || normalized == "qty"
    {
        return CanonicalField::Quantity;
    }

    // Название до бренда: "наименование для печати" и т.п.
    if lower.contains("номенклатура")
        || lower.contains("наименование")
        || lower.contains("характеристика")
        || lower.contains("печать")
        || lower.contains("название")
        || normalized == "name"
        || normalized == "title"
    {
        return CanonicalField::Name;
    }

    if lower.contains("бренд")
        || lower.contains("марка")
        || lower.contains("производитель")
        || lower.contains("manufacturer")
        || normalized == "brand"
    {
        return CanonicalField::Brand;
    }

    if lower.contains("категория") || lower.contains("группа") || normalized == "category" {
        return CanonicalField::Category;
    }

    if lower.contains("краткое") || lower.contains("short_description") {
        return CanonicalField::ShortDescription;
    }
    if lower.contains("описание") || lower.contains("description") {
        return CanonicalField::Description;
    }

    if lower.contains("состояние") || normalized == "condition" || normalized == "новый" {
        return CanonicalField::Condition;
    }
    if lower.contains("наличие") || normalized == "availability" {
        return CanonicalField::Availability;
    }
    if lower.contains("активен") || normalized == "isactive" {
        return CanonicalField::IsActive;
    }

    // Применимость
    if lower.contains("двигатель") || lower.contains("мотор") || normalized == "engine" {
        return CanonicalField::Engine;
    }
    if lower.contains("кузов") || normalized == "body" {
        return CanonicalField::Body;
    }
    if lower.contains("модель") || normalized == "model" {
        return CanonicalField::Model;
    }

    // Колонки-характеристики
    if lower.contains("размер") || normalized == "size" {
        return CanonicalField::Size;
    }
    if lower.contains("вольтаж") || lower.contains("напряжение") || normalized == "voltage" {
        return CanonicalField::Characteristic("Напряжение");
    }
    if lower.contains("год") || normalized == "year" {
        return CanonicalField::Characteristic("Год");
    }
    if lower.contains("цвет") || normalized == "color" {
        return CanonicalField::Characteristic("Цвет");
    }
    if lower.contains("сторона") || normalized == "side" {
        return CanonicalField::Characteristic("Сторона");
    }
    if lower.contains("позиция") || normalized == "position" {
        return CanonicalField::Characteristic("Позиция");
    }
    if lower.contains("направление") || normalized == "direction" {
        return CanonicalField::Characteristic("Направление");
    }
    if lower.contains("примечание") || normalized == "note" {
        return CanonicalField::Characteristic("Примечание");
    }

    CanonicalField::Unknown
}

pub struct FieldMapper;

impl FieldMapper {
    /// Маппинг строки источника на канонический промежуточный формат.
    ///
    /// Порядок колонок соблюдается: первая непустая колонка,
    /// попавшая на каноническое поле, выигрывает.
    pub fn map_row(&self, row: RawRow) -> RawProductRecord {
        let mut record = RawProductRecord::new(row.row_number);
        let mut engine = None;
        let mut body = None;
        let mut model = None;

        for (key, value) in &row.cells {
            let text = match normalize::normalize_text(&value.text) {
                Some(t) => t,
                None => continue,
            };

            match classify_column(key) {
                CanonicalField::Name => set_first(&mut record.name, text),
                CanonicalField::Article => set_first(&mut record.article, text),
                CanonicalField::ExternalId => set_first(&mut record.external_id, text),
                CanonicalField::OemNumber => record.push_cross_number(&text),
                CanonicalField::CrossNumbers => {
                    for token in text.split(',') {
                        record.push_cross_number(token);
                    }
                }
                CanonicalField::CharacteristicsBlob => {
                    for (k, v) in crate::domain::characteristics_pairs(&text) {
                        record.push_characteristic(&k, &v);
                    }
                }
                CanonicalField::Applicability => {
                    for part in text.split(|c| c == ',' || c == ';' || c == '\n') {
                        record.push_applicability(part);
                    }
                }
                CanonicalField::Price => {
                    if record.price.is_none() {
                        record.price = numeric_decimal(value, &text);
                    }
                }
                CanonicalField::WholesalePrice => {
                    if record.wholesale_price.is_none() {
                        record.wholesale_price = numeric_decimal(value, &text);
                    }
                }
                CanonicalField::OldPrice => {
                    if record.old_price.is_none() {
                        record.old_price = numeric_decimal(value, &text);
                    }
                }
                CanonicalField::Quantity => {
                    if record.quantity.is_none() {
                        record.quantity = numeric_quantity(value, &text);
                    }
                }
                CanonicalField::Brand => set_first(&mut record.brand, text),
                CanonicalField::Category => set_first(&mut record.category_name, text),
                CanonicalField::Description => set_first(&mut record.description, text),
                CanonicalField::ShortDescription => {
                    set_first(&mut record.short_description, text)
                }
                CanonicalField::Condition => {
                    if record.condition.is_none() {
                        record.condition = Condition::parse(&text);
                    }
                }
                CanonicalField::Availability => {
                    if record.availability.is_none() {
                        record.availability = crate::domain::Availability::parse(&text);
                    }
                }
                CanonicalField::IsActive => {
                    if record.is_active.is_none() {
                        record.is_active = normalize::parse_bool_flag(&text);
                    }
                }
                CanonicalField::Engine => set_first(&mut engine, text),
                CanonicalField::Body => set_first(&mut body, text),
                CanonicalField::Model => set_first(&mut model, text),
                CanonicalField::Size => {
                    let (label, value) = normalize::classify_size_value(&text);
                    record.push_characteristic(label, &value);
                }
                CanonicalField::Characteristic(label) => {
                    record.push_characteristic(label, &text);
                }
                CanonicalField::Unknown => {
                    record
                        .properties
                        .insert(key.clone(), serde_json::Value::String(text));
                }
            }
        }

        // Применимость собирается в фиксированном порядке:
        // двигатель, кузов, модель
        for part in [engine, body, model].into_iter().flatten() {
            record.push_applicability(&part);
        }

        record
    }
}

fn set_first(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn numeric_decimal(value: &RawValue, text: &str) -> Option<Decimal> {
    if let Some(number) = value.number {
        return Decimal::try_from(number).ok();
    }
    normalize::parse_decimal(text)
}

fn numeric_quantity(value: &RawValue, text: &str) -> Option<i64> {
    if let Some(number) = value.number {
        return Some(number.trunc() as i64);
    }
    normalize::parse_quantity(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        let mut r = RawRow::new(1);
        for (k, v) in cells {
            r.push(*k, RawValue::text(*v));
        }
        r
    }

    #[test]
    fn test_classify_pricelist_dialect() {
        // Формат прайс-листа клиента
        assert_eq!(classify_column("Артикул"), CanonicalField::Article);
        assert_eq!(
            classify_column("Номенклатура, Характеристика. Наименование для печати"),
            CanonicalField::Name
        );
        assert_eq!(
            classify_column("Розничная Фарпост RUB Не включает Цена"),
            CanonicalField::Price
        );
        assert_eq!(
            classify_column("Склад Уссурийск Остаток"),
            CanonicalField::Quantity
        );
    }

    #[test]
    fn test_classify_wholesale_beats_price() {
        assert_eq!(classify_column("Оптовая цена"), CanonicalField::WholesalePrice);
        assert_eq!(classify_column("Цена опт"), CanonicalField::WholesalePrice);
        assert_eq!(classify_column("wholesale_price"), CanonicalField::WholesalePrice);
    }

    #[test]
    fn test_classify_oem_beats_article() {
        assert_eq!(classify_column("Артикул2"), CanonicalField::OemNumber);
        assert_eq!(classify_column("OEM"), CanonicalField::OemNumber);
        assert_eq!(classify_column("Артикул1"), CanonicalField::Article);
    }

    #[test]
    fn test_classify_external_id_exact_only() {
        assert_eq!(classify_column("Ид"), CanonicalField::ExternalId);
        assert_eq!(classify_column("ID_1C"), CanonicalField::ExternalId);
        assert_eq!(classify_column("guid"), CanonicalField::ExternalId);
        // "id" как подстрока не должен срабатывать
        assert_ne!(classify_column("validity"), CanonicalField::ExternalId);
    }

    #[test]
    fn test_map_row_basic() {
        let record = FieldMapper.map_row(row(&[
            ("Артикул", "ME220745"),
            ("Наименование", "Стартер MITSUBISHI"),
            ("Цена", "2 000,00"),
            ("Остаток", "4\u{00A0}000"),
            ("Марка", "Mitsubishi"),
        ]));
        assert_eq!(record.article.as_deref(), Some("ME220745"));
        assert_eq!(record.name.as_deref(), Some("Стартер MITSUBISHI"));
        assert_eq!(record.price, Decimal::from_str("2000.00").ok());
        assert_eq!(record.quantity, Some(4000));
        assert_eq!(record.brand.as_deref(), Some("Mitsubishi"));
    }

    #[test]
    fn test_map_row_first_nonempty_wins() {
        let record = FieldMapper.map_row(row(&[
            ("Цена", ""),
            ("Розничная цена", "1500"),
            ("price", "9999"),
        ]));
        assert_eq!(record.price, Decimal::from_str("1500").ok());
    }

    #[test]
    fn test_map_row_applicability_order() {
        let record = FieldMapper.map_row(row(&[
            ("Модель", "Camry"),
            ("Двигатель", "2GR-FE"),
            ("Кузов", "ACV40"),
        ]));
        // порядок фиксированный: двигатель, кузов, модель
        assert_eq!(record.applicability, vec!["2GR-FE", "ACV40", "Camry"]);
    }

    #[test]
    fn test_map_row_characteristics_and_size() {
        let record = FieldMapper.map_row(row(&[
            ("Размер", "12V-11V"),
            ("Сторона", "L"),
            ("Год", "2015"),
        ]));
        assert_eq!(
            record.characteristics,
            vec![
                ("Напряжение".to_string(), "12V-11V".to_string()),
                ("Сторона".to_string(), "L".to_string()),
                ("Год".to_string(), "2015".to_string()),
            ]
        );
    }

    #[test]
    fn test_map_row_unknown_goes_to_properties() {
        let record = FieldMapper.map_row(row(&[
            ("Наименование", "Фильтр"),
            ("Штрихкод", "4607001234567"),
        ]));
        assert_eq!(
            record.properties.get("Штрихкод").and_then(|v| v.as_str()),
            Some("4607001234567")
        );
    }

    #[test]
    fn test_map_row_oem_into_cross_numbers() {
        let record = FieldMapper.map_row(row(&[
            ("Артикул", "CP01"),
            ("Артикул2", "11065-D9702"),
            ("Кросс-номера", "90919-01243, 11065-D9702"),
        ]));
        assert_eq!(record.article.as_deref(), Some("CP01"));
        assert_eq!(
            record.cross_numbers,
            vec!["11065-D9702".to_string(), "90919-01243".to_string()]
        );
    }
}
