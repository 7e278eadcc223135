// ==========================================
// Каталог автозапчастей - движок сверки
// ==========================================
// Вход: поток канонических записей + признак полной выгрузки.
// Поиск существующего товара: external_id (приоритет 1),
// затем (артикул, тип каталога) (приоритет 2).
// Слияние:
//   - скаляры перезаписываются только непустыми значениями
//   - кросс-номера: объединение множеств без дубликатов
//     (без учёта регистра), порядок первого появления
//   - характеристики: добавление новых ключей; существующий
//     ключ перезаписывается, только если явно пришёл в записи
//   - наличие выводится из остатка после слияния
// Полная выгрузка: товары с external_id, не встреченные в
// батче, помечаются неактивными (мягкое скрытие).
// Батч атомарен на уровне хранилища; ошибка валидации
// одной записи пропускает только её.
// ==========================================

use crate::domain::types::{Availability, CatalogType, Condition, SyncStatus};
use crate::domain::{characteristics_pairs, split_cross_numbers, RawProductRecord, SyncErrorEntry};
use crate::enricher::{self, EnrichmentTables};
use crate::importer::commerceml::OfferUpdate;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{CategoryRepository, NewProduct, ProductRepository, RepositoryError};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub catalog_type: CatalogType,
    /// Полная выгрузка: отсутствующие external_id скрываются.
    pub full_snapshot: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            catalog_type: CatalogType::Retail,
            full_snapshot: false,
        }
    }
}

/// Итог батча. Инвариант: created + updated + skipped + errors == total.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    /// Записи без действия (например, предложение для неизвестного товара).
    pub skipped: usize,
    pub hidden: usize,
    pub errors: Vec<SyncErrorEntry>,
}

impl BatchOutcome {
    pub fn status(&self) -> SyncStatus {
        if self.errors.is_empty() {
            SyncStatus::Success
        } else if self.created + self.updated > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Error
        }
    }
}

enum UpsertOutcome {
    Created,
    Updated,
}

pub struct ReconcileEngine {
    products: ProductRepository,
    categories: CategoryRepository,
    tables: Arc<EnrichmentTables>,
}

impl ReconcileEngine {
    pub fn new(
        products: ProductRepository,
        categories: CategoryRepository,
        tables: Arc<EnrichmentTables>,
    ) -> Self {
        Self {
            products,
            categories,
            tables,
        }
    }

    /// Сверка батча канонических записей с хранилищем.
    pub fn reconcile_batch(
        &self,
        records: Vec<RawProductRecord>,
        options: &ReconcileOptions,
    ) -> ImportResult<BatchOutcome> {
        let mut outcome = BatchOutcome {
            total: records.len(),
            ..Default::default()
        };

        // external_id, заявленные полной выгрузкой, собираются
        // со всех записей до пообъектной обработки
        let snapshot_ids: HashSet<String> = records
            .iter()
            .filter_map(|r| r.external_id.clone())
            .filter(|id| !id.is_empty())
            .collect();

        self.products.begin_batch()?;

        let mut seen_external_ids: HashSet<String> = HashSet::new();

        for mut record in records {
            enricher::enrich_record(&mut record, &self.tables);

            if let Err(message) = validate_record(&record, &mut seen_external_ids) {
                warn!(identifier = %record.identifier(), %message, "запись отклонена");
                outcome.errors.push(SyncErrorEntry {
                    identifier: record.identifier(),
                    message,
                });
                continue;
            }

            // один повтор на временных ошибках хранилища
            let result = match self.upsert(&record, options) {
                Err(ImportError::Repository(e)) if e.is_retryable() => {
                    debug!(identifier = %record.identifier(), error = %e, "повтор записи");
                    self.upsert(&record, options)
                }
                other => other,
            };

            match result {
                Ok(UpsertOutcome::Created) => outcome.created += 1,
                Ok(UpsertOutcome::Updated) => outcome.updated += 1,
                Err(e) => {
                    warn!(identifier = %record.identifier(), error = %e, "ошибка записи");
                    outcome.errors.push(SyncErrorEntry {
                        identifier: record.identifier(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // мягкое скрытие выполняется после всех upsert батча
        if options.full_snapshot && !snapshot_ids.is_empty() {
            match self.products.hide_absent(&snapshot_ids) {
                Ok(hidden) => outcome.hidden = hidden,
                Err(e) => {
                    self.products.rollback_batch()?;
                    return Err(e.into());
                }
            }
        }

        self.products.commit_batch()?;
        Ok(outcome)
    }

    /// Применение файла предложений: только цены и остатки,
    /// неизвестные товары пропускаются.
    pub fn apply_offers(&self, offers: Vec<OfferUpdate>) -> ImportResult<BatchOutcome> {
        let mut outcome = BatchOutcome {
            total: offers.len(),
            ..Default::default()
        };

        self.products.begin_batch()?;

        for offer in offers {
            let existing = self
                .products
                .find_by_external_id(&offer.external_id)
                .and_then(|found| match found {
                    Some(product) => Ok(Some(product)),
                    None => self
                        .products
                        .find_by_article(&offer.external_id, CatalogType::Retail),
                });

            let mut product = match existing {
                Ok(Some(product)) => product,
                Ok(None) => {
                    debug!(external_id = %offer.external_id, "предложение для неизвестного товара");
                    outcome.skipped += 1;
                    continue;
                }
                Err(e) => {
                    outcome.errors.push(SyncErrorEntry {
                        identifier: offer.external_id.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if let Some(price) = offer.price {
                product.price = price;
            }
            if let Some(quantity) = offer.quantity {
                product.quantity = quantity;
                product.availability = Availability::derive(quantity, None);
            }

            match self.products.update(&product) {
                Ok(()) => outcome.updated += 1,
                Err(e) => outcome.errors.push(SyncErrorEntry {
                    identifier: offer.external_id.clone(),
                    message: e.to_string(),
                }),
            }
        }

        self.products.commit_batch()?;
        Ok(outcome)
    }

    fn upsert(
        &self,
        record: &RawProductRecord,
        options: &ReconcileOptions,
    ) -> ImportResult<UpsertOutcome> {
        let category_id = self.resolve_category(record)?;

        let existing = match record.external_id.as_deref().filter(|id| !id.is_empty()) {
            Some(external_id) => self.products.find_by_external_id(external_id)?,
            None => None,
        };
        let existing = match existing {
            Some(product) => Some(product),
            None => match record.article.as_deref().filter(|a| !a.is_empty()) {
                Some(article) => self
                    .products
                    .find_by_article(article, options.catalog_type)?,
                None => None,
            },
        };

        match existing {
            Some(mut product) => {
                self.merge_into(&mut product, record, category_id);
                self.products.update(&product)?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let quantity = record.quantity.unwrap_or(0);
                let new_product = NewProduct {
                    external_id: record.external_id.clone().filter(|id| !id.is_empty()),
                    article: record.article.clone().unwrap_or_default(),
                    name: record.name.clone().unwrap_or_default(),
                    brand: record.brand.clone().unwrap_or_default(),
                    category_id,
                    price: record.price.unwrap_or(Decimal::ZERO),
                    wholesale_price: record.wholesale_price,
                    old_price: record.old_price,
                    quantity,
                    availability: Availability::derive(quantity, record.availability),
                    condition: record.condition.unwrap_or(Condition::New),
                    short_description: record.short_description.clone().unwrap_or_default(),
                    description: record.description.clone().unwrap_or_default(),
                    characteristics: merge_characteristics("", &record.characteristics),
                    applicability: record.applicability.join(", "),
                    cross_numbers: merge_cross_numbers("", &record.cross_numbers),
                    catalog_type: options.catalog_type,
                    properties: record.properties.clone(),
                    is_active: record.is_active.unwrap_or(true),
                };
                self.products.insert(new_product)?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn merge_into(
        &self,
        product: &mut crate::domain::Product,
        record: &RawProductRecord,
        category_id: Option<i64>,
    ) {
        // скаляры перезаписываются только непустыми значениями
        if let Some(external_id) = record.external_id.as_deref().filter(|s| !s.is_empty()) {
            if product.external_id.is_none() {
                product.external_id = Some(external_id.to_string());
            }
        }
        if let Some(name) = record.name.as_deref().filter(|s| !s.is_empty()) {
            product.name = name.to_string();
        }
        if let Some(article) = record.article.as_deref().filter(|s| !s.is_empty()) {
            product.article = article.to_string();
        }
        if let Some(brand) = record.brand.as_deref().filter(|s| !s.is_empty()) {
            product.brand = brand.to_string();
        }
        if let Some(price) = record.price {
            product.price = price;
        }
        if let Some(price) = record.wholesale_price {
            product.wholesale_price = Some(price);
        }
        if let Some(price) = record.old_price {
            product.old_price = Some(price);
        }
        if let Some(description) = record.description.as_deref().filter(|s| !s.is_empty()) {
            product.description = description.to_string();
        }
        if let Some(short) = record.short_description.as_deref().filter(|s| !s.is_empty()) {
            product.short_description = short.to_string();
        }
        if let Some(condition) = record.condition {
            product.condition = condition;
        }
        if category_id.is_some() {
            product.category_id = category_id;
        }

        if !record.applicability.is_empty() {
            product.applicability = record.applicability.join(", ");
        }
        product.cross_numbers = merge_cross_numbers(&product.cross_numbers, &record.cross_numbers);
        product.characteristics =
            merge_characteristics(&product.characteristics, &record.characteristics);

        for (key, value) in &record.properties {
            product.properties.insert(key.clone(), value.clone());
        }

        if let Some(quantity) = record.quantity {
            product.quantity = quantity;
        }
        product.availability = Availability::derive(product.quantity, record.availability);
        product.is_active = record.is_active.unwrap_or(true);
    }

    /// Разрешение категории: явное имя из источника важнее
    /// наименования товара. Корневые категории фиксированы,
    /// подкатегории создаются по необходимости.
    fn resolve_category(&self, record: &RawProductRecord) -> ImportResult<Option<i64>> {
        let text = record
            .category_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(record.name.as_deref());
        let text = match text {
            Some(text) => text,
            None => return Ok(None),
        };

        let matched = enricher::category::detect(text, &self.tables);

        let root = match self.categories.find_root_by_name(&matched.root)? {
            Some(root) => root,
            None => match self
                .categories
                .find_root_by_name(&self.tables.default_category)?
            {
                Some(root) => root,
                None => return Ok(None),
            },
        };

        if let Some(subcategory) = matched.subcategory {
            match self.categories.get_or_create_child(root.id, &subcategory) {
                Ok(child) => return Ok(Some(child.id)),
                Err(RepositoryError::UniqueConstraintViolation(_)) => {
                    // конкурентное создание: перечитываем
                    if let Some(child) =
                        self.categories.find_child_by_name(root.id, &subcategory)?
                    {
                        return Ok(Some(child.id));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(root.id))
    }
}

fn validate_record(
    record: &RawProductRecord,
    seen_external_ids: &mut HashSet<String>,
) -> Result<(), String> {
    let name_ok = record
        .name
        .as_deref()
        .map(|n| !n.trim().is_empty())
        .unwrap_or(false);
    if !name_ok {
        return Err("пустое название товара".to_string());
    }

    let has_identifier = record
        .external_id
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
        || record
            .article
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
    if !has_identifier {
        return Err("отсутствует идентификатор товара (Ид или Артикул)".to_string());
    }

    if let Some(price) = record.price {
        if price < Decimal::ZERO {
            return Err(format!("отрицательная цена: {price}"));
        }
    }
    if let Some(price) = record.wholesale_price {
        if price < Decimal::ZERO {
            return Err(format!("отрицательная оптовая цена: {price}"));
        }
    }
    if let Some(quantity) = record.quantity {
        if quantity < 0 {
            return Err(format!("отрицательный остаток: {quantity}"));
        }
    }

    if let Some(external_id) = record.external_id.as_deref().filter(|s| !s.is_empty()) {
        if !seen_external_ids.insert(external_id.to_string()) {
            return Err(format!("дубликат external_id в батче: {external_id}"));
        }
    }

    Ok(())
}

/// Объединение кросс-номеров: без дубликатов (без учёта регистра),
/// порядок первого появления сохраняется.
pub fn merge_cross_numbers(existing: &str, incoming: &[String]) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for token in split_cross_numbers(existing) {
        if seen.insert(token.to_lowercase()) {
            result.push(token);
        }
    }
    for token in incoming {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if seen.insert(token.to_lowercase()) {
            result.push(token.to_string());
        }
    }
    result.join(", ")
}

/// Слияние характеристик: новые ключи добавляются, существующий
/// ключ перезаписывается только явно пришедшим значением.
pub fn merge_characteristics(existing: &str, incoming: &[(String, String)]) -> String {
    let mut pairs = characteristics_pairs(existing);

    for (key, value) in incoming {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match pairs
            .iter_mut()
            .find(|(k, _)| k.to_lowercase() == key.to_lowercase())
        {
            Some((_, existing_value)) => *existing_value = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
    }

    pairs
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    fn engine() -> ReconcileEngine {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let tables = Arc::new(EnrichmentTables::load_default().unwrap());
        let categories = CategoryRepository::from_connection(shared.clone());
        categories.ensure_roots(&tables.root_seed()).unwrap();
        ReconcileEngine::new(
            ProductRepository::from_connection(shared.clone()),
            categories,
            tables,
        )
    }

    fn record(external_id: Option<&str>, name: &str) -> RawProductRecord {
        let mut r = RawProductRecord::new(1);
        r.external_id = external_id.map(|s| s.to_string());
        r.name = Some(name.to_string());
        r
    }

    #[test]
    fn test_create_then_update_idempotent() {
        let engine = engine();
        let mut r = record(Some("guid-1"), "Стартер MITSUBISHI ME220745");
        r.price = Decimal::from_str("15000").ok();
        r.quantity = Some(2);

        let first = engine
            .reconcile_batch(vec![r.clone()], &ReconcileOptions::default())
            .unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.updated, 0);
        assert!(first.errors.is_empty());

        // повторный импорт того же батча: updated = total, created = 0
        let product_before = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        let second = engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);
        assert!(second.errors.is_empty());

        let product_after = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        assert_eq!(product_before.name, product_after.name);
        assert_eq!(product_before.article, product_after.article);
        assert_eq!(product_before.price, product_after.price);
        assert_eq!(product_before.cross_numbers, product_after.cross_numbers);
        assert_eq!(product_before.characteristics, product_after.characteristics);
    }

    #[test]
    fn test_counts_add_up() {
        let engine = engine();
        let good = record(Some("guid-1"), "Стартер ME220745");
        let no_name = record(Some("guid-2"), "   ");
        let mut no_id = RawProductRecord::new(3);
        no_id.name = Some("товар без идентификатора и артикула в имени".to_string());

        let outcome = engine
            .reconcile_batch(vec![good, no_name, no_id], &ReconcileOptions::default())
            .unwrap();
        assert_eq!(outcome.total, 3);
        assert_eq!(
            outcome.created + outcome.updated + outcome.skipped + outcome.errors.len(),
            outcome.total
        );
        assert_eq!(outcome.errors.len(), 2);
    }

    #[test]
    fn test_duplicate_external_id_in_batch() {
        let engine = engine();
        let a = record(Some("guid-1"), "Стартер ME220745");
        let b = record(Some("guid-1"), "Генератор ME220746");

        let outcome = engine
            .reconcile_batch(vec![a, b], &ReconcileOptions::default())
            .unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("дубликат"));
    }

    #[test]
    fn test_cross_numbers_union_case_insensitive() {
        let engine = engine();
        let mut r = record(Some("guid-1"), "Амортизатор KYB 333433");
        r.cross_numbers = vec!["48510-B1020".to_string()];
        engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();

        let mut r2 = record(Some("guid-1"), "Амортизатор KYB 333433");
        r2.cross_numbers = vec!["48510-b1020".to_string(), "48520-B1030".to_string()];
        engine
            .reconcile_batch(vec![r2], &ReconcileOptions::default())
            .unwrap();

        let product = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        assert_eq!(
            product.cross_numbers_list(),
            vec!["48510-B1020", "48520-B1030"]
        );
    }

    #[test]
    fn test_characteristics_append_and_overwrite() {
        let engine = engine();
        let mut r = record(Some("guid-1"), "Свеча NGK BKR6E-11");
        r.characteristics = vec![("Напряжение".to_string(), "12V".to_string())];
        engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();

        let mut r2 = record(Some("guid-1"), "Свеча NGK BKR6E-11");
        r2.characteristics = vec![
            ("напряжение".to_string(), "24V".to_string()),
            ("Материал".to_string(), "IRIDIUM".to_string()),
        ];
        engine
            .reconcile_batch(vec![r2], &ReconcileOptions::default())
            .unwrap();

        let product = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        let pairs = product.characteristics_list();
        assert_eq!(
            pairs,
            vec![
                ("Напряжение".to_string(), "24V".to_string()),
                ("Материал".to_string(), "IRIDIUM".to_string()),
            ]
        );
    }

    #[test]
    fn test_full_snapshot_hides_absent() {
        let engine = engine();
        let batch = vec![
            record(Some("a"), "Стартер A1-100000"),
            record(Some("b"), "Генератор B1-100000"),
            record(Some("c"), "Фильтр C1-100000"),
        ];
        engine
            .reconcile_batch(batch, &ReconcileOptions::default())
            .unwrap();

        let partial = vec![
            record(Some("a"), "Стартер A1-100000"),
            record(Some("b"), "Генератор B1-100000"),
        ];
        let outcome = engine
            .reconcile_batch(
                partial,
                &ReconcileOptions {
                    catalog_type: CatalogType::Retail,
                    full_snapshot: true,
                },
            )
            .unwrap();
        assert_eq!(outcome.hidden, 1);
        assert!(!engine.products.find_by_external_id("c").unwrap().unwrap().is_active);
        assert!(engine.products.find_by_external_id("a").unwrap().unwrap().is_active);
    }

    #[test]
    fn test_availability_derived_from_quantity() {
        let engine = engine();
        let mut r = record(Some("guid-1"), "Стартер ME220745");
        r.quantity = Some(0);
        r.availability = Some(Availability::InStock);
        engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();

        let product = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        assert_eq!(product.availability, Availability::OutOfStock);
    }

    #[test]
    fn test_apply_offers_updates_known_skips_unknown() {
        let engine = engine();
        let mut r = record(Some("guid-1"), "Стартер ME220745");
        r.price = Decimal::from_str("10000").ok();
        r.quantity = Some(1);
        engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();

        let offers = vec![
            OfferUpdate {
                external_id: "guid-1".to_string(),
                price: Decimal::from_str("15500.00").ok(),
                quantity: Some(0),
            },
            OfferUpdate {
                external_id: "guid-unknown".to_string(),
                price: None,
                quantity: Some(5),
            },
        ];
        let outcome = engine.apply_offers(offers).unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.skipped, 1);

        let product = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        assert_eq!(product.price, Decimal::from_str("15500.00").unwrap());
        assert_eq!(product.quantity, 0);
        assert_eq!(product.availability, Availability::OutOfStock);
    }

    #[test]
    fn test_subcategory_created_on_demand() {
        let engine = engine();
        let r = record(Some("guid-1"), "Амортизатор KYB 333433");
        engine
            .reconcile_batch(vec![r], &ReconcileOptions::default())
            .unwrap();

        let product = engine.products.find_by_external_id("guid-1").unwrap().unwrap();
        let category = engine
            .categories
            .find_by_id(product.category_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(category.name, "Амортизаторы");
        let parent = engine
            .categories
            .find_by_id(category.parent_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(parent.name, "Детали подвески");
    }

    #[test]
    fn test_wholesale_catalog_does_not_cross_retail() {
        let engine = engine();
        let mut retail = RawProductRecord::new(1);
        retail.name = Some("Фильтр масляный C-110".to_string());
        retail.article = Some("C-110".to_string());
        engine
            .reconcile_batch(vec![retail], &ReconcileOptions::default())
            .unwrap();

        let mut wholesale = RawProductRecord::new(1);
        wholesale.name = Some("Фильтр масляный C-110".to_string());
        wholesale.article = Some("C-110".to_string());
        let outcome = engine
            .reconcile_batch(
                vec![wholesale],
                &ReconcileOptions {
                    catalog_type: CatalogType::Wholesale,
                    full_snapshot: false,
                },
            )
            .unwrap();
        // артикул совпадает, но каталоги разные: создаётся новый товар
        assert_eq!(outcome.created, 1);
    }
}
