// ==========================================
// Каталог автозапчастей - репозиторий товаров
// ==========================================
// Только доступ к данным, без бизнес-логики.
// Поиск: по external_id (приоритет), затем по (артикул, тип каталога).
// ==========================================

use crate::db::SharedConnection;
use crate::domain::types::{Availability, CatalogType, Condition};
use crate::domain::Product;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::MutexGuard;

pub struct ProductRepository {
    conn: SharedConnection,
}

/// Данные нового товара (id и таймстампы назначает репозиторий).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub external_id: Option<String>,
    pub article: String,
    pub name: String,
    pub brand: String,
    pub category_id: Option<i64>,
    pub price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub old_price: Option<Decimal>,
    pub quantity: i64,
    pub availability: Availability,
    pub condition: Condition,
    pub short_description: String,
    pub description: String,
    pub characteristics: String,
    pub applicability: String,
    pub cross_numbers: String,
    pub catalog_type: CatalogType,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub is_active: bool,
}

const PRODUCT_COLUMNS: &str = "id, external_id, article, name, brand, category_id, price, \
    wholesale_price, old_price, quantity, availability, condition, short_description, \
    description, characteristics, applicability, cross_numbers, catalog_type, properties, \
    is_active, created_at, updated_at";

impl ProductRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Транзакции батча
    // ==========================================
    // Сверка обрабатывает батч в одной транзакции:
    // запись с ошибкой валидации пропускается, но фатальная
    // ошибка откатывает батч целиком.

    pub fn begin_batch(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("BEGIN IMMEDIATE;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    pub fn commit_batch(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("COMMIT;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    pub fn rollback_batch(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("ROLLBACK;")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    // ==========================================
    // Поиск
    // ==========================================

    pub fn find_by_external_id(&self, external_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE external_id = ?1"
        ))?;
        let result = stmt.query_row(params![external_id], map_product_row);
        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_article(
        &self,
        article: &str,
        catalog_type: CatalogType,
    ) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE article = ?1 AND catalog_type = ?2 ORDER BY id LIMIT 1"
        ))?;
        let result = stmt.query_row(params![article, catalog_type.as_str()], map_product_row);
        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))?;
        let result = stmt.query_row(params![id], map_product_row);
        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Активные товары каталога (для выгрузки).
    pub fn list_active(&self, catalog_type: CatalogType) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND catalog_type = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![catalog_type.as_str()], map_product_row)?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // Изменения
    // ==========================================

    pub fn insert(&self, product: NewProduct) -> RepositoryResult<i64> {
        let now = Utc::now();
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO products (
                external_id, article, name, brand, category_id, price,
                wholesale_price, old_price, quantity, availability, condition,
                short_description, description, characteristics, applicability,
                cross_numbers, catalog_type, properties, is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
            )
            "#,
            params![
                product.external_id,
                product.article,
                product.name,
                product.brand,
                product.category_id,
                product.price.to_string(),
                product.wholesale_price.map(|p| p.to_string()),
                product.old_price.map(|p| p.to_string()),
                product.quantity,
                product.availability.as_str(),
                product.condition.as_str(),
                product.short_description,
                product.description,
                product.characteristics,
                product.applicability,
                product.cross_numbers,
                product.catalog_type.as_str(),
                serde_json::Value::Object(product.properties).to_string(),
                product.is_active,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, product: &Product) -> RepositoryResult<()> {
        let now = Utc::now();
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE products SET
                external_id = ?1, article = ?2, name = ?3, brand = ?4, category_id = ?5,
                price = ?6, wholesale_price = ?7, old_price = ?8, quantity = ?9,
                availability = ?10, condition = ?11, short_description = ?12,
                description = ?13, characteristics = ?14, applicability = ?15,
                cross_numbers = ?16, catalog_type = ?17, properties = ?18,
                is_active = ?19, updated_at = ?20
            WHERE id = ?21
            "#,
            params![
                product.external_id,
                product.article,
                product.name,
                product.brand,
                product.category_id,
                product.price.to_string(),
                product.wholesale_price.map(|p| p.to_string()),
                product.old_price.map(|p| p.to_string()),
                product.quantity,
                product.availability.as_str(),
                product.condition.as_str(),
                product.short_description,
                product.description,
                product.characteristics,
                product.applicability,
                product.cross_numbers,
                product.catalog_type.as_str(),
                serde_json::Value::Object(product.properties.clone()).to_string(),
                product.is_active,
                now.to_rfc3339(),
                product.id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product.id.to_string(),
            });
        }
        Ok(())
    }

    /// Скрыть товары с external_id, отсутствующим в полной выгрузке.
    ///
    /// Товары без external_id не затрагиваются. Возвращает число скрытых.
    /// Обход в лексикографическом порядке external_id.
    pub fn hide_absent(&self, present: &HashSet<String>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT external_id FROM products \
             WHERE external_id IS NOT NULL AND is_active = 1 ORDER BY external_id",
        )?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;

        let mut hidden = 0usize;
        let now = Utc::now().to_rfc3339();
        for external_id in ids {
            if !present.contains(&external_id) {
                hidden += conn.execute(
                    "UPDATE products SET is_active = 0, updated_at = ?1 WHERE external_id = ?2",
                    params![now, external_id],
                )?;
            }
        }
        Ok(hidden)
    }
}

fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let price_text: String = row.get(6)?;
    let wholesale_text: Option<String> = row.get(7)?;
    let old_price_text: Option<String> = row.get(8)?;
    let properties_text: String = row.get(18)?;

    let properties = serde_json::from_str::<serde_json::Value>(&properties_text)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();

    Ok(Product {
        id: row.get(0)?,
        external_id: row.get(1)?,
        article: row.get(2)?,
        name: row.get(3)?,
        brand: row.get(4)?,
        category_id: row.get(5)?,
        price: Decimal::from_str(&price_text).unwrap_or(Decimal::ZERO),
        wholesale_price: wholesale_text.and_then(|t| Decimal::from_str(&t).ok()),
        old_price: old_price_text.and_then(|t| Decimal::from_str(&t).ok()),
        quantity: row.get(9)?,
        availability: Availability::parse(&row.get::<_, String>(10)?)
            .unwrap_or(Availability::OutOfStock),
        condition: Condition::parse(&row.get::<_, String>(11)?).unwrap_or(Condition::New),
        short_description: row.get(12)?,
        description: row.get(13)?,
        characteristics: row.get(14)?,
        applicability: row.get(15)?,
        cross_numbers: row.get(16)?,
        catalog_type: CatalogType::parse(&row.get::<_, String>(17)?)
            .unwrap_or(CatalogType::Retail),
        properties,
        is_active: row.get(19)?,
        created_at: parse_timestamp(row.get::<_, String>(20)?),
        updated_at: parse_timestamp(row.get::<_, String>(21)?),
    })
}

fn parse_timestamp(text: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_repo() -> ProductRepository {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ProductRepository::from_connection(std::sync::Arc::new(std::sync::Mutex::new(conn)))
    }

    fn sample_product(external_id: Option<&str>, article: &str) -> NewProduct {
        NewProduct {
            external_id: external_id.map(|s| s.to_string()),
            article: article.to_string(),
            name: "Стартер Isuzu 10PD1 24V".to_string(),
            brand: "Isuzu".to_string(),
            category_id: None,
            price: Decimal::from_str("15000").unwrap(),
            wholesale_price: None,
            old_price: None,
            quantity: 2,
            availability: Availability::InStock,
            condition: Condition::New,
            short_description: String::new(),
            description: String::new(),
            characteristics: String::new(),
            applicability: String::new(),
            cross_numbers: String::new(),
            catalog_type: CatalogType::Retail,
            properties: serde_json::Map::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_insert_and_find_by_external_id() {
        let repo = test_repo();
        let id = repo.insert(sample_product(Some("guid-1"), "ME220745")).unwrap();
        assert!(id > 0);

        let found = repo.find_by_external_id("guid-1").unwrap().unwrap();
        assert_eq!(found.article, "ME220745");
        assert_eq!(found.price, Decimal::from_str("15000").unwrap());
        assert!(repo.find_by_external_id("guid-2").unwrap().is_none());
    }

    #[test]
    fn test_find_by_article_respects_catalog_type() {
        let repo = test_repo();
        repo.insert(sample_product(None, "ME220745")).unwrap();

        assert!(repo
            .find_by_article("ME220745", CatalogType::Retail)
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_article("ME220745", CatalogType::Wholesale)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_external_id_unique() {
        let repo = test_repo();
        repo.insert(sample_product(Some("guid-1"), "A1")).unwrap();
        let err = repo.insert(sample_product(Some("guid-1"), "A2")).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_hide_absent_keeps_products_without_external_id() {
        let repo = test_repo();
        repo.insert(sample_product(Some("a"), "A1")).unwrap();
        repo.insert(sample_product(Some("b"), "A2")).unwrap();
        repo.insert(sample_product(Some("c"), "A3")).unwrap();
        repo.insert(sample_product(None, "A4")).unwrap();

        let present: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let hidden = repo.hide_absent(&present).unwrap();
        assert_eq!(hidden, 1);

        assert!(repo.find_by_external_id("a").unwrap().unwrap().is_active);
        assert!(repo.find_by_external_id("b").unwrap().unwrap().is_active);
        assert!(!repo.find_by_external_id("c").unwrap().unwrap().is_active);
        let no_ext = repo.find_by_article("A4", CatalogType::Retail).unwrap().unwrap();
        assert!(no_ext.is_active);
    }

    #[test]
    fn test_update_roundtrip() {
        let repo = test_repo();
        let id = repo.insert(sample_product(Some("guid-1"), "A1")).unwrap();
        let mut product = repo.find_by_id(id).unwrap().unwrap();
        product.quantity = 0;
        product.availability = Availability::OutOfStock;
        product.cross_numbers = "1-81100-141-0".to_string();
        repo.update(&product).unwrap();

        let reread = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(reread.quantity, 0);
        assert_eq!(reread.availability, Availability::OutOfStock);
        assert_eq!(reread.cross_numbers_list(), vec!["1-81100-141-0"]);
    }
}
