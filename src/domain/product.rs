// ==========================================
// Каталог автозапчастей - модель товара
// ==========================================
// Product       - каноническая запись в хранилище
// RawProductRecord - промежуточная структура конвейера импорта
//                 (после маппинга колонок, до сверки с базой)
// ==========================================

use crate::domain::types::{Availability, CatalogType, Condition};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// Product - каноническая запись товара
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,

    /// Стабильный идентификатор из учётной системы. Уникален, если задан.
    pub external_id: Option<String>,
    /// Артикул / кросс-номер. Уникален в пределах одного типа каталога.
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
    /// Строки вида `ключ: значение`, по одной на строку.
    pub characteristics: String,
    /// Перечень техники/двигателей через запятую, точку с запятой или перенос строки.
    pub applicability: String,
    /// Взаимозаменяемые номера через запятую.
    pub cross_numbers: String,

    pub catalog_type: CatalogType,

    /// Нераспознанные поля источника.
    pub properties: Map<String, Value>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Характеристики как пары (ключ, значение).
    pub fn characteristics_list(&self) -> Vec<(String, String)> {
        characteristics_pairs(&self.characteristics)
    }

    /// Кросс-номера как список токенов.
    pub fn cross_numbers_list(&self) -> Vec<String> {
        split_cross_numbers(&self.cross_numbers)
    }

    /// Применимость как список позиций.
    pub fn applicability_list(&self) -> Vec<String> {
        self.applicability
            .split(|c| c == ',' || c == ';' || c == '\n')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}

/// Разбор текстового поля характеристик в пары.
pub fn characteristics_pairs(text: &str) -> Vec<(String, String)> {
    let mut result = Vec::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                result.push((key.to_string(), value.trim().to_string()));
            }
        }
    }
    result
}

/// Разбор поля кросс-номеров в токены.
pub fn split_cross_numbers(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// ==========================================
// RawProductRecord - промежуточная структура импорта
// ==========================================
// Все поля опциональны: источники заполняют что могут,
// обогатитель добирает недостающее из наименования,
// движок сверки решает создать/обновить.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProductRecord {
    pub external_id: Option<String>,
    pub article: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category_name: Option<String>,

    pub price: Option<Decimal>,
    pub wholesale_price: Option<Decimal>,
    pub old_price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub availability: Option<Availability>,
    pub condition: Option<Condition>,

    pub short_description: Option<String>,
    pub description: Option<String>,
    /// Пары характеристик в порядке появления в источнике.
    pub characteristics: Vec<(String, String)>,
    /// Части применимости (двигатель, кузов, модель, разобранный суффикс имени).
    pub applicability: Vec<String>,
    /// Кросс-номера, включая OEM-номер из отдельной колонки или из имени.
    pub cross_numbers: Vec<String>,

    pub is_active: Option<bool>,

    /// Нераспознанные колонки источника.
    pub properties: Map<String, Value>,

    /// Номер строки исходного файла (для сообщений об ошибках).
    pub row_number: usize,
}

impl RawProductRecord {
    pub fn new(row_number: usize) -> Self {
        RawProductRecord {
            row_number,
            ..Default::default()
        }
    }

    /// Идентификатор записи для журнала ошибок:
    /// external_id, иначе артикул, иначе номер строки.
    pub fn identifier(&self) -> String {
        if let Some(id) = self.external_id.as_deref().filter(|s| !s.is_empty()) {
            return id.to_string();
        }
        if let Some(article) = self.article.as_deref().filter(|s| !s.is_empty()) {
            return article.to_string();
        }
        format!("строка {}", self.row_number)
    }

    pub fn push_characteristic(&mut self, key: &str, value: &str) {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return;
        }
        if !self
            .characteristics
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            self.characteristics.push((key.to_string(), value.to_string()));
        }
    }

    pub fn push_applicability(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if !self.applicability.iter().any(|v| v == value) {
            self.applicability.push(value.to_string());
        }
    }

    pub fn push_cross_number(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if !self
            .cross_numbers
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value))
        {
            self.cross_numbers.push(value.to_string());
        }
    }
}
