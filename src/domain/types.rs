// ==========================================
// Каталог автозапчастей - базовые типы домена
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Availability - наличие товара
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    Order,
    OutOfStock,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::Order => "order",
            Availability::OutOfStock => "out_of_stock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "in_stock" | "в наличии" => Some(Availability::InStock),
            "order" | "под заказ" => Some(Availability::Order),
            "out_of_stock" | "нет в наличии" => Some(Availability::OutOfStock),
            _ => None,
        }
    }

    /// Наличие, выводимое из остатка. Инвариант: out_of_stock ⇔ quantity == 0.
    pub fn derive(quantity: i64, explicit: Option<Availability>) -> Self {
        if quantity == 0 {
            Availability::OutOfStock
        } else {
            match explicit {
                Some(Availability::Order) => Availability::Order,
                _ => Availability::InStock,
            }
        }
    }

    /// Отображаемое название (для выгрузок).
    pub fn display_ru(&self) -> &'static str {
        match self {
            Availability::InStock => "В наличии",
            Availability::Order => "Под заказ",
            Availability::OutOfStock => "Нет в наличии",
        }
    }
}

// ==========================================
// Condition - состояние товара
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "да" | "новый" | "new" | "yes" | "1" | "true" => Some(Condition::New),
            "нет" | "б/у" | "бу" | "used" | "no" | "0" | "false" => Some(Condition::Used),
            _ => None,
        }
    }

    pub fn display_ru(&self) -> &'static str {
        match self {
            Condition::New => "Новый",
            Condition::Used => "Б/У",
        }
    }
}

// ==========================================
// CatalogType - тип каталога
// ==========================================
// Розничный и партнёрский каталоги не пересекаются:
// поиск по артикулу всегда ограничен одним типом.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogType {
    Retail,
    Wholesale,
}

impl CatalogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Retail => "retail",
            CatalogType::Wholesale => "wholesale",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "retail" => Some(CatalogType::Retail),
            "wholesale" => Some(CatalogType::Wholesale),
            _ => None,
        }
    }
}

// ==========================================
// OperationType / SyncStatus - журнал синхронизации
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    FileUpload,
    ApiSync,
    ExchangeSession,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::FileUpload => "file_upload",
            OperationType::ApiSync => "api_sync",
            OperationType::ExchangeSession => "exchange_session",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file_upload" => Some(OperationType::FileUpload),
            "api_sync" => Some(OperationType::ApiSync),
            "exchange_session" => Some(OperationType::ExchangeSession),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Partial,
    Error,
    Unauthorized,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Error => "error",
            SyncStatus::Unauthorized => "unauthorized",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(SyncStatus::Success),
            "partial" => Some(SyncStatus::Partial),
            "error" => Some(SyncStatus::Error),
            "unauthorized" => Some(SyncStatus::Unauthorized),
            _ => None,
        }
    }
}
