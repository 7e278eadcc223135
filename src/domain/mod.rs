// ==========================================
// Каталог автозапчастей - доменный слой
// ==========================================

pub mod category;
pub mod product;
pub mod sync_log;
pub mod types;

pub use category::{transliterate_slug, Category};
pub use product::{characteristics_pairs, split_cross_numbers, Product, RawProductRecord};
pub use sync_log::{NewSyncLog, SyncErrorEntry, SyncLog, MAX_LOGGED_ERRORS, MAX_REPORTED_ERRORS};
pub use types::{Availability, CatalogType, Condition, OperationType, SyncStatus};
