// ==========================================
// Каталог автозапчастей - слой хранения
// ==========================================

pub mod category_repo;
pub mod error;
pub mod product_repo;
pub mod settings_repo;
pub mod sync_log_repo;

pub use category_repo::CategoryRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use product_repo::{NewProduct, ProductRepository};
pub use settings_repo::{MarketplaceSettings, SettingsRepository};
pub use sync_log_repo::SyncLogRepository;
