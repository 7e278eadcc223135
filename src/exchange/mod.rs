// ==========================================
// Каталог автозапчастей - протокол обмена
// ==========================================
// Состояние сеансов и каталог приёма файлов четырёхфазного
// протокола (checkauth -> init -> file -> import).
// HTTP-обработчики живут в server::routes::exchange.
// ==========================================

pub mod session;
pub mod staging;

pub use session::{SessionCache, SESSION_COOKIE_NAME};
pub use staging::{StagingArea, PROCESSED_SUFFIX};
