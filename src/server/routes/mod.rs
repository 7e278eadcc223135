// ==========================================
// Каталог автозапчастей - маршруты HTTP
// ==========================================

pub mod api_sync;
pub mod exchange;
pub mod marketplace_sync;
