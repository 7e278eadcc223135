// ==========================================
// Каталог автозапчастей - сверка с хранилищем
// ==========================================

pub mod engine;

pub use engine::{
    merge_characteristics, merge_cross_numbers, BatchOutcome, ReconcileEngine, ReconcileOptions,
};
