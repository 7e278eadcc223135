// ==========================================
// Каталог автозапчастей - восстановление дерева категорий
// ==========================================
// Чинит инварианты дерева после ручных правок справочника:
// осиротевшие parent_id, пустые и дублирующиеся slug.
// ==========================================

use anyhow::Context;
use autoparts_sync::{config::AppConfig, logging, AppState};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rebuild-categories")]
#[command(about = "Восстановление инвариантов дерева категорий")]
struct Args {}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();
    let _args = Args::parse();

    let config = AppConfig::from_env().context("ошибка конфигурации")?;
    let state = AppState::initialize(config).context("не удалось инициализировать состояние")?;

    println!("Перестроение дерева категорий...");
    let (orphans_fixed, slugs_fixed) = state
        .categories
        .rebuild_tree()
        .context("не удалось перестроить дерево")?;

    let total = state.categories.count_all().context("не удалось посчитать категории")?;
    let roots = state.categories.list_roots().context("не удалось прочитать корни")?;

    println!("Дерево категорий перестроено");
    println!("  всего категорий: {total}");
    println!("  корневых: {}", roots.len());
    println!("  исправлено родителей: {orphans_fixed}");
    println!("  перегенерировано slug: {slugs_fixed}");

    println!("Корневые категории:");
    for (i, category) in roots.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, category.name, category.slug);
    }
    Ok(())
}
