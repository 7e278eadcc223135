// ==========================================
// Каталог автозапчастей - импорт принятых файлов
// ==========================================
// Обрабатывает файлы каталога приёма, оставленные
// протоколом обмена. Успешно импортированные файлы
// помечаются маркером .processed и при повторном
// запуске пропускаются.
//
//   process-staged-files              - все необработанные
//   process-staged-files --all        - все, включая обработанные
//   process-staged-files --file NAME  - один конкретный файл
//
// Код возврата: 0 - успех, 1 - хотя бы один файл с ошибкой.
// ==========================================

use anyhow::Context;
use autoparts_sync::domain::types::OperationType;
use autoparts_sync::importer::ImportRequest;
use autoparts_sync::{config::AppConfig, logging, AppState};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "process-staged-files")]
#[command(about = "Импорт файлов из каталога приёма обмена")]
struct Args {
    /// Обработать все файлы, включая уже помеченные .processed
    #[arg(long)]
    all: bool,

    /// Обработать один конкретный файл
    #[arg(long)]
    file: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let config = AppConfig::from_env().context("ошибка конфигурации")?;
    let state = AppState::initialize(config).context("не удалось инициализировать состояние")?;

    let filenames: Vec<String> = match &args.file {
        Some(name) => {
            if !state.staging.exists(name) {
                anyhow::bail!("файл не найден в каталоге приёма: {name}");
            }
            vec![name.clone()]
        }
        None => state
            .staging
            .list_importable()
            .context("не удалось прочитать каталог приёма")?,
    };

    if filenames.is_empty() {
        println!("Файлы для импорта не найдены");
        return Ok(());
    }

    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for filename in &filenames {
        // маркеры учитываются только при массовом проходе
        if args.file.is_none() && !args.all && state.staging.is_processed(filename) {
            println!("Пропуск уже обработанного файла: {filename}");
            skipped += 1;
            continue;
        }

        println!("Обработка файла: {filename}...");
        let mut request = ImportRequest::new(OperationType::FileUpload);
        request.filename = Some(filename.clone());

        let path = state.staging.root().join(filename);
        match state.importer.import_staged_file(&path, &request) {
            Ok(report) => {
                processed += 1;
                state
                    .staging
                    .mark_processed(filename)
                    .with_context(|| format!("не удалось пометить файл {filename}"))?;
                println!(
                    "  обработано {} (создано: {}, обновлено: {}, ошибок: {})",
                    report.outcome.total,
                    report.outcome.created,
                    report.outcome.updated,
                    report.outcome.errors.len()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("  ошибка: {e}");
            }
        }
    }

    println!("============================================================");
    println!("Обработано файлов: {processed}");
    if skipped > 0 {
        println!("Пропущено: {skipped}");
    }
    if failed > 0 {
        eprintln!("С ошибками: {failed}");
        std::process::exit(1);
    }
    Ok(())
}
