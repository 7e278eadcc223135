// ==========================================
// Каталог автозапчастей - каталог приёма файлов
// ==========================================
// Плоский каталог под настраиваемым корнем. Имена файлов
// берутся из протокола как есть, но разделители пути
// отклоняются. Протокол шлёт большие файлы кусками,
// поэтому запись ведётся дозаписью. Файл-спутник
// <имя>.processed помечает успешно импортированные файлы
// и пропускается при массовой переобработке.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Суффикс маркера обработанного файла.
pub const PROCESSED_SUFFIX: &str = ".processed";

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> ImportResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(StagingArea { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Проверка имени файла: без разделителей пути и переходов вверх.
    pub fn validate_filename(filename: &str) -> Result<(), String> {
        if filename.trim().is_empty() {
            return Err("не указано имя файла".to_string());
        }
        if filename.contains('/') || filename.contains('\\') {
            return Err("имя файла содержит разделители пути".to_string());
        }
        if filename == "." || filename == ".." || filename.contains("..") {
            return Err("недопустимое имя файла".to_string());
        }
        Ok(())
    }

    pub fn path_for(&self, filename: &str) -> ImportResult<PathBuf> {
        Self::validate_filename(filename)
            .map_err(|reason| ImportError::FileReadError(reason))?;
        Ok(self.root.join(filename))
    }

    /// Дозапись куска файла (протокол передаёт файл частями).
    pub fn append(&self, filename: &str, bytes: &[u8]) -> ImportResult<u64> {
        let path = self.path_for(filename)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file.metadata()?.len())
    }

    pub fn read(&self, filename: &str) -> ImportResult<Vec<u8>> {
        let path = self.path_for(filename)?;
        if !path.exists() {
            return Err(ImportError::FileNotFound(filename.to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    pub fn exists(&self, filename: &str) -> bool {
        Self::validate_filename(filename).is_ok() && self.root.join(filename).exists()
    }

    /// Пометить файл обработанным.
    pub fn mark_processed(&self, filename: &str) -> ImportResult<()> {
        let marker = self.root.join(format!("{filename}{PROCESSED_SUFFIX}"));
        std::fs::write(marker, b"processed")?;
        Ok(())
    }

    pub fn is_processed(&self, filename: &str) -> bool {
        self.root
            .join(format!("{filename}{PROCESSED_SUFFIX}"))
            .exists()
    }

    /// Распаковка принятого архива в каталог приёма.
    ///
    /// Вложенные пути сплющиваются до имени файла; каталоги
    /// и недопустимые имена пропускаются. Возвращает имена
    /// распакованных файлов.
    pub fn extract_zip_archive(&self, filename: &str) -> ImportResult<Vec<String>> {
        use std::io::Read;

        let bytes = self.read(filename)?;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ImportError::FileReadError(format!("архив повреждён: {e}")))?;

        let mut extracted = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ImportError::FileReadError(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let base_name = Path::new(entry.name())
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_string());
            let base_name = match base_name {
                Some(name) if Self::validate_filename(&name).is_ok() => name,
                _ => continue,
            };

            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            std::fs::write(self.root.join(&base_name), content)?;
            extracted.push(base_name);
        }
        Ok(extracted)
    }

    /// Файлы каталога приёма, пригодные к импорту
    /// (маркеры .processed не включаются).
    pub fn list_importable(&self) -> ImportResult<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.ends_with(PROCESSED_SUFFIX) {
                continue;
            }
            let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
            if matches!(ext.as_str(), "xml" | "csv" | "xlsx" | "xls" | "json") {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }
}
