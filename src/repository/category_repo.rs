// ==========================================
// Каталог автозапчастей - репозиторий категорий
// ==========================================
// Дерево хранится плоско: (id, parent_id, order_no).
// Потомки - обход в глубину по parent_id.
// Корневые категории фиксированы; подкатегории
// создаются по мере необходимости.
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{transliterate_slug, Category};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::MutexGuard;

pub struct CategoryRepository {
    conn: SharedConnection,
}

const CATEGORY_COLUMNS: &str =
    "id, name, slug, parent_id, is_active, order_no, keywords, created_at, updated_at";

impl CategoryRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Корневая категория по имени (без учёта регистра).
    pub fn find_root_by_name(&self, name: &str) -> RepositoryResult<Option<Category>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE parent_id IS NULL AND name = ?1 COLLATE NOCASE LIMIT 1"
        ))?;
        query_optional(&mut stmt, params![name])
    }

    /// Дочерняя категория по имени (без учёта регистра).
    pub fn find_child_by_name(
        &self,
        parent_id: i64,
        name: &str,
    ) -> RepositoryResult<Option<Category>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE parent_id = ?1 AND name = ?2 COLLATE NOCASE LIMIT 1"
        ))?;
        query_optional(&mut stmt, params![parent_id, name])
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Category>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"
        ))?;
        query_optional(&mut stmt, params![id])
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Category>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY order_no, name"
        ))?;
        let rows = stmt.query_map([], map_category_row)?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    pub fn list_roots(&self) -> RepositoryResult<Vec<Category>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE parent_id IS NULL ORDER BY order_no, name"
        ))?;
        let rows = stmt.query_map([], map_category_row)?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Создание категории; slug выводится из имени и достраивается
    /// суффиксом до уникальности.
    pub fn create(
        &self,
        name: &str,
        parent_id: Option<i64>,
        keywords: &str,
    ) -> RepositoryResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "name".to_string(),
                message: "пустое имя категории".to_string(),
            });
        }
        let slug = {
            let conn = self.get_conn()?;
            unique_slug(&conn, name)?
        };
        let now = Utc::now().to_rfc3339();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO categories (name, slug, parent_id, is_active, order_no, keywords, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 1, 0, ?4, ?5, ?5)",
            params![name, slug, parent_id, keywords, now],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.find_by_id(id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Category".to_string(),
            id: id.to_string(),
        })
    }

    /// Найти или создать подкатегорию под существующим корнем.
    pub fn get_or_create_child(&self, parent_id: i64, name: &str) -> RepositoryResult<Category> {
        if let Some(existing) = self.find_child_by_name(parent_id, name)? {
            return Ok(existing);
        }
        self.create(name, Some(parent_id), "")
    }

    /// Гарантировать существование корневых категорий с ключевыми словами.
    pub fn ensure_roots(&self, roots: &[(String, String)]) -> RepositoryResult<()> {
        for (order_no, (name, keywords)) in roots.iter().enumerate() {
            match self.find_root_by_name(name)? {
                Some(existing) => {
                    // Ключевые слова справочника обновляются из таблиц обогащения
                    // только если в базе они пустые.
                    if existing.keywords.trim().is_empty() && !keywords.trim().is_empty() {
                        let conn = self.get_conn()?;
                        conn.execute(
                            "UPDATE categories SET keywords = ?1, updated_at = ?2 WHERE id = ?3",
                            params![keywords, Utc::now().to_rfc3339(), existing.id],
                        )?;
                    }
                }
                None => {
                    let category = self.create(name, None, keywords)?;
                    let conn = self.get_conn()?;
                    conn.execute(
                        "UPDATE categories SET order_no = ?1 WHERE id = ?2",
                        params![order_no as i64, category.id],
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Потомки категории (обход в глубину), включая её саму.
    pub fn descendants(&self, id: i64) -> RepositoryResult<Vec<Category>> {
        let all = self.list_all()?;
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(cat) = all.iter().find(|c| c.id == current) {
                result.push(cat.clone());
            }
            for child in all.iter().filter(|c| c.parent_id == Some(current)) {
                stack.push(child.id);
            }
        }
        Ok(result)
    }

    /// Восстановление инвариантов дерева:
    /// - осиротевшие parent_id сбрасываются в NULL,
    /// - пустые/дублирующиеся slug перегенерируются.
    ///
    /// Возвращает (исправлено родителей, перегенерировано slug).
    pub fn rebuild_tree(&self) -> RepositoryResult<(usize, usize)> {
        let all = self.list_all()?;
        let ids: std::collections::HashSet<i64> = all.iter().map(|c| c.id).collect();

        let mut orphans_fixed = 0usize;
        {
            let conn = self.get_conn()?;
            for category in &all {
                if let Some(parent_id) = category.parent_id {
                    if !ids.contains(&parent_id) || parent_id == category.id {
                        conn.execute(
                            "UPDATE categories SET parent_id = NULL, updated_at = ?1 WHERE id = ?2",
                            params![Utc::now().to_rfc3339(), category.id],
                        )?;
                        orphans_fixed += 1;
                    }
                }
            }
        }

        let mut slugs_fixed = 0usize;
        let mut seen = std::collections::HashSet::new();
        for category in &all {
            let expected_base = transliterate_slug(&category.name);
            let needs_new = category.slug.is_empty()
                || !seen.insert(category.slug.to_lowercase())
                || (!expected_base.is_empty() && !category.slug.starts_with(&expected_base));
            if needs_new {
                let conn = self.get_conn()?;
                let slug = unique_slug(&conn, &category.name)?;
                conn.execute(
                    "UPDATE categories SET slug = ?1, updated_at = ?2 WHERE id = ?3",
                    params![slug.clone(), Utc::now().to_rfc3339(), category.id],
                )?;
                seen.insert(slug.to_lowercase());
                slugs_fixed += 1;
            }
        }

        Ok((orphans_fixed, slugs_fixed))
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn query_optional(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> RepositoryResult<Option<Category>> {
    match stmt.query_row(params, map_category_row) {
        Ok(category) => Ok(Some(category)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn unique_slug(conn: &Connection, name: &str) -> RepositoryResult<String> {
    let base = {
        let s = transliterate_slug(name);
        if s.is_empty() {
            "category".to_string()
        } else {
            s
        }
    };
    let mut slug = base.clone();
    let mut counter = 1;
    loop {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM categories WHERE slug = ?1 LIMIT 1",
                params![slug],
                |_| Ok(true),
            )
            .map(|_| true)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(RepositoryError::from(other)),
            })?;
        if !exists {
            return Ok(slug);
        }
        slug = format!("{base}-{counter}");
        counter += 1;
    }
}

fn map_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        parent_id: row.get(3)?,
        is_active: row.get(4)?,
        order_no: row.get(5)?,
        keywords: row.get(6)?,
        created_at: parse_timestamp(row.get::<_, String>(7)?),
        updated_at: parse_timestamp(row.get::<_, String>(8)?),
    })
}

fn parse_timestamp(text: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
