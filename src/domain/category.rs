// ==========================================
// Каталог автозапчастей - категории
// ==========================================
// Дерево категорий: один родитель, без циклов.
// Slug - транслитерированное имя, уникален в пределах дерева.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub is_active: bool,
    pub order_no: i64,
    /// Ключевые слова для автоопределения категории (через запятую).
    pub keywords: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn keywords_list(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Транслитерация кириллицы и приведение к slug.
///
/// "Детали подвески" -> "detali-podveski"
pub fn transliterate_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        let mapped: &str = match ch {
            'а' => "a",
            'б' => "b",
            'в' => "v",
            'г' => "g",
            'д' => "d",
            'е' | 'ё' => "e",
            'ж' => "zh",
            'з' => "z",
            'и' => "i",
            'й' => "j",
            'к' => "k",
            'л' => "l",
            'м' => "m",
            'н' => "n",
            'о' => "o",
            'п' => "p",
            'р' => "r",
            'с' => "s",
            'т' => "t",
            'у' => "u",
            'ф' => "f",
            'х' => "h",
            'ц' => "c",
            'ч' => "ch",
            'ш' => "sh",
            'щ' => "shch",
            'ъ' | 'ь' => "",
            'ы' => "y",
            'э' => "e",
            'ю' => "yu",
            'я' => "ya",
            'a'..='z' | '0'..='9' => {
                out.push(ch);
                continue;
            }
            _ => "-",
        };
        out.push_str(mapped);
    }

    // Схлопываем повторные дефисы и обрезаем крайние
    let mut slug = String::with_capacity(out.len());
    let mut prev_dash = true;
    for ch in out.chars() {
        if ch == '-' {
            if !prev_dash {
                slug.push('-');
            }
            prev_dash = true;
        } else {
            slug.push(ch);
            prev_dash = false;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
