// ==========================================
// Каталог автозапчастей - парсер JSON
// ==========================================
// Принимаемые формы:
//   [ {...}, {...} ]
//   { "products": [...] }
//   { "items": [...] }
//   { ... }            - одиночный товар
// Ключи объектов сохраняются как имена колонок;
// маппинг на канонические поля - отдельный шаг.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::raw::{RawRow, RawValue};
use serde_json::Value;

pub struct JsonParser;

impl JsonParser {
    pub fn parse(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let text = String::from_utf8_lossy(bytes);
        let data: Value = serde_json::from_str(&text)?;

        let items: Vec<Value> = match data {
            Value::Array(items) => items,
            Value::Object(ref map) => {
                if let Some(Value::Array(items)) = map.get("products") {
                    items.clone()
                } else if let Some(Value::Array(items)) = map.get("items") {
                    items.clone()
                } else if let Some(Value::Array(items)) = map.get("товары") {
                    items.clone()
                } else {
                    vec![data.clone()]
                }
            }
            _ => {
                return Err(ImportError::JsonParseError(
                    "ожидается объект или массив".to_string(),
                ))
            }
        };

        let mut rows = Vec::new();
        for (idx, item) in items.into_iter().enumerate() {
            let object = match item {
                Value::Object(map) => map,
                _ => continue,
            };
            let mut row = RawRow::new(idx + 1);
            for (key, value) in object {
                append_value(&mut row, &key, value);
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

fn append_value(row: &mut RawRow, key: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => row.push(key, RawValue::text(s)),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                row.push(key, RawValue::number(f));
            }
        }
        Value::Bool(b) => row.push(key, RawValue::text(if b { "1" } else { "0" })),
        Value::Array(items) => {
            // Характеристики как массив пар {name, value}
            // склеиваются в блок "ключ: значение"
            let pairs: Vec<(String, String)> = items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    let name = obj.get("name").or_else(|| obj.get("название"))?.as_str()?;
                    let value = obj.get("value").or_else(|| obj.get("значение"))?;
                    Some((name.to_string(), value_to_text(value)))
                })
                .collect();
            if !pairs.is_empty() && pairs.len() == items.len() {
                let blob = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                row.push(key, RawValue::text(blob));
            } else {
                let joined = items
                    .iter()
                    .map(value_to_text)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                row.push(key, RawValue::text(joined));
            }
        }
        Value::Object(map) => {
            // Вложенный объект разворачивается в отдельные колонки
            for (inner_key, inner_value) in map {
                append_value(row, &inner_key, inner_value);
            }
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_products_wrapper() {
        let json = r#"{"products": [
            {"external_id": "guid-1", "name": "Стартер", "price": 15000, "quantity": 2},
            {"external_id": "guid-2", "name": "Генератор", "price": "12 500,00"}
        ]}"#;
        let rows = JsonParser.parse(json.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("external_id").unwrap().text, "guid-1");
        assert_eq!(rows[0].get("price").unwrap().number, Some(15000.0));
        assert_eq!(rows[1].get("price").unwrap().text, "12 500,00");
    }

    #[test]
    fn test_parse_bare_array_and_single_object() {
        let rows = JsonParser
            .parse(br#"[{"name": "A"}, {"name": "B"}]"#)
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = JsonParser.parse(r#"{"name": "Одиночный"}"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").unwrap().text, "Одиночный");
    }

    #[test]
    fn test_parse_items_wrapper() {
        let rows = JsonParser
            .parse(br#"{"items": [{"sku": "1"}]}"#)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_characteristics_array_to_blob() {
        let json = r#"[{"name": "Свеча", "характеристики": [
            {"name": "Напряжение", "value": "12V"},
            {"name": "Материал", "value": "IRIDIUM"}
        ]}]"#;
        let rows = JsonParser.parse(json.as_bytes()).unwrap();
        assert_eq!(
            rows[0].get("характеристики").unwrap().text,
            "Напряжение: 12V\nМатериал: IRIDIUM"
        );
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(JsonParser.parse(b"{not json").is_err());
        assert!(JsonParser.parse(b"\"just a string\"").is_err());
    }
}
