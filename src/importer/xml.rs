// ==========================================
// Каталог автозапчастей - универсальный XML парсер
// ==========================================
// Принимает любой корень, товары ищутся по локальным
// именам <product> | <item> | <Товар>. Определение
// разновидности: документы с каталогом в пространстве
// имён CommerceML уходят в профильный парсер.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::raw::{RawRow, RawValue};
use roxmltree::{Document, Node};

/// Пространство имён CommerceML.
pub const COMMERCEML_NS: &str = "http://v8.1c.ru/8.3/commerceml";

/// Относится ли документ к CommerceML.
pub fn is_commerceml(text: &str) -> bool {
    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(_) => return false,
    };
    doc.descendants().any(|node| {
        node.is_element()
            && (node
                .tag_name()
                .namespace()
                .map(|ns| ns.contains("commerceml"))
                .unwrap_or(false)
                || matches!(
                    node.tag_name().name(),
                    "КоммерческаяИнформация" | "Каталог" | "ПакетПредложений"
                ))
    })
}

pub struct XmlParser;

impl XmlParser {
    pub fn parse(&self, text: &str) -> ImportResult<Vec<RawRow>> {
        let doc = Document::parse(text)
            .map_err(|e| ImportError::XmlParseError(e.to_string()))?;

        let mut rows = Vec::new();
        for (idx, node) in doc
            .descendants()
            .filter(|n| n.is_element() && is_product_element(n))
            .enumerate()
        {
            let mut row = RawRow::new(idx + 1);
            for child in node.children().filter(|n| n.is_element()) {
                let key = child.tag_name().name();
                if is_characteristics_container(key) {
                    if let Some(blob) = characteristics_blob(&child) {
                        row.push("характеристики", RawValue::text(blob));
                    }
                    continue;
                }
                let text = element_text(&child);
                if !text.is_empty() {
                    row.push(key, RawValue::text(text));
                }
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

fn is_product_element(node: &Node) -> bool {
    matches!(node.tag_name().name(), "product" | "item" | "Товар" | "товар")
}

fn is_characteristics_container(name: &str) -> bool {
    matches!(name, "characteristics" | "характеристики" | "Характеристики")
}

fn element_text(node: &Node) -> String {
    node.text().map(|t| t.trim().to_string()).unwrap_or_default()
}

/// Вложенные характеристики вида
/// <characteristic><name>..</name><value>..</value></characteristic>
/// склеиваются в блок "ключ: значение".
fn characteristics_blob(container: &Node) -> Option<String> {
    let mut lines = Vec::new();
    for item in container.children().filter(|n| n.is_element()) {
        let mut name = None;
        let mut value = None;
        for field in item.children().filter(|n| n.is_element()) {
            match field.tag_name().name() {
                "name" | "название" | "Наименование" => name = Some(element_text(&field)),
                "value" | "значение" | "Значение" => value = Some(element_text(&field)),
                _ => {}
            }
        }
        if let (Some(name), Some(value)) = (name, value) {
            if !name.is_empty() && !value.is_empty() {
                lines.push(format!("{name}: {value}"));
            }
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic_products() {
        let xml = r#"<catalog>
            <product>
                <sku>ME220745</sku>
                <name>Стартер MITSUBISHI</name>
                <price>15000</price>
                <stock>2</stock>
            </product>
            <product>
                <sku>332120</sku>
                <name>Амортизатор</name>
            </product>
        </catalog>"#;
        let rows = XmlParser.parse(xml).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("sku").unwrap().text, "ME220745");
        assert_eq!(rows[0].get("price").unwrap().text, "15000");
    }

    #[test]
    fn test_parse_russian_product_elements() {
        let xml = r#"<root><Товар>
            <Артикул>48510-B1020</Артикул>
            <Наименование>Амортизатор DAIHATSU</Наименование>
            <Цена>3 500,00</Цена>
        </Товар></root>"#;
        let rows = XmlParser.parse(xml).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Артикул").unwrap().text, "48510-B1020");
    }

    #[test]
    fn test_parse_nested_characteristics() {
        let xml = r#"<items><item>
            <name>Свеча</name>
            <characteristics>
                <characteristic><name>Напряжение</name><value>12V</value></characteristic>
                <characteristic><name>Материал</name><value>IRIDIUM</value></characteristic>
            </characteristics>
        </item></items>"#;
        let rows = XmlParser.parse(xml).unwrap();
        assert_eq!(
            rows[0].get("характеристики").unwrap().text,
            "Напряжение: 12V\nМатериал: IRIDIUM"
        );
    }

    #[test]
    fn test_is_commerceml_by_namespace() {
        let xml = r#"<КоммерческаяИнформация xmlns="http://v8.1c.ru/8.3/commerceml">
            <Каталог/></КоммерческаяИнформация>"#;
        assert!(is_commerceml(xml));
        assert!(!is_commerceml("<catalog><product/></catalog>"));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(XmlParser.parse("<broken").is_err());
    }
}
