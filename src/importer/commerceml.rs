// ==========================================
// Каталог автозапчастей - парсер CommerceML 2
// ==========================================
// Обмен с учётной системой идёт двумя видами файлов:
//   import.xml - каталог (Каталог/Товары/Товар)
//   offers.xml - предложения (ПакетПредложений/Предложение):
//                только цены и остатки для уже известных товаров
// Пространство имён может отсутствовать или отличаться,
// поэтому поиск идёт по локальным именам элементов.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::normalize;
use crate::importer::raw::{RawRow, RawValue};
use roxmltree::{Document, Node};
use rust_decimal::Decimal;

/// Обновление из файла предложений: только цена и остаток.
#[derive(Debug, Clone)]
pub struct OfferUpdate {
    /// Ид товара (сопоставляется с external_id, затем с артикулом).
    pub external_id: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
}

/// Результат разбора документа CommerceML.
#[derive(Debug)]
pub enum CommerceMlDocument {
    Catalog(Vec<RawRow>),
    Offers(Vec<OfferUpdate>),
}

pub struct CommerceMlParser;

impl CommerceMlParser {
    pub fn parse(&self, text: &str) -> ImportResult<CommerceMlDocument> {
        let doc = Document::parse(text)
            .map_err(|e| ImportError::XmlParseError(e.to_string()))?;
        let root = doc.root_element();

        if find_descendant(&root, "ПакетПредложений").is_some() {
            return Ok(CommerceMlDocument::Offers(parse_offers(&root)));
        }

        let catalog = find_descendant(&root, "Каталог").ok_or_else(|| {
            ImportError::XmlParseError("каталог не найден в документе".to_string())
        })?;

        let mut rows = Vec::new();
        for (idx, product) in descendants_named(&catalog, "Товар").into_iter().enumerate() {
            if let Some(row) = parse_product(&root, &product, idx + 1) {
                rows.push(row);
            }
        }
        Ok(CommerceMlDocument::Catalog(rows))
    }
}

fn parse_product<'a>(root: &Node<'a, 'a>, product: &Node<'a, 'a>, number: usize) -> Option<RawRow> {
    let mut row = RawRow::new(number);

    // Ид: дочерний элемент либо атрибут
    let external_id = child_text(product, "Ид")
        .or_else(|| product.attribute("Ид").map(|s| s.trim().to_string()));
    if let Some(id) = external_id {
        row.push("Ид", RawValue::text(id));
    }

    for (tag, key) in [
        ("Артикул", "Артикул"),
        ("Наименование", "Наименование"),
        ("Описание", "Описание"),
    ] {
        if let Some(text) = child_text(product, tag) {
            row.push(key, RawValue::text(text));
        }
    }

    // Цена и остаток могут лежать на любом уровне вложенности
    if let Some(price) = descendant_text(product, "ЦенаЗаЕдиницу") {
        row.push("Цена", RawValue::text(price));
    }
    if let Some(quantity) = descendant_text(product, "Количество") {
        row.push("Количество", RawValue::text(quantity));
    }

    // Группы/Ид -> название группы из шапки документа
    if let Some(groups) = find_child(product, "Группы") {
        if let Some(group_id) = child_text(&groups, "Ид") {
            if let Some(name) = resolve_group_name(root, &group_id) {
                row.push("Группа", RawValue::text(name));
            }
        }
    }

    // ХарактеристикиТовара/ХарактеристикаТовара: Наименование + Значение.
    // Характеристика "марка"/"бренд" дополнительно даёт бренд.
    let mut lines = Vec::new();
    if let Some(container) = find_child(product, "ХарактеристикиТовара") {
        for item in container
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "ХарактеристикаТовара")
        {
            let name = child_text(&item, "Наименование").unwrap_or_default();
            let value = child_text(&item, "Значение").unwrap_or_default();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            if matches!(name.to_lowercase().as_str(), "марка" | "бренд" | "brand") {
                row.push("Марка", RawValue::text(value.clone()));
            }
            lines.push(format!("{name}: {value}"));
        }
    }

    // Старый формат: ЗначенияСвойств/ЗначенияСвойства (Ид + Значение)
    if lines.is_empty() {
        if let Some(container) = find_child(product, "ЗначенияСвойств") {
            for item in container
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "ЗначенияСвойства")
            {
                let name = child_text(&item, "Ид").unwrap_or_default();
                let value = child_text(&item, "Значение").unwrap_or_default();
                if !name.is_empty() && !value.is_empty() {
                    lines.push(format!("{name}: {value}"));
                }
            }
        }
    }
    if !lines.is_empty() {
        row.push("характеристики", RawValue::text(lines.join("\n")));
    }

    if row.is_empty() {
        None
    } else {
        Some(row)
    }
}

fn parse_offers(root: &Node) -> Vec<OfferUpdate> {
    let mut offers = Vec::new();
    for offer in descendants_named(root, "Предложение") {
        let external_id = match child_text(&offer, "Ид")
            .or_else(|| descendant_text(&offer, "Ид"))
        {
            Some(id) if !id.is_empty() => id,
            _ => continue,
        };
        let price = descendant_text(&offer, "ЦенаЗаЕдиницу")
            .and_then(|t| normalize::parse_decimal(&t));
        let quantity = descendant_text(&offer, "Количество")
            .and_then(|t| normalize::parse_quantity(&t));
        offers.push(OfferUpdate {
            external_id,
            price,
            quantity,
        });
    }
    offers
}

/// Название группы по её Ид: элемент Группа с атрибутом Ид
/// либо с дочерним элементом Ид.
fn resolve_group_name(root: &Node, group_id: &str) -> Option<String> {
    for group in descendants_named(root, "Группа") {
        let matches_attr = group.attribute("Ид").map(|v| v.trim() == group_id);
        let matches_child = child_text(&group, "Ид").map(|v| v == group_id);
        if matches_attr.unwrap_or(false) || matches_child.unwrap_or(false) {
            return child_text(&group, "Наименование");
        }
    }
    None
}

fn find_descendant<'a>(node: &Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn descendants_named<'a>(node: &Node<'a, 'a>, name: &str) -> Vec<Node<'a, 'a>> {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}

fn find_child<'a>(node: &Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &Node, name: &str) -> Option<String> {
    find_child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn descendant_text(node: &Node, name: &str) -> Option<String> {
    find_descendant(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const CATALOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<КоммерческаяИнформация xmlns="http://v8.1c.ru/8.3/commerceml" ВерсияСхемы="2.05">
  <Классификатор>
    <Группы>
      <Группа>
        <Ид>grp-1</Ид>
        <Наименование>Стартеры</Наименование>
      </Группа>
    </Группы>
  </Классификатор>
  <Каталог>
    <Товары>
      <Товар>
        <Ид>guid-1</Ид>
        <Артикул>ME220745</Артикул>
        <Наименование>Стартер MITSUBISHI ME220745</Наименование>
        <Группы><Ид>grp-1</Ид></Группы>
        <ХарактеристикиТовара>
          <ХарактеристикаТовара>
            <Наименование>Марка</Наименование>
            <Значение>Mitsubishi</Значение>
          </ХарактеристикаТовара>
          <ХарактеристикаТовара>
            <Наименование>Напряжение</Наименование>
            <Значение>24V</Значение>
          </ХарактеристикаТовара>
        </ХарактеристикиТовара>
      </Товар>
    </Товары>
  </Каталог>
</КоммерческаяИнформация>"#;

    #[test]
    fn test_parse_catalog_with_groups_and_characteristics() {
        let doc = CommerceMlParser.parse(CATALOG_XML).unwrap();
        let rows = match doc {
            CommerceMlDocument::Catalog(rows) => rows,
            _ => panic!("ожидался каталог"),
        };
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("Ид").unwrap().text, "guid-1");
        assert_eq!(row.get("Артикул").unwrap().text, "ME220745");
        assert_eq!(row.get("Группа").unwrap().text, "Стартеры");
        assert_eq!(row.get("Марка").unwrap().text, "Mitsubishi");
        assert!(row
            .get("характеристики")
            .unwrap()
            .text
            .contains("Напряжение: 24V"));
    }

    #[test]
    fn test_parse_offers_file() {
        let xml = r#"<КоммерческаяИнформация xmlns="http://v8.1c.ru/8.3/commerceml">
          <ПакетПредложений>
            <Предложения>
              <Предложение>
                <Ид>guid-1</Ид>
                <Цены><Цена><ЦенаЗаЕдиницу>15 500,00</ЦенаЗаЕдиницу></Цена></Цены>
                <Количество>3</Количество>
              </Предложение>
              <Предложение>
                <Ид>guid-2</Ид>
                <Количество>0</Количество>
              </Предложение>
            </Предложения>
          </ПакетПредложений>
        </КоммерческаяИнформация>"#;
        let doc = CommerceMlParser.parse(xml).unwrap();
        let offers = match doc {
            CommerceMlDocument::Offers(offers) => offers,
            _ => panic!("ожидались предложения"),
        };
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].external_id, "guid-1");
        assert_eq!(offers[0].price, Decimal::from_str("15500.00").ok());
        assert_eq!(offers[0].quantity, Some(3));
        assert_eq!(offers[1].quantity, Some(0));
        assert!(offers[1].price.is_none());
    }

    #[test]
    fn test_product_id_from_attribute() {
        let xml = r#"<root><Каталог><Товары>
          <Товар Ид="guid-9"><Наименование>Фильтр</Наименование></Товар>
        </Товары></Каталог></root>"#;
        let doc = CommerceMlParser.parse(xml).unwrap();
        if let CommerceMlDocument::Catalog(rows) = doc {
            assert_eq!(rows[0].get("Ид").unwrap().text, "guid-9");
        } else {
            panic!("ожидался каталог");
        }
    }

    #[test]
    fn test_missing_catalog_is_error() {
        let result = CommerceMlParser.parse("<root><ничего/></root>");
        assert!(result.is_err());
    }
}
