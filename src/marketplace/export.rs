// ==========================================
// Каталог автозапчастей - файлы выгрузки
// ==========================================
// Три формата с одинаковым набором из 17 колонок:
//   CSV  - UTF-8 с BOM, разделитель ';'
//   XLS  - книга с одним листом
//   XML  - <products><product>...</product></products>
// Колонки: Название, Цена, Описание, Артикул, Бренд,
// Состояние, Наличие, Характеристики, Применимость,
// Кросс-номера, Фото1..Фото5, Ссылка на сайт, Категория.
// ==========================================

use crate::domain::Product;
use crate::marketplace::SyncError;
use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;

/// Формат файла выгрузки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xls,
    Xml,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xls" | "xlsx" => Some(ExportFormat::Xls),
            "xml" => Some(ExportFormat::Xml),
            _ => None,
        }
    }
}

/// Готовый файл выгрузки.
pub struct ExportFile {
    pub content: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Контекст выгрузки: имена категорий и базовый адрес сайта.
pub struct ExportContext {
    pub category_names: HashMap<i64, String>,
    pub site_base_url: String,
}

const EXPORT_HEADERS: [&str; 17] = [
    "Название",
    "Цена",
    "Описание",
    "Артикул",
    "Бренд",
    "Состояние",
    "Наличие",
    "Характеристики",
    "Применимость",
    "Кросс-номера",
    "Фото1",
    "Фото2",
    "Фото3",
    "Фото4",
    "Фото5",
    "Ссылка на сайт",
    "Категория",
];

/// Сборка файла выгрузки в запрошенном формате.
pub fn render(
    products: &[Product],
    format: ExportFormat,
    context: &ExportContext,
) -> Result<ExportFile, SyncError> {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    match format {
        ExportFormat::Csv => {
            let content = render_csv(products, context)?;
            Ok(ExportFile {
                content,
                filename: format!("export_{stamp}.csv"),
                content_type: "text/csv; charset=utf-8".to_string(),
            })
        }
        ExportFormat::Xls => {
            let content = render_xls(products, context)?;
            Ok(ExportFile {
                content,
                filename: format!("export_{stamp}.xls"),
                content_type: "application/vnd.ms-excel".to_string(),
            })
        }
        ExportFormat::Xml => {
            let content = render_xml(products, context)?;
            Ok(ExportFile {
                content,
                filename: format!("export_{stamp}.xml"),
                content_type: "application/xml; charset=utf-8".to_string(),
            })
        }
    }
}

fn row_values(product: &Product, context: &ExportContext) -> [String; 17] {
    let category = product
        .category_id
        .and_then(|id| context.category_names.get(&id).cloned())
        .unwrap_or_default();
    let site_url = product_url(product, &context.site_base_url);
    let photos = photo_urls(product);

    [
        product.name.clone(),
        product.price.to_string(),
        product.description.clone(),
        product.article.clone(),
        product.brand.clone(),
        product.condition.display_ru().to_string(),
        product.availability.display_ru().to_string(),
        product.characteristics.clone(),
        product.applicability.clone(),
        product.cross_numbers.clone(),
        photos[0].clone(),
        photos[1].clone(),
        photos[2].clone(),
        photos[3].clone(),
        photos[4].clone(),
        site_url,
        category,
    ]
}

fn product_url(product: &Product, base: &str) -> String {
    if base.is_empty() {
        return String::new();
    }
    format!("{}/catalog/product/{}/", base.trim_end_matches('/'), product.id)
}

/// До пяти ссылок на фото из свойств товара (ключи Фото1..Фото5).
fn photo_urls(product: &Product) -> [String; 5] {
    let mut photos: [String; 5] = Default::default();
    for (i, slot) in photos.iter_mut().enumerate() {
        let key = format!("Фото{}", i + 1);
        if let Some(url) = product.properties.get(&key).and_then(|v| v.as_str()) {
            *slot = url.to_string();
        }
    }
    photos
}

fn render_csv(products: &[Product], context: &ExportContext) -> Result<Vec<u8>, SyncError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|e| SyncError::Render(e.to_string()))?;
    for product in products {
        writer
            .write_record(row_values(product, context))
            .map_err(|e| SyncError::Render(e.to_string()))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| SyncError::Render(e.to_string()))?;

    // UTF-8 BOM: принимающая сторона различает кодировку по нему
    let mut content = vec![0xEF, 0xBB, 0xBF];
    content.extend_from_slice(&body);
    Ok(content)
}

fn render_xls(products: &[Product], context: &ExportContext) -> Result<Vec<u8>, SyncError> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| SyncError::Render(e.to_string()))?;
    }
    for (row, product) in products.iter().enumerate() {
        let values = row_values(product, context);
        for (col, value) in values.iter().enumerate() {
            worksheet
                .write_string((row + 1) as u32, col as u16, value)
                .map_err(|e| SyncError::Render(e.to_string()))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| SyncError::Render(e.to_string()))
}

fn render_xml(products: &[Product], context: &ExportContext) -> Result<Vec<u8>, SyncError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| SyncError::Render(e.to_string()))?;
    write_start(&mut writer, "products")?;

    for product in products {
        write_start(&mut writer, "product")?;

        write_text_element(&mut writer, "title", &product.name)?;
        write_text_element(&mut writer, "price", &product.price.to_string())?;
        write_text_element(&mut writer, "description", &product.description)?;
        write_text_element(&mut writer, "article", &product.article)?;
        write_text_element(&mut writer, "brand", &product.brand)?;
        write_text_element(&mut writer, "condition", product.condition.display_ru())?;
        write_text_element(&mut writer, "availability", product.availability.display_ru())?;

        let characteristics = product.characteristics_list();
        if !characteristics.is_empty() {
            write_start(&mut writer, "characteristics")?;
            for (name, value) in characteristics {
                write_start(&mut writer, "characteristic")?;
                write_text_element(&mut writer, "name", &name)?;
                write_text_element(&mut writer, "value", &value)?;
                write_end(&mut writer, "characteristic")?;
            }
            write_end(&mut writer, "characteristics")?;
        }

        if !product.applicability.is_empty() {
            write_text_element(&mut writer, "applicability", &product.applicability)?;
        }
        if !product.cross_numbers.is_empty() {
            write_text_element(&mut writer, "cross_numbers", &product.cross_numbers)?;
        }

        let photos = photo_urls(product);
        if photos.iter().any(|p| !p.is_empty()) {
            write_start(&mut writer, "photos")?;
            for photo in photos.iter().filter(|p| !p.is_empty()) {
                write_text_element(&mut writer, "photo", photo)?;
            }
            write_end(&mut writer, "photos")?;
        }

        write_text_element(
            &mut writer,
            "site_url",
            &product_url(product, &context.site_base_url),
        )?;
        let category = product
            .category_id
            .and_then(|id| context.category_names.get(&id).cloned())
            .unwrap_or_default();
        if !category.is_empty() {
            write_text_element(&mut writer, "category", &category)?;
        }

        write_end(&mut writer, "product")?;
    }

    write_end(&mut writer, "products")?;
    Ok(writer.into_inner())
}

fn write_start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), SyncError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| SyncError::Render(e.to_string()))
}

fn write_end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), SyncError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| SyncError::Render(e.to_string()))
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), SyncError> {
    write_start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| SyncError::Render(e.to_string()))?;
    write_end(writer, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Availability, CatalogType, Condition};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn product() -> Product {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "Фото1".to_string(),
            serde_json::Value::String("https://example.ru/p/1.jpg".to_string()),
        );
        Product {
            id: 7,
            external_id: Some("guid-1".to_string()),
            article: "ME220745".to_string(),
            name: "Стартер MITSUBISHI ME220745".to_string(),
            brand: "Mitsubishi".to_string(),
            category_id: Some(3),
            price: Decimal::from_str("15000.00").unwrap(),
            wholesale_price: None,
            old_price: None,
            quantity: 2,
            availability: Availability::InStock,
            condition: Condition::New,
            short_description: String::new(),
            description: "Новый оригинальный стартер".to_string(),
            characteristics: "Напряжение: 24V".to_string(),
            applicability: "Canter, Fuso".to_string(),
            cross_numbers: "M008T60271".to_string(),
            catalog_type: CatalogType::Retail,
            properties,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn context() -> ExportContext {
        let mut category_names = HashMap::new();
        category_names.insert(3i64, "Стартеры".to_string());
        ExportContext {
            category_names,
            site_base_url: "https://parts.example.ru".to_string(),
        }
    }

    #[test]
    fn test_csv_has_bom_and_17_columns() {
        let file = render(&[product()], ExportFormat::Csv, &context()).unwrap();
        assert!(file.content.starts_with(&[0xEF, 0xBB, 0xBF]));
        let text = String::from_utf8(file.content[3..].to_vec()).unwrap();
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line.split(';').count(), 17);
        assert!(text.contains("ME220745"));
        assert!(file.filename.ends_with(".csv"));
    }

    #[test]
    fn test_xml_structure() {
        let file = render(&[product()], ExportFormat::Xml, &context()).unwrap();
        let text = String::from_utf8(file.content).unwrap();
        assert!(text.contains("<products>"));
        assert!(text.contains("<product>"));
        assert!(text.contains("<article>ME220745</article>"));
        assert!(text.contains("<category>Стартеры</category>"));
        assert!(text.contains("<photo>https://example.ru/p/1.jpg</photo>"));
    }

    #[test]
    fn test_xls_is_zip_workbook() {
        let file = render(&[product()], ExportFormat::Xls, &context()).unwrap();
        // книга пишется контейнером zip
        assert!(file.content.starts_with(b"PK"));
        assert!(file.filename.ends_with(".xls"));
    }

    #[test]
    fn test_csv_roundtrip_field_equal() {
        use crate::importer::pipeline::{ParsedPayload, ProductImporter};
        use crate::importer::raw::SourceFormat;

        let source = product();
        let file = render(
            &[source.clone()],
            ExportFormat::Csv,
            &context(),
        )
        .unwrap();

        let payload =
            ProductImporter::parse_payload(&file.content, SourceFormat::Csv).unwrap();
        let records = match payload {
            ParsedPayload::Records(records) => records,
            _ => panic!("ожидались записи"),
        };
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name.as_deref(), Some(source.name.as_str()));
        assert_eq!(record.article.as_deref(), Some(source.article.as_str()));
        assert_eq!(record.brand.as_deref(), Some(source.brand.as_str()));
        assert_eq!(record.price, Some(source.price));
        assert_eq!(record.condition, Some(source.condition));
        assert_eq!(
            record.characteristics,
            vec![("Напряжение".to_string(), "24V".to_string())]
        );
        assert_eq!(record.cross_numbers, vec!["M008T60271".to_string()]);
        assert_eq!(record.applicability, vec!["Canter", "Fuso"]);
    }

    #[test]
    fn test_xml_roundtrip_field_equal() {
        use crate::importer::pipeline::{ParsedPayload, ProductImporter};
        use crate::importer::raw::SourceFormat;

        let source = product();
        let file = render(&[source.clone()], ExportFormat::Xml, &context()).unwrap();

        let payload =
            ProductImporter::parse_payload(&file.content, SourceFormat::Xml).unwrap();
        let records = match payload {
            ParsedPayload::Records(records) => records,
            _ => panic!("ожидались записи"),
        };
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name.as_deref(), Some(source.name.as_str()));
        assert_eq!(record.article.as_deref(), Some(source.article.as_str()));
        assert_eq!(record.price, Some(source.price));
        assert_eq!(
            record.characteristics,
            vec![("Напряжение".to_string(), "24V".to_string())]
        );
    }
}
