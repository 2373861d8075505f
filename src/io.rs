//! Bulk loading and saving of the flat, semicolon-delimited record lists.
//!
//! A malformed line is never fatal: it is logged and skipped, and the rest
//! of the file still loads. Only real I/O failures surface as errors.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::model::{parse_price, Product, Sale};
use crate::Catalog;

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Loads `ARTICLE;NAME;PRICE` lines into the catalog. Duplicate articles
/// count as skipped.
pub fn import_products(path: &Path, catalog: &mut Catalog) -> Result<ImportReport> {
    let mut reader = reader(path)?;
    let mut report = ImportReport::default();
    for (line, record) in reader.records().enumerate() {
        let line = line + 1;
        let parsed = record
            .map_err(EngineError::from)
            .and_then(|record| parse_product(&record));
        match parsed {
            Ok(product) => {
                if catalog.add_product(product) {
                    report.imported += 1;
                } else {
                    warn!(path = %path.display(), line, "duplicate article, line skipped");
                    report.skipped += 1;
                }
            }
            Err(err) => {
                warn!(path = %path.display(), line, %err, "malformed product line skipped");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Loads `ARTICLE;COUNT;CASHIER;DATE` lines into the catalog.
pub fn import_sales(path: &Path, catalog: &mut Catalog) -> Result<ImportReport> {
    let mut reader = reader(path)?;
    let mut report = ImportReport::default();
    for (line, record) in reader.records().enumerate() {
        let line = line + 1;
        let parsed = record
            .map_err(EngineError::from)
            .and_then(|record| parse_sale(&record));
        match parsed {
            Ok(sale) => {
                catalog.add_sale(sale);
                report.imported += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), line, %err, "malformed sale line skipped");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Writes every product, one line per record, in insertion order.
pub fn export_products(path: &Path, catalog: &Catalog) -> Result<()> {
    let mut writer = writer(path)?;
    for product in catalog.products().iter() {
        writer.write_record([
            product.article.to_string(),
            product.name.clone(),
            product.price.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes every sale, one line per record, in insertion order.
pub fn export_sales(path: &Path, catalog: &Catalog) -> Result<()> {
    let mut writer = writer(path)?;
    for sale in catalog.sales().iter() {
        writer.write_record([
            sale.article.to_string(),
            sale.count.to_string(),
            sale.cashier.clone(),
            sale.date.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    Ok(WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?)
}

fn parse_product(record: &StringRecord) -> Result<Product> {
    if record.len() != 3 {
        return Err(EngineError::InvalidRecord(format!(
            "expected ARTICLE;NAME;PRICE, got {} fields",
            record.len()
        )));
    }
    let article = record[0].parse()?;
    let name = record[1].trim();
    if name.is_empty() {
        return Err(EngineError::InvalidRecord("empty product name".into()));
    }
    let price = parse_price(&record[2])?;
    Ok(Product::new(article, name, price))
}

fn parse_sale(record: &StringRecord) -> Result<Sale> {
    if record.len() != 4 {
        return Err(EngineError::InvalidRecord(format!(
            "expected ARTICLE;COUNT;CASHIER;DATE, got {} fields",
            record.len()
        )));
    }
    let article = record[0].parse()?;
    let count = record[1]
        .parse::<u32>()
        .map_err(|_| EngineError::InvalidRecord(format!("bad count {:?}", &record[1])))?;
    let cashier = record[2].trim();
    if cashier.is_empty() {
        return Err(EngineError::InvalidRecord("empty cashier name".into()));
    }
    let date = record[3].parse()?;
    Ok(Sale::new(article, count, cashier, date))
}
