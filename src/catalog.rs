//! Top-level ownership of the engine's structures.
//!
//! A [`Catalog`] is built once and handed to collaborators; no structure
//! reaches out to find another. Operations that touch several structures
//! (most importantly cascading product deletion) live here so callers get
//! one call instead of coordinating the steps themselves.

use tracing::debug;

use crate::index::{HashIndex, OrderedIndex};
use crate::model::{Article, Date, Product, Sale};
use crate::store::{NodeHandle, RecordStore};

#[derive(Debug, Default)]
pub struct Catalog {
    products: RecordStore<Product>,
    sales: RecordStore<Sale>,
    /// article -> product node
    article_index: HashIndex<Article>,
    /// article -> sale nodes
    sales_by_article: OrderedIndex<Article>,
    /// date -> sale nodes
    sales_by_date: OrderedIndex<Date>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &RecordStore<Product> {
        &self.products
    }

    pub fn sales(&self) -> &RecordStore<Sale> {
        &self.sales
    }

    pub fn article_index(&self) -> &HashIndex<Article> {
        &self.article_index
    }

    pub fn sales_by_article(&self) -> &OrderedIndex<Article> {
        &self.sales_by_article
    }

    pub fn sales_by_date(&self) -> &OrderedIndex<Date> {
        &self.sales_by_date
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    /// Appends a product and indexes it by article. A duplicate article
    /// rolls the append back and returns false.
    pub fn add_product(&mut self, product: Product) -> bool {
        let article = product.article;
        let handle = self.products.push_back(product);
        if self.article_index.insert(article, handle) {
            true
        } else {
            self.products.remove_handle(handle);
            false
        }
    }

    /// Appends a sale and indexes it in both trees.
    pub fn add_sale(&mut self, sale: Sale) -> NodeHandle {
        let article = sale.article;
        let date = sale.date;
        let handle = self.sales.push_back(sale);
        self.sales_by_article.insert(article, handle);
        self.sales_by_date.insert(date, handle);
        handle
    }

    /// Removes the first sale equal to `sale`: both tree references first,
    /// then the store node. Emptied tree keys are pruned.
    pub fn remove_sale(&mut self, sale: &Sale) -> bool {
        let found = self
            .sales
            .handles()
            .find(|(_, existing)| *existing == sale)
            .map(|(handle, existing)| (handle, existing.article, existing.date));
        let (handle, article, date) = match found {
            Some(found) => found,
            None => return false,
        };
        self.sales_by_article.remove_handle_at_key(&article, handle);
        self.sales_by_date.remove_handle_at_key(&date, handle);
        self.sales.remove_handle(handle)
    }

    /// Looks a product up by article.
    pub fn product_by_article(&self, article: &Article) -> Option<&Product> {
        let handle = self.article_index.find(article)?;
        self.products.resolve(handle)
    }

    /// Deletes a product and everything referencing it: the hash entry, the
    /// product node, the article-tree bucket, every date-tree reference and
    /// the sale records themselves. Returns false for an unknown article.
    pub fn delete_product_cascade(&mut self, article: &Article) -> bool {
        let handle = match self.article_index.find(article) {
            Some(handle) => handle,
            None => return false,
        };
        self.article_index.remove(article);
        self.products.remove_handle(handle);

        let doomed: Vec<NodeHandle> = self
            .sales
            .handles()
            .filter(|(_, sale)| sale.article == *article)
            .map(|(handle, _)| handle)
            .collect();

        let sales = &self.sales;
        self.sales_by_date.remove_handles_by_predicate(|h| {
            sales
                .resolve(h)
                .map_or(false, |sale| sale.article == *article)
        });
        self.sales_by_article.remove(article);
        for h in &doomed {
            self.sales.remove_handle(*h);
        }
        self.sales_by_date.compact();

        debug!(
            article = %article,
            cascaded_sales = doomed.len(),
            "cascade-deleted product"
        );
        true
    }

    /// Pre-registers a date key in the date tree without a sale.
    pub fn register_date(&mut self, date: Date) {
        self.sales_by_date.insert_bare_key(date);
    }

    /// Indented diagnostic diagram of the date tree, one line per sale.
    pub fn render_date_tree(&self) -> String {
        self.sales_by_date
            .render_with(|handle| self.sales.resolve(handle).map(|sale| sale.to_string()))
    }
}
