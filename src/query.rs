//! Query façade composing the hash index and the ordered indexes, and
//! translating node handles back into record values.

use crate::index::{HashIndex, OrderedIndex};
use crate::model::{Article, Date, Product, Sale};
use crate::store::{Array, NodeHandle, RecordStore};
use crate::Catalog;

/// Result of an article lookup: the product plus every sale of it. An empty
/// sales list is a partial but successful answer, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleReport {
    pub product: Product,
    pub sales: Array<Sale>,
}

/// Looks a product up in the hash index and independently collects its
/// sales from the article tree. A hash miss is an overall miss; a tree miss
/// just yields an empty sales list.
pub fn find_by_article(
    article_index: &HashIndex<Article>,
    sales_by_article: &OrderedIndex<Article>,
    products: &RecordStore<Product>,
    sales: &RecordStore<Sale>,
    article: &Article,
) -> Option<ArticleReport> {
    let handle = article_index.find(article)?;
    let product = products.resolve(handle)?.clone();
    let sales = resolve_bucket(sales_by_article.get(article), sales);
    Some(ArticleReport { product, sales })
}

/// All sales on a date; absent dates normalize to an empty result.
pub fn find_by_date(
    sales_by_date: &OrderedIndex<Date>,
    sales: &RecordStore<Sale>,
    date: &Date,
) -> Array<Sale> {
    resolve_bucket(sales_by_date.get(date), sales)
}

/// Dereferences a bucket of handles, skipping any stale entry.
fn resolve_bucket(bucket: &[NodeHandle], sales: &RecordStore<Sale>) -> Array<Sale> {
    let mut out = Array::with_capacity(bucket.len());
    for handle in bucket {
        if let Some(sale) = sales.resolve(*handle) {
            out.push(sale.clone());
        }
    }
    out
}

impl Catalog {
    /// [`find_by_article`] over this catalog's structures.
    pub fn find_by_article(&self, article: &Article) -> Option<ArticleReport> {
        find_by_article(
            self.article_index(),
            self.sales_by_article(),
            self.products(),
            self.sales(),
            article,
        )
    }

    /// [`find_by_date`] over this catalog's structures.
    pub fn find_by_date(&self, date: &Date) -> Array<Sale> {
        find_by_date(self.sales_by_date(), self.sales(), date)
    }
}
