//! TillDB: an in-memory multi-index storage engine for a small
//! inventory/sales tool.
//!
//! One circular-list record store per entity holds the canonical records;
//! an open-addressing hash index (by article) and two AVL multimap indexes
//! (by article and by date) cross-reference them through stable
//! [`store::NodeHandle`]s, so an update through one structure is instantly
//! visible through the others.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod gen;
pub mod index;
pub mod io;
pub mod model;
pub mod query;
pub mod store;

pub use catalog::Catalog;
pub use error::{EngineError, Result};
pub use index::{HashIndex, OrderedIndex};
pub use model::{Article, Category, Date, Product, Sale};
pub use query::ArticleReport;
pub use store::{Array, NodeHandle, RecordStore};
