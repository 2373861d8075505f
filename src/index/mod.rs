//! Secondary indexes over the record stores. Both index types store
//! [`crate::store::NodeHandle`]s, never record copies.

mod avl;
mod hash;

pub use avl::OrderedIndex;
pub use hash::{hash_function, HashIndex, DEFAULT_CAPACITY};
