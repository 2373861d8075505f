//! Primary record storage and the general-purpose dynamic array.

mod array;
mod list;

pub use array::Array;
pub use list::{Handles, Iter, NodeHandle, RecordStore};
