pub mod btree_index;
pub mod scan;

pub use btree_index::{BTreeIndex, InsertEffect};
pub use scan::Operator;
