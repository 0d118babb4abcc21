//! A disk-resident B+ tree index over a single integer attribute of
//! fixed-width tuples stored in a paged heap file.
//!
//! Nodes are pages: every tree operation pins pages in the buffer pool,
//! mutates them through the page codecs, and unpins them with the dirty
//! flag carried by the pin guard. [`storage::BTreeIndex`] bulk-loads
//! from a relation scan, supports persistent reopening, and serves
//! one-dimensional range scans over the leaf sibling chain.

pub mod buffer;
pub mod config;
pub mod error;
pub mod storage;
pub mod utils;

pub use config::BufferPoolConfig;
pub use error::{PlumeError, PlumeResult};
pub use storage::{BTreeIndex, Operator, TableHeap};
