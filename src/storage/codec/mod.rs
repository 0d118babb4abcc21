pub mod common;
pub mod heap_page;
pub mod index_page;

pub use common::CommonCodec;
pub use heap_page::{HeapMetaPageCodec, HeapPageCodec, RecordIdCodec};
pub use index_page::{IndexMetaPageCodec, InternalNodeCodec, LeafNodeCodec, TreePageCodec};

// data + consumed offset
pub type DecodedData<T> = (T, usize);
