use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, PageId, INVALID_PAGE_ID};
use crate::config::BufferPoolConfig;
use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::{
    CommonCodec, IndexMetaPageCodec, InternalNodeCodec, LeafNodeCodec, TreePageCodec,
};
use crate::storage::disk_manager::{DiskManager, FIRST_PAGE_ID};
use crate::storage::heap::TableHeap;
use crate::storage::index::scan::ScanState;
use crate::storage::page::{
    AttrType, IndexMetaPage, InternalNode, LeafNode, RecordId, TreePage, LEAF_OCCUPANCY,
    META_RELATION_NAME_SIZE, NODE_OCCUPANCY,
};

/// Outcome of inserting into a subtree: the entry was either absorbed in
/// place, or the node split and hands the separator plus the new right
/// sibling up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertEffect {
    Absorbed,
    Split { new_page_id: PageId, middle_key: i32 },
}

/// A B+ tree index over one integer attribute of a heap-file relation.
///
/// The index lives in its own paged file (`"<relation>.<offset>"`) whose
/// first page is the meta page. All node access goes through the buffer
/// pool; one scan may be active at a time and keeps its current leaf
/// pinned.
#[derive(Debug)]
pub struct BTreeIndex {
    pub buffer_pool: Arc<BufferPoolManager>,
    pub index_name: String,
    pub relation_name: String,
    pub header_page_id: PageId,
    pub root_page_id: PageId,
    pub root_is_leaf: bool,
    pub attr_byte_offset: usize,
    pub attr_type: AttrType,
    pub leaf_occupancy: usize,
    pub node_occupancy: usize,
    pub(crate) scan: Option<ScanState>,
}

impl BTreeIndex {
    /// Opens the index for `relation`, building it from a full relation
    /// scan when the index file does not exist yet. Reopening validates
    /// the stored meta page against the arguments and fails with
    /// [`PlumeError::BadIndexInfo`] on any mismatch.
    pub fn open(
        relation: &TableHeap,
        relation_name: &str,
        attr_byte_offset: usize,
        attr_type: AttrType,
        config: BufferPoolConfig,
    ) -> PlumeResult<Self> {
        if attr_type != AttrType::Integer {
            return Err(PlumeError::Internal(format!(
                "unsupported attribute type {:?}",
                attr_type
            )));
        }

        let index_name = format!("{}.{}", relation_name, attr_byte_offset);
        let index_path = PathBuf::from(&index_name);
        let index_exists = index_path.exists();

        let disk_manager = Arc::new(DiskManager::try_new(&index_path)?);
        let buffer_pool = Arc::new(BufferPoolManager::new(config, disk_manager));

        // the meta page only keeps the first 20 bytes of the name
        let name_bytes = relation_name.as_bytes();
        let name_len = name_bytes.len().min(META_RELATION_NAME_SIZE);
        let stored_name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        if index_exists {
            let meta_guard = buffer_pool.fetch_page(FIRST_PAGE_ID)?;
            let (meta, _) = IndexMetaPageCodec::decode(meta_guard.read().data())?;
            drop(meta_guard);

            if meta.relation_name != stored_name
                || meta.attr_byte_offset != attr_byte_offset
                || meta.attr_type != attr_type
            {
                return Err(PlumeError::BadIndexInfo(format!(
                    "index file {} was built for ({}, {}, {:?})",
                    index_name, meta.relation_name, meta.attr_byte_offset, meta.attr_type
                )));
            }

            return Ok(Self {
                buffer_pool,
                index_name,
                relation_name: stored_name,
                header_page_id: FIRST_PAGE_ID,
                root_page_id: meta.root_page_id,
                root_is_leaf: meta.root_is_leaf,
                attr_byte_offset,
                attr_type,
                leaf_occupancy: LEAF_OCCUPANCY,
                node_occupancy: NODE_OCCUPANCY,
                scan: None,
            });
        }

        let meta_guard = buffer_pool.new_page()?;
        let header_page_id = meta_guard.read().page_id;
        let root_guard = buffer_pool.new_page()?;
        let root_page_id = root_guard.read().page_id;

        root_guard
            .write()
            .set_data(&LeafNodeCodec::encode(&LeafNode::new()));
        let meta = IndexMetaPage {
            relation_name: stored_name.clone(),
            attr_byte_offset,
            attr_type,
            root_page_id,
            root_is_leaf: true,
        };
        meta_guard
            .write()
            .set_data(&IndexMetaPageCodec::encode(&meta));
        drop(root_guard);
        drop(meta_guard);

        let mut index = Self {
            buffer_pool,
            index_name,
            relation_name: stored_name,
            header_page_id,
            root_page_id,
            root_is_leaf: true,
            attr_byte_offset,
            attr_type,
            leaf_occupancy: LEAF_OCCUPANCY,
            node_occupancy: NODE_OCCUPANCY,
            scan: None,
        };
        index.build_from(relation)?;
        index.buffer_pool.flush_all_pages()?;
        debug!(
            "built index {} over {} pages",
            index.index_name,
            index.buffer_pool.disk_manager.num_pages()
        );
        Ok(index)
    }

    /// Ends any active scan and writes all dirty pages back.
    pub fn close(&mut self) -> PlumeResult<()> {
        self.scan = None;
        self.buffer_pool.flush_all_pages()
    }

    /// Reads the indexed key out of a raw relation record.
    pub fn key_from_record(record: &[u8], attr_byte_offset: usize) -> PlumeResult<i32> {
        if attr_byte_offset + 4 > record.len() {
            return Err(PlumeError::Internal(format!(
                "attribute offset {} out of bounds for record of {} bytes",
                attr_byte_offset,
                record.len()
            )));
        }
        Ok(CommonCodec::decode_i32(&record[attr_byte_offset..])?.0)
    }

    fn build_from(&mut self, relation: &TableHeap) -> PlumeResult<()> {
        let mut scanner = relation.scan();
        while let Some((rid, record)) = scanner.next()? {
            let key = Self::key_from_record(&record, self.attr_byte_offset)?;
            self.insert_entry(key, rid)?;
        }
        Ok(())
    }

    /// Inserts one `(key, rid)` entry, splitting nodes along the way and
    /// promoting a new root when a split reaches the top.
    pub fn insert_entry(&mut self, key: i32, rid: RecordId) -> PlumeResult<()> {
        let effect = self.insert_into(self.root_page_id, self.root_is_leaf, key, rid)?;
        if let InsertEffect::Split {
            new_page_id,
            middle_key,
        } = effect
        {
            self.promote_root(new_page_id, middle_key)?;
        }
        Ok(())
    }

    fn insert_into(
        &self,
        page_id: PageId,
        is_leaf: bool,
        key: i32,
        rid: RecordId,
    ) -> PlumeResult<InsertEffect> {
        let guard = self.buffer_pool.fetch_page(page_id)?;
        let (tree_page, _) = TreePageCodec::decode(guard.read().data(), is_leaf)?;

        match tree_page {
            TreePage::Leaf(mut leaf) => {
                if !leaf.is_full() {
                    leaf.insert(key, rid);
                    guard.write().set_data(&LeafNodeCodec::encode(&leaf));
                    return Ok(InsertEffect::Absorbed);
                }
                let effect = self.split_leaf(&mut leaf, key, rid)?;
                guard.write().set_data(&LeafNodeCodec::encode(&leaf));
                Ok(effect)
            }
            TreePage::Internal(mut node) => {
                let child_page_id = node.child_for(key);
                match self.insert_into(child_page_id, node.level == 1, key, rid)? {
                    InsertEffect::Absorbed => Ok(InsertEffect::Absorbed),
                    InsertEffect::Split {
                        new_page_id,
                        middle_key,
                    } => {
                        if !node.is_full() {
                            node.insert(middle_key, new_page_id);
                            guard.write().set_data(&InternalNodeCodec::encode(&node));
                            return Ok(InsertEffect::Absorbed);
                        }
                        let effect = self.split_internal(&mut node, middle_key, new_page_id)?;
                        guard.write().set_data(&InternalNodeCodec::encode(&node));
                        Ok(effect)
                    }
                }
            }
        }
    }

    /// Splits a full leaf. The upper half moves to a fresh right
    /// sibling; the pending entry lands on whichever side its key
    /// belongs (ties go right). Promotes the new sibling's first key.
    fn split_leaf(&self, leaf: &mut LeafNode, key: i32, rid: RecordId) -> PlumeResult<InsertEffect> {
        let new_guard = self.buffer_pool.new_page()?;
        let new_page_id = new_guard.read().page_id;
        let mut new_leaf = LeafNode::new();

        let mid = (LEAF_OCCUPANCY + 1) / 2;
        for (dst, src) in (mid..LEAF_OCCUPANCY).enumerate() {
            new_leaf.keys[dst] = leaf.keys[src];
            new_leaf.rids[dst] = leaf.rids[src];
            leaf.clear_slot(src);
        }

        if key < leaf.keys[mid - 1] {
            leaf.insert(key, rid);
        } else {
            new_leaf.insert(key, rid);
        }

        new_leaf.right_sib_page_id = leaf.right_sib_page_id;
        leaf.right_sib_page_id = new_page_id;

        let middle_key = new_leaf.keys[0];
        new_guard.write().set_data(&LeafNodeCodec::encode(&new_leaf));
        debug!(
            "split leaf: new sibling {} starts at key {}",
            new_page_id, middle_key
        );
        Ok(InsertEffect::Split {
            new_page_id,
            middle_key,
        })
    }

    /// Splits a full internal node around the push-up index. The
    /// separator there is removed from the node and promoted; keys above
    /// it move to the new right sibling together with their children.
    fn split_internal(
        &self,
        node: &mut InternalNode,
        key: i32,
        right_child: PageId,
    ) -> PlumeResult<InsertEffect> {
        let new_guard = self.buffer_pool.new_page()?;
        let new_page_id = new_guard.read().page_id;
        let mut new_node = InternalNode::new(node.level);

        let half = NODE_OCCUPANCY / 2;
        let push_up = if NODE_OCCUPANCY % 2 == 0 {
            if key >= node.keys[half] {
                half
            } else {
                half - 1
            }
        } else {
            half
        };
        let separator = node.keys[push_up];

        for (dst, src) in (push_up + 1..NODE_OCCUPANCY).enumerate() {
            new_node.keys[dst] = node.keys[src];
            new_node.child_page_ids[dst + 1] = node.child_page_ids[src + 1];
        }
        new_node.child_page_ids[0] = node.child_page_ids[push_up + 1];
        for i in push_up..NODE_OCCUPANCY {
            node.keys[i] = 0;
        }
        for i in push_up + 1..=NODE_OCCUPANCY {
            node.child_page_ids[i] = INVALID_PAGE_ID;
        }

        if key < separator {
            node.insert(key, right_child);
        } else {
            new_node.insert(key, right_child);
        }

        new_guard
            .write()
            .set_data(&InternalNodeCodec::encode(&new_node));
        debug!(
            "split internal level {}: promoted separator {}",
            node.level, separator
        );
        Ok(InsertEffect::Split {
            new_page_id,
            middle_key: separator,
        })
    }

    /// Installs a new internal root above the split halves and rewrites
    /// the meta page with the new root id.
    fn promote_root(&mut self, new_page_id: PageId, middle_key: i32) -> PlumeResult<()> {
        let level = if self.root_is_leaf {
            1
        } else {
            let old_guard = self.buffer_pool.fetch_page(self.root_page_id)?;
            let (old_root, _) = InternalNodeCodec::decode(old_guard.read().data())?;
            old_root.level + 1
        };

        let new_root_guard = self.buffer_pool.new_page()?;
        let new_root_page_id = new_root_guard.read().page_id;
        let mut new_root = InternalNode::new(level);
        new_root.child_page_ids[0] = self.root_page_id;
        new_root.keys[0] = middle_key;
        new_root.child_page_ids[1] = new_page_id;
        new_root_guard
            .write()
            .set_data(&InternalNodeCodec::encode(&new_root));
        drop(new_root_guard);

        self.root_page_id = new_root_page_id;
        self.root_is_leaf = false;
        debug!("promoted new root {} at level {}", new_root_page_id, level);
        self.write_meta()
    }

    fn write_meta(&self) -> PlumeResult<()> {
        let meta = IndexMetaPage {
            relation_name: self.relation_name.clone(),
            attr_byte_offset: self.attr_byte_offset,
            attr_type: self.attr_type,
            root_page_id: self.root_page_id,
            root_is_leaf: self.root_is_leaf,
        };
        let guard = self.buffer_pool.fetch_page(self.header_page_id)?;
        guard.write().set_data(&IndexMetaPageCodec::encode(&meta));
        Ok(())
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
