use crate::buffer::{PageId, PageRef, INVALID_PAGE_ID};
use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::{InternalNodeCodec, LeafNodeCodec};
use crate::storage::index::btree_index::BTreeIndex;
use crate::storage::page::{LeafNode, RecordId, LEAF_OCCUPANCY};

/// Comparison operators accepted by [`BTreeIndex::start_scan`]: the low
/// bound takes `Gt`/`Gte`, the high bound `Lt`/`Lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Gte,
    Gt,
}

/// State of the one scan an index may have running. The current leaf
/// stays pinned through `current_guard` until the scan advances past it
/// or ends.
#[derive(Debug)]
pub(crate) struct ScanState {
    low_val: i32,
    high_val: i32,
    low_op: Operator,
    high_op: Operator,
    current_page_id: PageId,
    current_guard: Option<PageRef>,
    leaf: LeafNode,
    next_entry: usize,
    exhausted: bool,
}

impl BTreeIndex {
    /// Begins a range scan over keys in `low_op(low_val) .. high_op(high_val)`.
    ///
    /// Locates the first qualifying entry by descending from the root
    /// with the low bound and walking the leaf sibling chain. A scan
    /// already running is ended first. Fails with
    /// [`PlumeError::NoSuchKeyFound`] when nothing qualifies, leaving no
    /// scan state behind.
    pub fn start_scan(
        &mut self,
        low_val: i32,
        low_op: Operator,
        high_val: i32,
        high_op: Operator,
    ) -> PlumeResult<()> {
        if !matches!(low_op, Operator::Gt | Operator::Gte)
            || !matches!(high_op, Operator::Lt | Operator::Lte)
        {
            return Err(PlumeError::BadOpcodes);
        }

        if self.scan.is_some() {
            self.scan = None;
        }

        if low_val > high_val {
            return Err(PlumeError::BadScanrange);
        }

        // descend by the low bound to the leftmost leaf that could match
        let mut page_id = self.root_page_id;
        if !self.root_is_leaf {
            loop {
                let guard = self.buffer_pool.fetch_page(page_id)?;
                let (node, _) = InternalNodeCodec::decode(guard.read().data())?;
                page_id = node.child_for(low_val);
                if node.level == 1 {
                    break;
                }
            }
        }

        // walk the sibling chain to the first qualifying slot
        let strict = low_op == Operator::Gt;
        let mut guard = self.buffer_pool.fetch_page(page_id)?;
        let mut leaf = LeafNodeCodec::decode(guard.read().data())?.0;
        let next_entry = loop {
            if let Some(slot) = leaf.first_slot_from(low_val, strict) {
                break slot;
            }
            let sibling = leaf.right_sib_page_id;
            if sibling == INVALID_PAGE_ID {
                return Err(PlumeError::NoSuchKeyFound);
            }
            guard = self.buffer_pool.fetch_page(sibling)?;
            leaf = LeafNodeCodec::decode(guard.read().data())?.0;
            page_id = sibling;
        };

        self.scan = Some(ScanState {
            low_val,
            high_val,
            low_op,
            high_op,
            current_page_id: page_id,
            current_guard: Some(guard),
            leaf,
            next_entry,
            exhausted: false,
        });
        Ok(())
    }

    /// Yields the record id of the next matching entry.
    ///
    /// Raises [`PlumeError::IndexScanCompleted`] once the high bound or
    /// the end of the leaf chain is passed; the scan state is cleared
    /// and the pinned leaf released at that point.
    pub fn scan_next(&mut self) -> PlumeResult<RecordId> {
        let Some(state) = self.scan.as_ref() else {
            return Err(PlumeError::ScanNotInitialized);
        };

        if state.exhausted {
            self.scan = None;
            return Err(PlumeError::IndexScanCompleted);
        }

        let key = state.leaf.keys[state.next_entry];
        debug_assert!(match state.low_op {
            Operator::Gt => key > state.low_val,
            _ => key >= state.low_val,
        });
        let past_high = match state.high_op {
            Operator::Lt => key >= state.high_val,
            _ => key > state.high_val,
        };
        if past_high {
            self.scan = None;
            return Err(PlumeError::IndexScanCompleted);
        }

        let state = self.scan.as_mut().unwrap();
        let rid = state.leaf.rids[state.next_entry];

        if state.next_entry + 1 < LEAF_OCCUPANCY && state.leaf.slot_used(state.next_entry + 1) {
            state.next_entry += 1;
        } else {
            let sibling = state.leaf.right_sib_page_id;
            if sibling == INVALID_PAGE_ID {
                // the chain ends here: release the leaf now, report
                // completion on the next call
                state.current_guard = None;
                state.exhausted = true;
            } else {
                let guard = self.buffer_pool.fetch_page(sibling)?;
                let leaf = LeafNodeCodec::decode(guard.read().data())?.0;
                state.current_page_id = sibling;
                state.current_guard = Some(guard);
                state.leaf = leaf;
                state.next_entry = 0;
            }
        }

        Ok(rid)
    }

    /// Terminates the active scan, unpinning its leaf and clearing all
    /// scan state.
    pub fn end_scan(&mut self) -> PlumeResult<()> {
        if self.scan.take().is_none() {
            return Err(PlumeError::ScanNotInitialized);
        }
        Ok(())
    }

    pub fn scan_executing(&self) -> bool {
        self.scan.is_some()
    }

    pub(crate) fn scan_page_id(&self) -> Option<PageId> {
        self.scan.as_ref().map(|state| state.current_page_id)
    }
}
