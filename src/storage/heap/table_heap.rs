use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::config::BufferPoolConfig;
use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::{HeapMetaPageCodec, HeapPageCodec};
use crate::storage::disk_manager::{DiskManager, FIRST_PAGE_ID};
use crate::storage::page::{HeapMetaPage, HeapPage, RecordId, HEAP_PAGE_HEADER_SIZE};

/// A heap file of fixed-width records: the base relation the index is
/// built over. The first page stores the record width; data pages are
/// chained in insertion order and filled append-only.
#[derive(Debug)]
pub struct TableHeap {
    pub buffer_pool: Arc<BufferPoolManager>,
    pub record_size: usize,
    pub first_page_id: PageId,
    last_page_id: AtomicU32,
}

impl TableHeap {
    /// Creates a new heap file at `path` with one empty data page.
    pub fn create(
        path: impl AsRef<Path>,
        record_size: usize,
        config: BufferPoolConfig,
    ) -> PlumeResult<Self> {
        if record_size == 0 || record_size > PAGE_SIZE - HEAP_PAGE_HEADER_SIZE {
            return Err(PlumeError::Internal(format!(
                "unsupported record size {}",
                record_size
            )));
        }
        let disk_manager = Arc::new(DiskManager::try_new(path)?);
        let buffer_pool = Arc::new(BufferPoolManager::new(config, disk_manager));

        let meta_guard = buffer_pool.new_page()?;
        let first_guard = buffer_pool.new_page()?;
        let first_page_id = first_guard.read().page_id;

        first_guard
            .write()
            .set_data(&HeapPageCodec::encode(&HeapPage::new(), record_size));
        let meta = HeapMetaPage {
            record_size: record_size as u32,
            first_page_id,
        };
        meta_guard.write().set_data(&HeapMetaPageCodec::encode(&meta));

        Ok(Self {
            buffer_pool,
            record_size,
            first_page_id,
            last_page_id: AtomicU32::new(first_page_id),
        })
    }

    /// Opens an existing heap file and seeks the tail of the page chain.
    pub fn open(path: impl AsRef<Path>, config: BufferPoolConfig) -> PlumeResult<Self> {
        let disk_manager = Arc::new(DiskManager::try_new(path)?);
        let buffer_pool = Arc::new(BufferPoolManager::new(config, disk_manager));

        let meta_guard = buffer_pool.fetch_page(FIRST_PAGE_ID)?;
        let (meta, _) = HeapMetaPageCodec::decode(meta_guard.read().data())?;
        drop(meta_guard);
        let record_size = meta.record_size as usize;

        let mut last_page_id = meta.first_page_id;
        loop {
            let guard = buffer_pool.fetch_page(last_page_id)?;
            let (page, _) = HeapPageCodec::decode(guard.read().data(), record_size)?;
            if page.next_page_id == INVALID_PAGE_ID {
                break;
            }
            last_page_id = page.next_page_id;
        }

        Ok(Self {
            buffer_pool,
            record_size,
            first_page_id: meta.first_page_id,
            last_page_id: AtomicU32::new(last_page_id),
        })
    }

    /// Appends one record, chaining a fresh page when the tail is full.
    pub fn insert_record(&self, record: &[u8]) -> PlumeResult<RecordId> {
        if record.len() != self.record_size {
            return Err(PlumeError::Internal(format!(
                "record length {} does not match relation record size {}",
                record.len(),
                self.record_size
            )));
        }

        let current_page_id = self.last_page_id.load(Ordering::SeqCst);
        let guard = self.buffer_pool.fetch_page(current_page_id)?;
        let (mut page, _) = HeapPageCodec::decode(guard.read().data(), self.record_size)?;

        if !page.is_full(self.record_size) {
            let slot_num = page.records.len() as u32;
            page.records.push(record.to_vec());
            guard
                .write()
                .set_data(&HeapPageCodec::encode(&page, self.record_size));
            return Ok(RecordId::new(current_page_id, slot_num));
        }

        let new_guard = self.buffer_pool.new_page()?;
        let new_page_id = new_guard.read().page_id;
        let mut new_page = HeapPage::new();
        new_page.records.push(record.to_vec());
        new_guard
            .write()
            .set_data(&HeapPageCodec::encode(&new_page, self.record_size));

        page.next_page_id = new_page_id;
        guard
            .write()
            .set_data(&HeapPageCodec::encode(&page, self.record_size));

        self.last_page_id.store(new_page_id, Ordering::SeqCst);
        Ok(RecordId::new(new_page_id, 0))
    }

    pub fn flush(&self) -> PlumeResult<()> {
        self.buffer_pool.flush_all_pages()
    }

    /// Forward-only scan over every record in insertion order.
    pub fn scan(&self) -> TableScanner<'_> {
        TableScanner {
            heap: self,
            current_page_id: INVALID_PAGE_ID,
            next_page_id: self.first_page_id,
            page: None,
            next_slot: 0,
        }
    }
}

/// Iterator over `(RecordId, record bytes)`; exhaustion is `Ok(None)`.
#[derive(Debug)]
pub struct TableScanner<'a> {
    heap: &'a TableHeap,
    current_page_id: PageId,
    next_page_id: PageId,
    page: Option<HeapPage>,
    next_slot: usize,
}

impl TableScanner<'_> {
    pub fn next(&mut self) -> PlumeResult<Option<(RecordId, Vec<u8>)>> {
        loop {
            if self.page.is_none() {
                if self.next_page_id == INVALID_PAGE_ID {
                    return Ok(None);
                }
                let guard = self.heap.buffer_pool.fetch_page(self.next_page_id)?;
                let (page, _) = HeapPageCodec::decode(guard.read().data(), self.heap.record_size)?;
                self.current_page_id = self.next_page_id;
                self.next_page_id = page.next_page_id;
                self.page = Some(page);
                self.next_slot = 0;
            }

            let page = self.page.as_ref().unwrap();
            if self.next_slot < page.records.len() {
                let rid = RecordId::new(self.current_page_id, self.next_slot as u32);
                let record = page.records[self.next_slot].clone();
                self.next_slot += 1;
                return Ok(Some((rid, record)));
            }
            self.page = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::HeapPage;
    use tempfile::TempDir;

    const RECORD_SIZE: usize = 16;

    fn record(tag: u8) -> Vec<u8> {
        vec![tag; RECORD_SIZE]
    }

    #[test]
    fn insert_and_scan_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let heap = TableHeap::create(
            temp_dir.path().join("rel"),
            RECORD_SIZE,
            BufferPoolConfig::default(),
        )
        .unwrap();

        let rid1 = heap.insert_record(&record(1)).unwrap();
        let rid2 = heap.insert_record(&record(2)).unwrap();
        assert_eq!(rid1.page_id, heap.first_page_id);
        assert_eq!((rid1.slot_num, rid2.slot_num), (0, 1));

        let mut scanner = heap.scan();
        assert_eq!(scanner.next().unwrap(), Some((rid1, record(1))));
        assert_eq!(scanner.next().unwrap(), Some((rid2, record(2))));
        assert_eq!(scanner.next().unwrap(), None);
    }

    #[test]
    fn full_page_chains_to_next() {
        let temp_dir = TempDir::new().unwrap();
        let heap = TableHeap::create(
            temp_dir.path().join("rel"),
            RECORD_SIZE,
            BufferPoolConfig::default(),
        )
        .unwrap();

        let per_page = HeapPage::capacity(RECORD_SIZE);
        for i in 0..per_page + 2 {
            heap.insert_record(&record(i as u8)).unwrap();
        }

        let mut scanner = heap.scan();
        let mut count = 0;
        let mut last_page = heap.first_page_id;
        while let Some((rid, _)) = scanner.next().unwrap() {
            assert!(rid.page_id >= last_page);
            last_page = rid.page_id;
            count += 1;
        }
        assert_eq!(count, per_page + 2);
        assert_ne!(last_page, heap.first_page_id);
    }

    #[test]
    fn reopen_appends_to_tail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rel");
        {
            let heap =
                TableHeap::create(&path, RECORD_SIZE, BufferPoolConfig::default()).unwrap();
            heap.insert_record(&record(1)).unwrap();
            heap.flush().unwrap();
        }
        let heap = TableHeap::open(&path, BufferPoolConfig::default()).unwrap();
        assert_eq!(heap.record_size, RECORD_SIZE);
        let rid = heap.insert_record(&record(2)).unwrap();
        assert_eq!(rid.slot_num, 1);

        let mut scanner = heap.scan();
        assert_eq!(scanner.next().unwrap().unwrap().1, record(1));
        assert_eq!(scanner.next().unwrap().unwrap().1, record(2));
        assert_eq!(scanner.next().unwrap(), None);
    }
}
