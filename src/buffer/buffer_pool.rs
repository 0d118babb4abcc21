use dashmap::DashMap;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::{collections::VecDeque, sync::Arc};

use crate::buffer::page::{Page, PageId, PageRef, INVALID_PAGE_ID};
use crate::config::BufferPoolConfig;
use crate::error::{PlumeError, PlumeResult};
use crate::storage::disk_manager::DiskManager;
use crate::utils::cache::lru_k::LRUKReplacer;
use crate::utils::cache::Replacer;

pub type FrameId = usize;

/// Pin-counted page cache between the index/heap layers and the disk
/// manager. Every `new_page`/`fetch_page` pins the frame; the returned
/// [`PageRef`] unpins on drop. Dirty frames are written back on
/// eviction and on `flush_page`/`flush_all_pages`.
#[derive(Debug)]
pub struct BufferPoolManager {
    pool: Vec<Arc<RwLock<Page>>>,
    pub replacer: Arc<RwLock<LRUKReplacer>>,
    pub disk_manager: Arc<DiskManager>,
    page_table: Arc<DashMap<PageId, FrameId>>,
    free_list: Mutex<VecDeque<FrameId>>,
}

impl BufferPoolManager {
    pub fn new(config: BufferPoolConfig, disk_manager: Arc<DiskManager>) -> Self {
        let num_pages = config.buffer_pool_size;
        let mut free_list = VecDeque::with_capacity(num_pages);
        let mut pool = Vec::with_capacity(num_pages);
        for i in 0..num_pages {
            free_list.push_back(i);
            pool.push(Arc::new(RwLock::new(Page::empty())));
        }

        Self {
            pool,
            replacer: Arc::new(RwLock::new(LRUKReplacer::with_k(num_pages, config.lru_k_k))),
            disk_manager,
            page_table: Arc::new(DashMap::new()),
            free_list: Mutex::new(free_list),
        }
    }

    /// Allocates a fresh zeroed page on disk, pins it, and returns it.
    pub fn new_page(&self) -> PlumeResult<PageRef> {
        let frame_id = self.allocate_frame()?;
        let new_page_id = self.disk_manager.allocate_page()?;

        self.page_table.insert(new_page_id, frame_id);
        {
            let mut page = self.pool[frame_id].write();
            page.reset(new_page_id);
            page.pin_count = 1;
        }

        self.replacer.write().record_access(frame_id)?;
        self.replacer.write().set_evictable(frame_id, false)?;

        Ok(self.page_ref(frame_id))
    }

    /// Pins an existing page, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> PlumeResult<PageRef> {
        if page_id == INVALID_PAGE_ID {
            return Err(PlumeError::Storage(
                "fetch_page: invalid page id".to_string(),
            ));
        }

        if let Some(frame_id_ref) = self.page_table.get(&page_id) {
            let frame_id = *frame_id_ref;
            drop(frame_id_ref);
            self.pool[frame_id].write().pin_count += 1;
            self.replacer.write().record_access(frame_id)?;
            self.replacer.write().set_evictable(frame_id, false)?;
            return Ok(self.page_ref(frame_id));
        }

        let frame_id = self.allocate_frame()?;
        let data = self.disk_manager.read_page(page_id)?;

        self.page_table.insert(page_id, frame_id);
        {
            let mut page = self.pool[frame_id].write();
            page.reset(page_id);
            page.set_data(&data);
            page.is_dirty = false;
            page.pin_count = 1;
        }

        self.replacer.write().record_access(frame_id)?;
        self.replacer.write().set_evictable(frame_id, false)?;

        Ok(self.page_ref(frame_id))
    }

    pub fn flush_page(&self, page_id: PageId) -> PlumeResult<bool> {
        if let Some(frame_id_ref) = self.page_table.get(&page_id) {
            let frame_id = *frame_id_ref;
            drop(frame_id_ref);
            let page = self.pool[frame_id].read();
            if !page.is_dirty {
                return Ok(false);
            }
            self.disk_manager.write_page(page_id, page.data())?;
            drop(page);
            self.pool[frame_id].write().is_dirty = false;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Writes every dirty resident page back to disk and syncs the file.
    pub fn flush_all_pages(&self) -> PlumeResult<()> {
        let page_ids: Vec<PageId> = self.page_table.iter().map(|e| *e.key()).collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        self.disk_manager.sync()
    }

    /// Number of resident pages currently pinned. The index owes its
    /// callers a zero here after every top-level operation, except for
    /// the one leaf an active scan keeps pinned.
    pub fn pinned_page_count(&self) -> usize {
        self.page_table
            .iter()
            .filter(|e| self.pool[*e.value()].read().pin_count > 0)
            .count()
    }

    fn page_ref(&self, frame_id: FrameId) -> PageRef {
        PageRef {
            page: self.pool[frame_id].clone(),
            page_table: self.page_table.clone(),
            replacer: self.replacer.clone(),
        }
    }

    fn allocate_frame(&self) -> PlumeResult<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop_front() {
            return Ok(frame_id);
        }
        if let Some(frame_id) = self.replacer.write().evict() {
            let page = self.pool[frame_id].read();
            let evicted_page_id = page.page_id;
            if page.is_dirty {
                debug!("writing back evicted page {}", evicted_page_id);
                self.disk_manager.write_page(evicted_page_id, page.data())?;
            }
            drop(page);
            self.page_table.remove(&evicted_page_id);
            Ok(frame_id)
        } else {
            Err(PlumeError::Storage(
                "Cannot allocate frame: buffer pool is full and no page to evict".to_string(),
            ))
        }
    }
}
