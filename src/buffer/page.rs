use crate::buffer::buffer_pool::FrameId;
use crate::utils::cache::lru_k::LRUKReplacer;
use crate::utils::cache::Replacer;
use dashmap::DashMap;
use log::error;
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;

pub type PageId = u32;

pub const INVALID_PAGE_ID: PageId = 0;
pub const PAGE_SIZE: usize = 4096;

/// One buffer-pool frame. A frame holds the image of at most one disk
/// page at a time together with its pin count and dirty flag.
#[derive(Debug)]
pub struct Page {
    pub page_id: PageId,
    data: [u8; PAGE_SIZE],
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl Page {
    pub fn empty() -> Self {
        Self::new(INVALID_PAGE_ID)
    }

    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            data: [0; PAGE_SIZE],
            pin_count: 0,
            is_dirty: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the page image and marks the frame dirty. `data` must be
    /// exactly `PAGE_SIZE` bytes.
    pub fn set_data(&mut self, data: &[u8]) {
        self.data.copy_from_slice(data);
        self.is_dirty = true;
    }

    pub fn reset(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.data = [0; PAGE_SIZE];
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

/// A pinned page. Dropping the reference releases the pin; once the pin
/// count reaches zero the frame becomes evictable again. A page view
/// therefore cannot outlive its pin, and writes recorded through
/// [`Page::set_data`] stay with the frame until it is flushed or
/// written back on eviction.
#[derive(Debug)]
pub struct PageRef {
    pub page: Arc<RwLock<Page>>,
    pub(crate) page_table: Arc<DashMap<PageId, FrameId>>,
    pub(crate) replacer: Arc<RwLock<LRUKReplacer>>,
}

impl Deref for PageRef {
    type Target = Arc<RwLock<Page>>;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}

impl Drop for PageRef {
    fn drop(&mut self) {
        let mut page = self.page.write();
        page.pin_count -= 1;
        if page.pin_count == 0 {
            let page_id = page.page_id;
            drop(page);
            if let Some(frame_id) = self.page_table.get(&page_id) {
                if let Err(e) = self.replacer.write().set_evictable(*frame_id, true) {
                    error!("Failed to set evictable to frame {}, err: {:?}", *frame_id, e);
                }
            }
        }
    }
}
