use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::buffer::{PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::error::{PlumeError, PlumeResult};

/// Page id of the first page of a file. Page id 0 is reserved as
/// [`INVALID_PAGE_ID`], so page `p` lives at byte offset
/// `(p - 1) * PAGE_SIZE`.
pub const FIRST_PAGE_ID: PageId = 1;

static EMPTY_PAGE: [u8; PAGE_SIZE] = [0; PAGE_SIZE];

/// Synchronous page-granular I/O over a single file. Allocation extends
/// the file with a zeroed page; pages are never deallocated.
#[derive(Debug)]
pub struct DiskManager {
    next_page_id: AtomicU32,
    db_file: Mutex<File>,
}

impl DiskManager {
    /// Opens the file at `db_path`, creating it if absent. Callers that
    /// care whether the file already existed check the path beforehand.
    pub fn try_new(db_path: impl AsRef<Path>) -> PlumeResult<Self> {
        let db_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(db_path.as_ref())?;

        let db_file_len = db_file.metadata()?.len();
        if db_file_len % PAGE_SIZE as u64 != 0 {
            return Err(PlumeError::Internal(format!(
                "db file size {} is not a multiple of page size {}",
                db_file_len, PAGE_SIZE
            )));
        }
        let next_page_id = (db_file_len / PAGE_SIZE as u64) as PageId + FIRST_PAGE_ID;
        debug!(
            "opened {:?}, next_page_id {}",
            db_path.as_ref(),
            next_page_id
        );

        Ok(Self {
            next_page_id: AtomicU32::new(next_page_id),
            db_file: Mutex::new(db_file),
        })
    }

    /// Extends the file with one zeroed page and returns its id.
    pub fn allocate_page(&self) -> PlumeResult<PageId> {
        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.write_all(&EMPTY_PAGE)?;
        Ok(page_id)
    }

    pub fn read_page(&self, page_id: PageId) -> PlumeResult<[u8; PAGE_SIZE]> {
        if page_id == INVALID_PAGE_ID || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return Err(PlumeError::Storage(format!(
                "read_page: page {} out of range",
                page_id
            )));
        }
        let mut buf = [0u8; PAGE_SIZE];
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> PlumeResult<()> {
        if page_id == INVALID_PAGE_ID || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return Err(PlumeError::Storage(format!(
                "write_page: page {} out of range",
                page_id
            )));
        }
        if data.len() != PAGE_SIZE {
            return Err(PlumeError::Internal(format!(
                "write_page: data length {} is not {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.write_all(data)?;
        Ok(())
    }

    pub fn sync(&self) -> PlumeResult<()> {
        self.db_file.lock().sync_data()?;
        Ok(())
    }

    pub fn num_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::SeqCst) - FIRST_PAGE_ID
    }

    fn page_offset(page_id: PageId) -> u64 {
        (page_id - FIRST_PAGE_ID) as u64 * PAGE_SIZE as u64
    }
}
