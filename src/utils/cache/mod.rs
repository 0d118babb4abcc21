use crate::buffer::FrameId;
use crate::error::PlumeResult;

pub mod lru_k;

pub trait Replacer {
    fn new(capacity: usize) -> Self
    where
        Self: Sized;

    fn record_access(&mut self, frame_id: FrameId) -> PlumeResult<()>;

    fn evict(&mut self) -> Option<FrameId>;

    fn set_evictable(&mut self, frame_id: FrameId, set_evictable: bool) -> PlumeResult<()>;

    fn size(&self) -> usize;
}
