use crate::buffer::PAGE_SIZE;
use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::{CommonCodec, DecodedData};
use crate::storage::page::{HeapMetaPage, HeapPage, RecordId};

pub struct RecordIdCodec;

impl RecordIdCodec {
    pub fn encode(rid: &RecordId) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend(CommonCodec::encode_u32(rid.page_id));
        bytes.extend(CommonCodec::encode_u32(rid.slot_num));
        bytes
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<RecordId>> {
        let mut left_bytes = bytes;

        let (page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (slot_num, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        Ok((
            RecordId::new(page_id, slot_num),
            bytes.len() - left_bytes.len(),
        ))
    }
}

pub struct HeapMetaPageCodec;

impl HeapMetaPageCodec {
    pub fn encode(page: &HeapMetaPage) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        bytes.extend(CommonCodec::encode_u32(page.record_size));
        bytes.extend(CommonCodec::encode_u32(page.first_page_id));
        bytes.resize(PAGE_SIZE, 0);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<HeapMetaPage>> {
        if bytes.len() != PAGE_SIZE {
            return Err(PlumeError::Storage(format!(
                "Heap meta page size is not {} instead of {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let mut left_bytes = bytes;

        let (record_size, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (first_page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        Ok((
            HeapMetaPage {
                record_size,
                first_page_id,
            },
            bytes.len() - left_bytes.len(),
        ))
    }
}

pub struct HeapPageCodec;

impl HeapPageCodec {
    pub fn encode(page: &HeapPage, record_size: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        bytes.extend(CommonCodec::encode_u32(page.next_page_id));
        bytes.extend(CommonCodec::encode_u32(page.records.len() as u32));
        for record in page.records.iter() {
            debug_assert_eq!(record.len(), record_size);
            bytes.extend_from_slice(record);
        }
        assert!(bytes.len() <= PAGE_SIZE);
        bytes.resize(PAGE_SIZE, 0);
        bytes
    }

    pub fn decode(bytes: &[u8], record_size: usize) -> PlumeResult<DecodedData<HeapPage>> {
        if bytes.len() != PAGE_SIZE {
            return Err(PlumeError::Storage(format!(
                "Heap page size is not {} instead of {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let mut left_bytes = bytes;

        let (next_page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (num_records, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        let mut records = Vec::with_capacity(num_records as usize);
        for _ in 0..num_records {
            records.push(left_bytes[..record_size].to_vec());
            left_bytes = &left_bytes[record_size..];
        }

        Ok((
            HeapPage {
                next_page_id,
                records,
            },
            PAGE_SIZE - left_bytes.len(),
        ))
    }
}
