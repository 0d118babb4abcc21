use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::DecodedData;

/// Fixed-width big-endian scalar codec shared by every page codec.
pub struct CommonCodec;

impl CommonCodec {
    pub fn encode_u8(data: u8) -> Vec<u8> {
        data.to_be_bytes().to_vec()
    }

    pub fn decode_u8(bytes: &[u8]) -> PlumeResult<DecodedData<u8>> {
        if bytes.is_empty() {
            return Err(PlumeError::Internal(format!(
                "bytes length {} is less than {}",
                bytes.len(),
                1
            )));
        }
        Ok((u8::from_be_bytes([bytes[0]]), 1))
    }

    pub fn encode_u32(data: u32) -> Vec<u8> {
        data.to_be_bytes().to_vec()
    }

    pub fn decode_u32(bytes: &[u8]) -> PlumeResult<DecodedData<u32>> {
        if bytes.len() < 4 {
            return Err(PlumeError::Internal(format!(
                "bytes length {} is less than {}",
                bytes.len(),
                4
            )));
        }
        let data = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ok((u32::from_be_bytes(data), 4))
    }

    pub fn encode_i32(data: i32) -> Vec<u8> {
        data.to_be_bytes().to_vec()
    }

    pub fn decode_i32(bytes: &[u8]) -> PlumeResult<DecodedData<i32>> {
        if bytes.len() < 4 {
            return Err(PlumeError::Internal(format!(
                "bytes length {} is less than {}",
                bytes.len(),
                4
            )));
        }
        let data = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ok((i32::from_be_bytes(data), 4))
    }

    pub fn encode_f64(data: f64) -> Vec<u8> {
        data.to_be_bytes().to_vec()
    }

    pub fn decode_f64(bytes: &[u8]) -> PlumeResult<DecodedData<f64>> {
        if bytes.len() < 8 {
            return Err(PlumeError::Internal(format!(
                "bytes length {} is less than {}",
                bytes.len(),
                8
            )));
        }
        let data = [
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ];
        Ok((f64::from_be_bytes(data), 8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_codec() {
        assert_eq!(
            5u8,
            CommonCodec::decode_u8(&CommonCodec::encode_u8(5u8)).unwrap().0
        );
        assert_eq!(
            5u32,
            CommonCodec::decode_u32(&CommonCodec::encode_u32(5u32))
                .unwrap()
                .0
        );
        assert_eq!(
            -5i32,
            CommonCodec::decode_i32(&CommonCodec::encode_i32(-5i32))
                .unwrap()
                .0
        );
        assert_eq!(
            5.5f64,
            CommonCodec::decode_f64(&CommonCodec::encode_f64(5.5f64))
                .unwrap()
                .0
        );
        assert!(CommonCodec::decode_u32(&[0u8; 2]).is_err());
    }
}
