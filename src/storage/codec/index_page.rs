use crate::buffer::PAGE_SIZE;
use crate::error::{PlumeError, PlumeResult};
use crate::storage::codec::{CommonCodec, DecodedData, RecordIdCodec};
use crate::storage::page::{
    AttrType, IndexMetaPage, InternalNode, LeafNode, TreePage, LEAF_OCCUPANCY,
    META_RELATION_NAME_SIZE, NODE_OCCUPANCY,
};

pub struct AttrTypeCodec;

impl AttrTypeCodec {
    pub fn encode(attr_type: AttrType) -> Vec<u8> {
        match attr_type {
            AttrType::Integer => CommonCodec::encode_u8(0),
            AttrType::Double => CommonCodec::encode_u8(1),
            AttrType::String => CommonCodec::encode_u8(2),
        }
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<AttrType>> {
        let (flag, offset) = CommonCodec::decode_u8(bytes)?;
        match flag {
            0 => Ok((AttrType::Integer, offset)),
            1 => Ok((AttrType::Double, offset)),
            2 => Ok((AttrType::String, offset)),
            _ => Err(PlumeError::Storage(format!(
                "Invalid attribute type {}",
                flag
            ))),
        }
    }
}

pub struct IndexMetaPageCodec;

impl IndexMetaPageCodec {
    pub fn encode(page: &IndexMetaPage) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        let mut name = [0u8; META_RELATION_NAME_SIZE];
        let name_bytes = page.relation_name.as_bytes();
        let len = name_bytes.len().min(META_RELATION_NAME_SIZE);
        name[..len].copy_from_slice(&name_bytes[..len]);
        bytes.extend_from_slice(&name);
        bytes.extend(CommonCodec::encode_u32(page.attr_byte_offset as u32));
        bytes.extend(AttrTypeCodec::encode(page.attr_type));
        bytes.extend(CommonCodec::encode_u32(page.root_page_id));
        bytes.extend(CommonCodec::encode_u8(page.root_is_leaf as u8));
        bytes.resize(PAGE_SIZE, 0);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<IndexMetaPage>> {
        if bytes.len() != PAGE_SIZE {
            return Err(PlumeError::Storage(format!(
                "Index meta page size is not {} instead of {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let mut left_bytes = bytes;

        let name = &left_bytes[..META_RELATION_NAME_SIZE];
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        let relation_name = String::from_utf8(name[..end].to_vec())
            .map_err(|e| PlumeError::Storage(format!("Invalid relation name: {}", e)))?;
        left_bytes = &left_bytes[META_RELATION_NAME_SIZE..];

        let (attr_byte_offset, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (attr_type, offset) = AttrTypeCodec::decode(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (root_page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];
        let (root_is_leaf, offset) = CommonCodec::decode_u8(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        Ok((
            IndexMetaPage {
                relation_name,
                attr_byte_offset: attr_byte_offset as usize,
                attr_type,
                root_page_id,
                root_is_leaf: root_is_leaf != 0,
            },
            bytes.len() - left_bytes.len(),
        ))
    }
}

pub struct LeafNodeCodec;

impl LeafNodeCodec {
    pub fn encode(node: &LeafNode) -> Vec<u8> {
        debug_assert_eq!(node.keys.len(), LEAF_OCCUPANCY);
        debug_assert_eq!(node.rids.len(), LEAF_OCCUPANCY);
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        for key in node.keys.iter() {
            bytes.extend(CommonCodec::encode_i32(*key));
        }
        for rid in node.rids.iter() {
            bytes.extend(RecordIdCodec::encode(rid));
        }
        bytes.extend(CommonCodec::encode_u32(node.right_sib_page_id));
        debug_assert_eq!(bytes.len(), PAGE_SIZE);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<LeafNode>> {
        if bytes.len() != PAGE_SIZE {
            return Err(PlumeError::Storage(format!(
                "Index page size is not {} instead of {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let mut left_bytes = bytes;

        let mut keys = Vec::with_capacity(LEAF_OCCUPANCY);
        for _ in 0..LEAF_OCCUPANCY {
            let (key, offset) = CommonCodec::decode_i32(left_bytes)?;
            left_bytes = &left_bytes[offset..];
            keys.push(key);
        }
        let mut rids = Vec::with_capacity(LEAF_OCCUPANCY);
        for _ in 0..LEAF_OCCUPANCY {
            let (rid, offset) = RecordIdCodec::decode(left_bytes)?;
            left_bytes = &left_bytes[offset..];
            rids.push(rid);
        }
        let (right_sib_page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        Ok((
            LeafNode {
                keys,
                rids,
                right_sib_page_id,
            },
            bytes.len() - left_bytes.len(),
        ))
    }
}

pub struct InternalNodeCodec;

impl InternalNodeCodec {
    pub fn encode(node: &InternalNode) -> Vec<u8> {
        debug_assert_eq!(node.keys.len(), NODE_OCCUPANCY);
        debug_assert_eq!(node.child_page_ids.len(), NODE_OCCUPANCY + 1);
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        bytes.extend(CommonCodec::encode_i32(node.level));
        for key in node.keys.iter() {
            bytes.extend(CommonCodec::encode_i32(*key));
        }
        for page_id in node.child_page_ids.iter() {
            bytes.extend(CommonCodec::encode_u32(*page_id));
        }
        debug_assert_eq!(bytes.len(), PAGE_SIZE);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> PlumeResult<DecodedData<InternalNode>> {
        if bytes.len() != PAGE_SIZE {
            return Err(PlumeError::Storage(format!(
                "Index page size is not {} instead of {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let mut left_bytes = bytes;

        let (level, offset) = CommonCodec::decode_i32(left_bytes)?;
        left_bytes = &left_bytes[offset..];

        let mut keys = Vec::with_capacity(NODE_OCCUPANCY);
        for _ in 0..NODE_OCCUPANCY {
            let (key, offset) = CommonCodec::decode_i32(left_bytes)?;
            left_bytes = &left_bytes[offset..];
            keys.push(key);
        }
        let mut child_page_ids = Vec::with_capacity(NODE_OCCUPANCY + 1);
        for _ in 0..=NODE_OCCUPANCY {
            let (page_id, offset) = CommonCodec::decode_u32(left_bytes)?;
            left_bytes = &left_bytes[offset..];
            child_page_ids.push(page_id);
        }

        Ok((
            InternalNode {
                level,
                keys,
                child_page_ids,
            },
            bytes.len() - left_bytes.len(),
        ))
    }
}

/// Decodes a page as the node kind the caller classified it as; the
/// bytes themselves carry no tag.
pub struct TreePageCodec;

impl TreePageCodec {
    pub fn encode(page: &TreePage) -> Vec<u8> {
        match page {
            TreePage::Leaf(node) => LeafNodeCodec::encode(node),
            TreePage::Internal(node) => InternalNodeCodec::encode(node),
        }
    }

    pub fn decode(bytes: &[u8], is_leaf: bool) -> PlumeResult<DecodedData<TreePage>> {
        if is_leaf {
            let (node, offset) = LeafNodeCodec::decode(bytes)?;
            Ok((TreePage::Leaf(node), offset))
        } else {
            let (node, offset) = InternalNodeCodec::decode(bytes)?;
            Ok((TreePage::Internal(node), offset))
        }
    }
}
