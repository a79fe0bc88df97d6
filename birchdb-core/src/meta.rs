use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

use crate::bptree::node::NodeId;

/// The reserved key under which the tree metadata record is stored. The
/// backing store may hold unrelated keys freely as long as they collide with
/// neither this key nor the depth-prefixed identifier space.
pub const METADATA_KEY: &[u8] = b"m:tree";

/// The current format version of the metadata record.
const VERSION: u32 = 1;

/// A special sequence of bytes at the start of the metadata record,
/// used for validation.
const MAGIC: u32 = 0xB1DB_2718;

/// The tree metadata: the root identifier, the height, and the allocation
/// sequence for node identifiers.
///
/// `height == 0` means the root itself is a leaf; otherwise the root is a
/// branch and all leaves sit `height` hops below it. The allocation sequence
/// rides in the same record so that identifiers survive reopening and are
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Meta {
    pub(crate) root: NodeId,
    pub(crate) height: u32,
    pub(crate) next_seq: u64,
}

#[derive(Error, Debug)]
pub(crate) enum ValidationError {
    #[error("the metadata record is malformed")]
    Invalid,
    #[error("the metadata format version is mismatched")]
    VersionMismatched,
    #[error("the metadata checksum is mismatched")]
    ChecksumMismatched,
}

impl From<std::io::Error> for ValidationError {
    #[inline]
    fn from(_: std::io::Error) -> Self {
        Self::Invalid
    }
}

impl Meta {
    /// The metadata of a freshly initialized tree: an empty leaf root.
    #[inline]
    pub(crate) fn bootstrap() -> Self {
        Self {
            root: NodeId::initial_root(),
            height: 0,
            next_seq: 0,
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(26 + self.root.as_bytes().len());
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.next_seq.to_le_bytes());
        buf.extend_from_slice(&(self.root.as_bytes().len() as u16).to_le_bytes());
        buf.extend_from_slice(self.root.as_bytes());
        buf.extend_from_slice(&crc32fast::hash(&buf).to_le_bytes());
        buf
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, ValidationError> {
        let Some(body_len) = bytes.len().checked_sub(4) else {
            return Err(ValidationError::Invalid);
        };
        let (body, tail) = bytes.split_at(body_len);

        let mut reader = Cursor::new(body);
        if reader.read_u32::<LittleEndian>()? != MAGIC {
            return Err(ValidationError::Invalid);
        }
        if reader.read_u32::<LittleEndian>()? != VERSION {
            return Err(ValidationError::VersionMismatched);
        }
        let mut checksum = [0; 4];
        checksum.copy_from_slice(tail);
        if u32::from_le_bytes(checksum) != crc32fast::hash(body) {
            return Err(ValidationError::ChecksumMismatched);
        }

        let height = reader.read_u32::<LittleEndian>()?;
        let next_seq = reader.read_u64::<LittleEndian>()?;
        let root_len = reader.read_u16::<LittleEndian>()? as usize;
        let mut root = vec![0; root_len];
        reader.read_exact(&mut root)?;

        Ok(Self {
            root: NodeId::from_bytes(root),
            height,
            next_seq,
        })
    }
}
