use std::{
    fmt::{self, Display, Formatter},
    io::{Cursor, Read},
};

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

use crate::bptree::{branch::Branch, leaf::Leaf};

/// Identifier prefix for leaf node records in the backing store.
pub const LEAF_PREFIX: &[u8] = b"l:";
/// Identifier prefix for branch (internal) node records in the backing store.
pub const BRANCH_PREFIX: &[u8] = b"b:";

pub(crate) const LEAF_TAG: u8 = 0;
pub(crate) const BRANCH_TAG: u8 = 1;

/// An opaque node identifier, which is also a key in the backing store.
///
/// Identifiers carry a two-byte depth prefix so that external inspection can
/// scan one level of the tree at a time. The prefix is advisory; the
/// authoritative role of a node is the tag in its serialized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeId(Vec<u8>);

impl NodeId {
    /// The identifier of the empty leaf written on first initialization.
    /// After the first root split it may persist as an ordinary leaf but is
    /// no longer the root.
    #[inline]
    pub(crate) fn initial_root() -> Self {
        Self(b"l:root".to_vec())
    }

    #[inline]
    pub(crate) fn leaf(seq: u64) -> Self {
        Self(format!("l:{seq:016x}").into_bytes())
    }

    #[inline]
    pub(crate) fn branch(seq: u64) -> Self {
        Self(format!("b:{seq:016x}").into_bytes())
    }

    #[inline]
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for NodeId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Error cases raised while materializing a node from the backing store.
#[derive(Error, Debug)]
pub(crate) enum NodeError {
    #[error("the node body is truncated")]
    Truncated,
    #[error("unknown node tag: {0}")]
    UnknownTag(u8),
    #[error("a branch record is missing from the backing store")]
    MissingBranch,
    #[error("found a leaf where a branch was required")]
    NotABranch,
    #[error("found a branch where a leaf was required")]
    NotALeaf,
}

impl From<std::io::Error> for NodeError {
    #[inline]
    fn from(_: std::io::Error) -> Self {
        Self::Truncated
    }
}

/// A materialized node body. Every persisted body carries its own tag byte,
/// so the codec always produces the right variant regardless of how the
/// record was reached.
pub(crate) enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

impl Node {
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, NodeError> {
        let mut reader = Cursor::new(bytes);
        match reader.read_u8()? {
            LEAF_TAG => Leaf::decode_body(&mut reader).map(Self::Leaf),
            BRANCH_TAG => Branch::decode_body(&mut reader).map(Self::Branch),
            tag => Err(NodeError::UnknownTag(tag)),
        }
    }
}

/// Appends a length-prefixed byte string to a node body.
#[inline]
pub(crate) fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// Reads a length-prefixed byte string from a node body.
#[inline]
pub(crate) fn take_bytes(reader: &mut Cursor<&[u8]>) -> Result<Vec<u8>, NodeError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len as u64 > reader.get_ref().len() as u64 {
        return Err(NodeError::Truncated);
    }
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}
