use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::bptree::{
    node::{put_bytes, take_bytes, NodeError, NodeId, LEAF_TAG},
    search,
};

/// A terminal node: user keys with their values in positional
/// correspondence, plus the pointer to the immediate right-sibling leaf that
/// forms the sibling chain used by range scans.
///
/// The default value is the zero-entry leaf, which is also how a missing
/// record reads back from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub(crate) keys: Vec<Vec<u8>>,
    pub(crate) values: Vec<Vec<u8>>,
    pub(crate) next: Option<NodeId>,
}

impl Leaf {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn get(&self, key: &[u8]) -> Option<&[u8]> {
        search::leaf_position(&self.keys, key)
            .ok()
            .map(|index| self.values[index].as_slice())
    }

    /// Inserts a new pair at `index`, keeping keys and values aligned.
    #[inline]
    pub(crate) fn splice(&mut self, index: usize, key: Vec<u8>, value: Vec<u8>) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Removes the pair for `key` if present.
    #[inline]
    pub(crate) fn remove(&mut self, key: &[u8]) -> bool {
        match search::leaf_position(&self.keys, key) {
            Ok(index) => {
                self.keys.remove(index);
                self.values.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Splits off the upper half as a new right sibling, which inherits this
    /// leaf's `next`. The caller re-points `next` at the new sibling's
    /// identifier; the separator to promote is the new sibling's first key.
    pub(crate) fn split(&mut self) -> Leaf {
        let mid = self.len() / 2;
        Leaf {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
            next: self.next.take(),
        }
    }

    /// Fuses the right sibling into this leaf, taking over its chain pointer.
    pub(crate) fn merge_right(&mut self, mut right: Leaf) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
        self.next = right.next;
    }

    #[inline]
    pub(crate) fn take_first(&mut self) -> (Vec<u8>, Vec<u8>) {
        (self.keys.remove(0), self.values.remove(0))
    }

    #[inline]
    pub(crate) fn take_last(&mut self) -> (Vec<u8>, Vec<u8>) {
        let key = self.keys.pop().expect("borrow donor cannot be empty");
        let value = self.values.pop().expect("borrow donor cannot be empty");
        (key, value)
    }

    #[inline]
    pub(crate) fn push_front(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.splice(0, key, value);
    }

    #[inline]
    pub(crate) fn push_back(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.keys.push(key);
        self.values.push(value);
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut buf = vec![LEAF_TAG];
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for (key, value) in self.keys.iter().zip(&self.values) {
            put_bytes(&mut buf, key);
            put_bytes(&mut buf, value);
        }
        match &self.next {
            Some(id) => {
                buf.push(1);
                put_bytes(&mut buf, id.as_bytes());
            }
            None => buf.push(0),
        }
        buf
    }

    pub(crate) fn decode_body(reader: &mut Cursor<&[u8]>) -> Result<Self, NodeError> {
        let count = reader.read_u32::<LittleEndian>()? as usize;
        let mut leaf = Leaf::default();
        for _ in 0..count {
            leaf.keys.push(take_bytes(reader)?);
            leaf.values.push(take_bytes(reader)?);
        }
        if reader.read_u8()? != 0 {
            leaf.next = Some(NodeId::from_bytes(take_bytes(reader)?));
        }
        Ok(leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::Leaf;
    use crate::bptree::node::NodeId;

    fn filled(keys: &[&[u8]]) -> Leaf {
        let mut leaf = Leaf::default();
        for key in keys {
            leaf.push_back(key.to_vec(), key.to_vec());
        }
        leaf
    }

    #[test]
    fn test_split_keeps_chain() {
        let mut leaf = filled(&[b"a", b"b", b"c", b"d", b"e"]);
        leaf.next = Some(NodeId::leaf(9));

        let right = leaf.split();
        assert_eq!(leaf.keys, [b"a", b"b"]);
        assert_eq!(right.keys, [b"c", b"d", b"e"]);
        // The new sibling takes over the old chain pointer.
        assert_eq!(right.next, Some(NodeId::leaf(9)));
        assert_eq!(leaf.next, None);
        // The separator to promote is the new sibling's first key.
        assert_eq!(right.keys[0], b"c");
    }

    #[test]
    fn test_merge_right() {
        let mut left = filled(&[b"a", b"b"]);
        let mut right = filled(&[b"c", b"d"]);
        right.next = Some(NodeId::leaf(3));

        left.merge_right(right);
        assert_eq!(left.keys, [b"a", b"b", b"c", b"d"]);
        assert_eq!(left.values.len(), 4);
        assert_eq!(left.next, Some(NodeId::leaf(3)));
    }

    #[test]
    fn test_borrow_helpers() {
        let mut donor = filled(&[b"a", b"b", b"c"]);
        let mut taker = filled(&[b"d"]);

        let (key, value) = donor.take_last();
        taker.push_front(key, value);
        assert_eq!(donor.keys, [b"a", b"b"]);
        assert_eq!(taker.keys, [b"c", b"d"]);
        assert_eq!(taker.values, [b"c", b"d"]);

        let (key, value) = taker.take_first();
        donor.push_back(key, value);
        assert_eq!(donor.keys, [b"a", b"b", b"c"]);
        assert_eq!(taker.keys, [b"d"]);
    }

    #[test]
    fn test_remove() {
        let mut leaf = filled(&[b"a", b"b", b"c"]);
        assert!(leaf.remove(b"b"));
        assert!(!leaf.remove(b"b"));
        assert_eq!(leaf.keys, [b"a", b"c"]);
        assert_eq!(leaf.values, [b"a", b"c"]);
    }
}
