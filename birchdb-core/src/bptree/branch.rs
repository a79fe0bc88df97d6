use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::bptree::{
    node::{put_bytes, take_bytes, NodeError, NodeId, BRANCH_TAG},
    search,
};

/// An internal node: `n` separator keys and `n + 1` child identifiers.
///
/// Child `i` holds entries with keys below `keys[i]`; the last child holds
/// everything at or above the last separator. Each separator equals the
/// smallest key reachable under the child to its right, as produced by leaf
/// splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Branch {
    pub(crate) keys: Vec<Vec<u8>>,
    pub(crate) children: Vec<NodeId>,
}

impl Branch {
    /// A fresh root over a just-split pair of children.
    #[inline]
    pub(crate) fn new_root(separator: Vec<u8>, left: NodeId, right: NodeId) -> Self {
        Self {
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// The child to descend into for `key`.
    #[inline]
    pub(crate) fn child_index(&self, key: &[u8]) -> usize {
        search::child_index(&self.keys, key)
    }

    /// Splices in the promotion from a child split at `index`: the separator
    /// sits at `index` and the new right sibling at `index + 1`, keeping
    /// separators and children aligned.
    #[inline]
    pub(crate) fn insert_split(&mut self, index: usize, separator: Vec<u8>, right: NodeId) {
        self.keys.insert(index, separator);
        self.children.insert(index + 1, right);
    }

    /// Drops the separator at `sep_index` together with the child to its
    /// right, after that child was merged away.
    #[inline]
    pub(crate) fn remove_entry(&mut self, sep_index: usize) {
        self.keys.remove(sep_index);
        self.children.remove(sep_index + 1);
    }

    /// Splits off the upper half as a new right sibling. The middle key is
    /// extracted as the separator to promote and remains in neither half.
    pub(crate) fn split(&mut self) -> (Vec<u8>, Branch) {
        let mid = self.len() / 2;
        let right = Branch {
            keys: self.keys.split_off(mid + 1),
            children: self.children.split_off(mid + 1),
        };
        let separator = self.keys.pop().expect("split of a non-empty branch");
        (separator, right)
    }

    /// Fuses the right sibling into this branch, with the parent separator
    /// that stood between them re-joining the key sequence.
    pub(crate) fn merge_right(&mut self, separator: Vec<u8>, mut right: Branch) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut buf = vec![BRANCH_TAG];
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for key in &self.keys {
            put_bytes(&mut buf, key);
        }
        for child in &self.children {
            put_bytes(&mut buf, child.as_bytes());
        }
        buf
    }

    pub(crate) fn decode_body(reader: &mut Cursor<&[u8]>) -> Result<Self, NodeError> {
        let count = reader.read_u32::<LittleEndian>()? as usize;
        let mut keys = Vec::new();
        for _ in 0..count {
            keys.push(take_bytes(reader)?);
        }
        let mut children = Vec::new();
        for _ in 0..count + 1 {
            children.push(NodeId::from_bytes(take_bytes(reader)?));
        }
        Ok(Branch { keys, children })
    }
}

#[cfg(test)]
mod tests {
    use super::Branch;
    use crate::bptree::node::NodeId;

    fn filled(count: u64) -> Branch {
        // Separators "1", "3", "5", ... with children numbered 0..=count.
        let mut branch = Branch::new_root(b"1".to_vec(), NodeId::leaf(0), NodeId::leaf(1));
        for i in 1..count {
            let key = format!("{}", 2 * i + 1).into_bytes();
            branch.insert_split(i as usize, key, NodeId::leaf(i + 1));
        }
        branch
    }

    #[test]
    fn test_split_extracts_separator() {
        let mut branch = filled(5);
        assert_eq!(branch.keys, [b"1", b"3", b"5", b"7", b"9"]);

        let (separator, right) = branch.split();
        assert_eq!(separator, b"5");
        assert_eq!(branch.keys, [b"1", b"3"]);
        assert_eq!(branch.children.len(), 3);
        assert_eq!(right.keys, [b"7", b"9"]);
        assert_eq!(right.children.len(), 3);
        assert_eq!(right.children[0], NodeId::leaf(3));
    }

    #[test]
    fn test_merge_right_restores_split() {
        let mut branch = filled(5);
        let original = branch.clone();

        let (separator, right) = branch.split();
        branch.merge_right(separator, right);
        assert_eq!(branch, original);
    }

    #[test]
    fn test_remove_entry_keeps_alignment() {
        let mut branch = filled(3);
        branch.remove_entry(1);
        assert_eq!(branch.keys, [b"1", b"5"]);
        assert_eq!(
            branch.children,
            [NodeId::leaf(0), NodeId::leaf(1), NodeId::leaf(3)]
        );
    }
}
