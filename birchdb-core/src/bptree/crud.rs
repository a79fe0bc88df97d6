use crate::{
    bptree::{branch::Branch, leaf::Leaf, node::NodeId, search, BPTree},
    error::Result,
    store::{Batch, Store},
};

impl<S> BPTree<S>
where
    S: Store,
{
    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let leaf = self.leaf_for(key)?;
        Ok(leaf.get(key).map(<[u8]>::to_vec))
    }

    /// Descends from the root to the leaf that would contain `key`.
    pub(crate) fn leaf_for(&self, key: &[u8]) -> Result<Leaf> {
        let mut id = self.meta.root.clone();
        for _ in 0..self.meta.height {
            let branch = self.branch(&id)?;
            id = branch.children[branch.child_index(key)].clone();
        }
        self.leaf(&id)
    }

    /// Inserts or updates a single pair, splitting along the way back up as
    /// needed. All writes commit in one batch.
    pub(crate) fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        let root = self.meta.root.clone();

        if let Some((separator, right)) = self.insert_at(&root, self.meta.height, key, value, &mut batch)? {
            // The split reached the root: grow a fresh branch root over the
            // two halves.
            let new_root = self.alloc_branch_id();
            let node = Branch::new_root(separator, root, right);
            batch.set(new_root.as_bytes(), node.encode());
            tracing::trace!(root = %new_root, height = self.meta.height + 1, "grew new root");
            self.meta.root = new_root;
            self.meta.height += 1;
            self.meta_dirty = true;
        }

        self.flush(batch)
    }

    /// Recursive descent for insert. `level == 0` is the leaf level. Returns
    /// the promotion `(separator, new right sibling)` when the node split.
    fn insert_at(
        &mut self,
        id: &NodeId,
        level: u32,
        key: &[u8],
        value: &[u8],
        batch: &mut Batch,
    ) -> Result<Option<(Vec<u8>, NodeId)>> {
        if level == 0 {
            let mut leaf = self.leaf(id)?;

            match search::leaf_position(&leaf.keys, key) {
                Ok(index) => {
                    // Existing key: overwrite the value in place.
                    leaf.values[index] = value.to_vec();
                    batch.set(id.as_bytes(), leaf.encode());
                    return Ok(None);
                }
                Err(index) => leaf.splice(index, key.to_vec(), value.to_vec()),
            }

            if leaf.len() <= self.max_leaf {
                batch.set(id.as_bytes(), leaf.encode());
                return Ok(None);
            }

            let right_id = self.alloc_leaf_id();
            let right = leaf.split();
            leaf.next = Some(right_id.clone());
            // Leaves keep both halves of the user data, so the separator is a
            // copy of the right half's first key.
            let separator = right.keys[0].clone();

            batch.set(id.as_bytes(), leaf.encode());
            batch.set(right_id.as_bytes(), right.encode());
            tracing::trace!(left = %id, right = %right_id, "split leaf");

            Ok(Some((separator, right_id)))
        } else {
            let mut branch = self.branch(id)?;
            let index = branch.child_index(key);
            let child = branch.children[index].clone();

            let Some((separator, right)) = self.insert_at(&child, level - 1, key, value, batch)?
            else {
                return Ok(None);
            };

            branch.insert_split(index, separator, right);
            if branch.len() <= self.max_branch {
                batch.set(id.as_bytes(), branch.encode());
                return Ok(None);
            }

            let right_id = self.alloc_branch_id();
            let (separator, right) = branch.split();

            batch.set(id.as_bytes(), branch.encode());
            batch.set(right_id.as_bytes(), right.encode());
            tracing::trace!(left = %id, right = %right_id, "split branch");

            Ok(Some((separator, right_id)))
        }
    }
}
