use std::mem;

use crate::{
    bptree::{branch::Branch, leaf::Leaf, node::NodeId, BPTree},
    error::Result,
    store::{Batch, Store},
};

impl<S> BPTree<S>
where
    S: Store,
{
    /// Removes a single key, repairing underflow along the way back up.
    /// Removing an absent key is a no-op. All writes commit in one batch.
    pub(crate) fn remove(&mut self, key: &[u8]) -> Result<()> {
        let mut batch = Batch::new();
        let root_id = self.meta.root.clone();

        if self.meta.height == 0 {
            // The root is a leaf and is allowed to underflow to empty.
            let mut leaf = self.leaf(&root_id)?;
            if leaf.remove(key) {
                batch.set(root_id.as_bytes(), leaf.encode());
            }
        } else {
            let mut root = self.branch(&root_id)?;
            if self.remove_at(&mut root, self.meta.height, key, &mut batch)? {
                if root.keys.is_empty() {
                    // A key-empty branch root has a single child left;
                    // demote it to the new root.
                    let survivor = root.children[0].clone();
                    batch.delete(root_id.as_bytes());
                    tracing::trace!(root = %survivor, height = self.meta.height - 1, "demoted root");
                    self.meta.root = survivor;
                    self.meta.height -= 1;
                    self.meta_dirty = true;
                } else {
                    batch.set(root_id.as_bytes(), root.encode());
                }
            }
        }

        self.flush(batch)
    }

    /// Recursive descent for remove, holding the parent while the child one
    /// level down is edited. Returns whether anything changed. The parent
    /// itself is left for the caller to persist or repair.
    fn remove_at(
        &mut self,
        parent: &mut Branch,
        level: u32,
        key: &[u8],
        batch: &mut Batch,
    ) -> Result<bool> {
        let index = parent.child_index(key);
        let child_id = parent.children[index].clone();

        if level == 1 {
            let mut child = self.leaf(&child_id)?;
            if !child.remove(key) {
                return Ok(false);
            }
            if child.len() >= self.min_leaf_keys() {
                batch.set(child_id.as_bytes(), child.encode());
            } else {
                self.repair_leaf(parent, index, child_id, child, batch)?;
            }
        } else {
            let mut child = self.branch(&child_id)?;
            if !self.remove_at(&mut child, level - 1, key, batch)? {
                return Ok(false);
            }
            if child.len() >= self.min_branch_keys() {
                batch.set(child_id.as_bytes(), child.encode());
            } else {
                self.repair_branch(parent, index, child_id, child, batch)?;
            }
        }
        Ok(true)
    }

    /// Repairs an underflowing leaf at `index` under `parent`: borrow from
    /// the left sibling, else from the right, else merge left, else right.
    fn repair_leaf(
        &mut self,
        parent: &mut Branch,
        index: usize,
        child_id: NodeId,
        mut child: Leaf,
        batch: &mut Batch,
    ) -> Result<()> {
        let mut left = match index {
            0 => None,
            _ => {
                let id = parent.children[index - 1].clone();
                let leaf = self.leaf(&id)?;
                Some((id, leaf))
            }
        };
        if let Some((left_id, left)) = left.as_mut() {
            if left.len() > self.min_leaf_keys() {
                let (key, value) = left.take_last();
                child.push_front(key, value);
                // The boundary separator becomes the new smallest key on the
                // right side of it.
                parent.keys[index - 1] = child.keys[0].clone();
                batch.set(left_id.as_bytes(), left.encode());
                batch.set(child_id.as_bytes(), child.encode());
                tracing::trace!(donor = %left_id, taker = %child_id, "borrowed from left leaf");
                return Ok(());
            }
        }

        let mut right = match parent.children.get(index + 1) {
            Some(id) => {
                let id = id.clone();
                let leaf = self.leaf(&id)?;
                Some((id, leaf))
            }
            None => None,
        };
        if let Some((right_id, right)) = right.as_mut() {
            if right.len() > self.min_leaf_keys() {
                let (key, value) = right.take_first();
                child.push_back(key, value);
                parent.keys[index] = right.keys[0].clone();
                batch.set(right_id.as_bytes(), right.encode());
                batch.set(child_id.as_bytes(), child.encode());
                tracing::trace!(donor = %right_id, taker = %child_id, "borrowed from right leaf");
                return Ok(());
            }
        }

        if let Some((left_id, mut left)) = left {
            left.merge_right(child);
            batch.set(left_id.as_bytes(), left.encode());
            batch.delete(child_id.as_bytes());
            parent.remove_entry(index - 1);
            tracing::trace!(survivor = %left_id, merged = %child_id, "merged leaves");
            return Ok(());
        }

        let (right_id, right) = right.expect("a non-root node always has a sibling");
        child.merge_right(right);
        batch.set(child_id.as_bytes(), child.encode());
        batch.delete(right_id.as_bytes());
        parent.remove_entry(index);
        tracing::trace!(survivor = %child_id, merged = %right_id, "merged leaves");
        Ok(())
    }

    /// Repairs an underflowing branch at `index` under `parent`. Borrowing
    /// rotates through the parent: the donor's boundary child moves over, the
    /// parent's boundary separator moves down, and the donor's boundary key
    /// moves up to replace it.
    fn repair_branch(
        &mut self,
        parent: &mut Branch,
        index: usize,
        child_id: NodeId,
        mut child: Branch,
        batch: &mut Batch,
    ) -> Result<()> {
        let mut left = match index {
            0 => None,
            _ => {
                let id = parent.children[index - 1].clone();
                let branch = self.branch(&id)?;
                Some((id, branch))
            }
        };
        if let Some((left_id, left)) = left.as_mut() {
            if left.len() > self.min_branch_keys() {
                let donated = left.children.pop().expect("borrow donor cannot be empty");
                let lifted = left.keys.pop().expect("borrow donor cannot be empty");
                let lowered = mem::replace(&mut parent.keys[index - 1], lifted);
                child.children.insert(0, donated);
                child.keys.insert(0, lowered);
                batch.set(left_id.as_bytes(), left.encode());
                batch.set(child_id.as_bytes(), child.encode());
                tracing::trace!(donor = %left_id, taker = %child_id, "borrowed from left branch");
                return Ok(());
            }
        }

        let mut right = match parent.children.get(index + 1) {
            Some(id) => {
                let id = id.clone();
                let branch = self.branch(&id)?;
                Some((id, branch))
            }
            None => None,
        };
        if let Some((right_id, right)) = right.as_mut() {
            if right.len() > self.min_branch_keys() {
                let donated = right.children.remove(0);
                let lifted = right.keys.remove(0);
                let lowered = mem::replace(&mut parent.keys[index], lifted);
                child.children.push(donated);
                child.keys.push(lowered);
                batch.set(right_id.as_bytes(), right.encode());
                batch.set(child_id.as_bytes(), child.encode());
                tracing::trace!(donor = %right_id, taker = %child_id, "borrowed from right branch");
                return Ok(());
            }
        }

        if let Some((left_id, mut left)) = left {
            let separator = parent.keys[index - 1].clone();
            left.merge_right(separator, child);
            batch.set(left_id.as_bytes(), left.encode());
            batch.delete(child_id.as_bytes());
            parent.remove_entry(index - 1);
            tracing::trace!(survivor = %left_id, merged = %child_id, "merged branches");
            return Ok(());
        }

        let (right_id, right) = right.expect("a non-root node always has a sibling");
        let separator = parent.keys[index].clone();
        child.merge_right(separator, right);
        batch.set(child_id.as_bytes(), child.encode());
        batch.delete(right_id.as_bytes());
        parent.remove_entry(index);
        tracing::trace!(survivor = %child_id, merged = %right_id, "merged branches");
        Ok(())
    }
}
