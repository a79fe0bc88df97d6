pub(crate) mod branch;
pub(crate) mod debug;
pub(crate) mod leaf;
pub(crate) mod node;

mod crud;
mod rebalance;
mod scan;
mod search;

use crate::{
    bptree::{
        branch::Branch,
        leaf::Leaf,
        node::{Node, NodeError, NodeId},
    },
    error::Result,
    meta::{Meta, METADATA_KEY},
    store::{Batch, Store},
};

/// The B+ tree engine. All tree algorithms are implemented here, spread over
/// [`crud`], [`rebalance`], [`scan`] and [`debug`].
///
/// The engine holds no node cache: every operation re-fetches the nodes it
/// touches from the backing store. In-memory state is limited to a copy of
/// the metadata record, flushed back whenever it changes.
pub(crate) struct BPTree<S> {
    store: S,
    meta: Meta,
    meta_dirty: bool,
    max_leaf: usize,
    max_branch: usize,
}

impl<S> BPTree<S> {
    #[inline]
    pub(crate) fn as_store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub(crate) fn into_store(self) -> S {
        self.store
    }

    #[inline]
    pub(crate) fn height(&self) -> u32 {
        self.meta.height
    }

    /// The underflow threshold for leaves: fewer keys than this triggers
    /// repair.
    #[inline]
    fn min_leaf_keys(&self) -> usize {
        (self.max_leaf + 1) / 2
    }

    /// The underflow threshold for branches. Parameterized separately from
    /// leaves so mixed fan-out bounds repair against the right limit.
    #[inline]
    fn min_branch_keys(&self) -> usize {
        (self.max_branch + 1) / 2
    }
}

impl<S> BPTree<S>
where
    S: Store,
{
    /// Adopts the tree persisted in `store`, or initializes an empty one by
    /// atomically writing the empty root leaf and the metadata record.
    pub(crate) fn open(mut store: S, max_leaf: usize, max_branch: usize) -> Result<Self> {
        assert!(
            max_leaf >= 2 && max_branch >= 2,
            "fan-out bounds must be at least 2"
        );

        let meta = match store.get(METADATA_KEY)? {
            Some(bytes) => Meta::decode(&bytes)?,
            None => {
                let meta = Meta::bootstrap();
                let mut batch = Batch::new();
                batch.set(meta.root.as_bytes(), Leaf::default().encode());
                batch.set(METADATA_KEY, meta.encode());
                store.write(batch)?;
                tracing::debug!(root = %meta.root, "initialized empty tree");
                meta
            }
        };

        Ok(Self {
            store,
            meta,
            meta_dirty: false,
            max_leaf,
            max_branch,
        })
    }

    /// Reads a leaf record. A missing or empty record reads as the
    /// zero-entry leaf, which is what a freshly initialized root looks like
    /// before any write.
    fn leaf(&self, id: &NodeId) -> Result<Leaf> {
        match self.store.get(id.as_bytes())? {
            Some(bytes) if !bytes.is_empty() => match Node::decode(&bytes)? {
                Node::Leaf(leaf) => Ok(leaf),
                Node::Branch(_) => Err(NodeError::NotALeaf.into()),
            },
            _ => Ok(Leaf::default()),
        }
    }

    /// Reads a branch record. Branches only exist after a split was durably
    /// written, so a missing record is corruption rather than cold start.
    fn branch(&self, id: &NodeId) -> Result<Branch> {
        match self.store.get(id.as_bytes())? {
            Some(bytes) => match Node::decode(&bytes)? {
                Node::Branch(branch) => Ok(branch),
                Node::Leaf(_) => Err(NodeError::NotABranch.into()),
            },
            None => Err(NodeError::MissingBranch.into()),
        }
    }

    #[inline]
    fn alloc_leaf_id(&mut self) -> NodeId {
        NodeId::leaf(self.next_seq())
    }

    #[inline]
    fn alloc_branch_id(&mut self) -> NodeId {
        NodeId::branch(self.next_seq())
    }

    #[inline]
    fn next_seq(&mut self) -> u64 {
        let seq = self.meta.next_seq;
        self.meta.next_seq += 1;
        self.meta_dirty = true;
        seq
    }

    /// Commits the writes of one mutation in a single batch, folding in the
    /// metadata record when it changed.
    fn flush(&mut self, mut batch: Batch) -> Result<()> {
        if self.meta_dirty {
            batch.set(METADATA_KEY, self.meta.encode());
        }
        if !batch.is_empty() {
            self.store.write(batch)?;
        }
        self.meta_dirty = false;
        Ok(())
    }
}
