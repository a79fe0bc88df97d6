use crate::{
    bptree::{debug::TreeStats, BPTree},
    error::Result,
    store::{Batch, ListArgs, Store},
    DEFAULT_MAX_INTERNAL_SIZE, DEFAULT_MAX_LEAF_SIZE,
};

/// The options for configuring a BirchDB instance.
#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) max_leaf_size: usize,
    pub(crate) max_internal_size: usize,
}

impl Options {
    /// Creates a new Options instance with default values.
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the split threshold for leaves: a leaf holds at most this many
    /// entries. Must be at least 2.
    #[inline]
    pub fn max_leaf_size(&mut self, size: usize) -> &mut Self {
        self.max_leaf_size = size;
        self
    }

    /// Set the split threshold for internal nodes: a branch holds at most
    /// this many separator keys. Must be at least 2.
    #[inline]
    pub fn max_internal_size(&mut self, size: usize) -> &mut Self {
        self.max_internal_size = size;
        self
    }

    /// Open a BirchDB instance over the given backing store with the current
    /// options.
    #[inline]
    pub fn open<S>(&self, store: S) -> Result<BirchDB<S>>
    where
        S: Store,
    {
        BirchDB::open_with_options(store, self.clone())
    }
}

impl Default for Options {
    #[inline]
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_internal_size: DEFAULT_MAX_INTERNAL_SIZE,
        }
    }
}

/// A B+ tree index over an ordered key-value store.
///
/// The tree exposes the same contract it consumes (see [`Store`]), adding
/// logarithmic-depth navigation over a backing store whose natural lookup is
/// exact-key only. It relies only on `get` and `write` of its backing store.
///
/// At most one mutating operation may be in flight at a time, and readers
/// that overlap a mutation observe an undefined intermediate state; callers
/// synchronize externally.
pub struct BirchDB<S> {
    tree: BPTree<S>,
}

impl<S> BirchDB<S>
where
    S: Store,
{
    /// Open a BirchDB instance over the given backing store with default
    /// options, adopting a tree already persisted there or initializing an
    /// empty one.
    #[inline]
    pub fn open(store: S) -> Result<Self> {
        Self::open_with_options(store, Options::default())
    }

    /// Open a BirchDB instance over the given backing store with the
    /// provided options.
    pub fn open_with_options(store: S, options: Options) -> Result<Self> {
        let tree = BPTree::open(store, options.max_leaf_size, options.max_internal_size)?;
        Ok(Self { tree })
    }

    /// Get the value associated with a given key.
    #[inline]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.tree.get(key.as_ref())
    }

    /// Check if the tree contains a given key.
    #[inline]
    pub fn contains(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.get(key).map(|value| value.is_some())
    }

    /// Insert or update a single key-value pair.
    #[inline]
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let mut batch = Batch::new();
        batch.set(key, value);
        self.write(batch)
    }

    /// Delete a single key. Deleting an absent key is a no-op.
    #[inline]
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.write(batch)
    }

    /// Apply a batch: all sets in their listed order, then all deletes.
    /// Within the batch the last writer wins; there is no rollback on
    /// partial failure.
    pub fn write(&mut self, batch: Batch) -> Result<()> {
        for (key, value) in batch.sets() {
            self.tree.insert(key, value)?;
        }
        for key in batch.deletes() {
            self.tree.remove(key)?;
        }
        Ok(())
    }

    /// Ordered enumeration of the key-value pairs satisfying `args`.
    #[inline]
    pub fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.tree.list(args)
    }

    /// Returns the backing store.
    #[inline]
    pub fn store(&self) -> &S {
        self.tree.as_store()
    }

    /// Consumes the tree, returning the backing store.
    #[inline]
    pub fn into_store(self) -> S {
        self.tree.into_store()
    }

    /// Get a debugger for the tree.
    #[inline]
    pub fn debugger(&self) -> Debugger<'_, S> {
        Debugger { tree: &self.tree }
    }
}

impl<S> Store for BirchDB<S>
where
    S: Store,
{
    #[inline]
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        BirchDB::get(self, key)
    }

    #[inline]
    fn write(&mut self, batch: Batch) -> Result<()> {
        BirchDB::write(self, batch)
    }

    #[inline]
    fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        BirchDB::list(self, args)
    }
}

/// Read-only structural introspection over a [`BirchDB`].
pub struct Debugger<'a, S> {
    tree: &'a BPTree<S>,
}

impl<S> Debugger<'_, S>
where
    S: Store,
{
    /// Number of internal hops from the root to any leaf.
    #[inline]
    pub fn height(&self) -> u32 {
        self.tree.height()
    }

    /// Renders the tree shape for inspection.
    #[inline]
    pub fn dump(&self) -> Result<String> {
        self.tree.dump()
    }

    /// Walks the whole tree, panicking on any violated structural invariant
    /// and returning occupancy statistics otherwise.
    #[inline]
    pub fn verify(&self) -> Result<TreeStats> {
        self.tree.verify()
    }
}
