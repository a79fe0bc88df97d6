use std::cmp::Ordering;

use crate::error::Result;

/// A total order on keys, used by [`MemStore`] to sort its entries.
///
/// The default is byte-lexicographic order. The tree itself always navigates
/// by byte order; a custom comparator only affects the store it is given to.
pub type Comparator = fn(&[u8], &[u8]) -> Ordering;

#[inline]
pub(crate) fn byte_order(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// An ordered byte-string key-value store.
///
/// This is the contract the tree consumes from its backing store and the one
/// it exposes itself, which makes trees stackable: a [`BirchDB`] is a valid
/// backing store for another [`BirchDB`].
///
/// The tree relies only on `get` and `write` of its backing store; `list` is
/// part of the contract for external callers. A batch applies its `set`
/// entries first, in order, then its `delete` entries, in order.
///
/// [`BirchDB`]: crate::BirchDB
pub trait Store {
    /// Get the value associated with a given key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply a batch of writes: all sets in order, then all deletes in order.
    fn write(&mut self, batch: Batch) -> Result<()>;

    /// Ordered enumeration of the key-value pairs satisfying `args`.
    fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Insert or update a single key-value pair.
    #[inline]
    fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()>
    where
        Self: Sized,
    {
        let mut batch = Batch::new();
        batch.set(key, value);
        self.write(batch)
    }

    /// Delete a single key. Deleting an absent key is a no-op.
    #[inline]
    fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<()>
    where
        Self: Sized,
    {
        let mut batch = Batch::new();
        batch.delete(key);
        self.write(batch)
    }
}

/// An ordered collection of writes applied through [`Store::write`].
///
/// ```
/// use birchdb::Batch;
///
/// let mut batch = Batch::new();
/// batch.set(b"a", b"1").set(b"b", b"2").delete(b"stale");
/// assert_eq!(batch.sets().len(), 2);
/// assert_eq!(batch.deletes().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Batch {
    set: Vec<(Vec<u8>, Vec<u8>)>,
    delete: Vec<Vec<u8>>,
}

impl Batch {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Queue a key-value pair for insertion or update.
    #[inline]
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> &mut Self {
        self.set.push((key.as_ref().to_vec(), value.as_ref().to_vec()));
        self
    }

    /// Queue a key for deletion.
    #[inline]
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> &mut Self {
        self.delete.push(key.as_ref().to_vec());
        self
    }

    /// The queued sets, in application order.
    #[inline]
    pub fn sets(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.set
    }

    /// The queued deletes, applied after all sets.
    #[inline]
    pub fn deletes(&self) -> &[Vec<u8>] {
        &self.delete
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }

    /// Consumes the batch into its `(sets, deletes)` parts, for store
    /// implementations that want owned data.
    #[inline]
    pub fn into_parts(self) -> (Vec<(Vec<u8>, Vec<u8>)>, Vec<Vec<u8>>) {
        (self.set, self.delete)
    }
}

/// Bounds and shaping options for [`Store::list`].
///
/// `gt`/`gte` and `lt`/`lte` are mutually exclusive per side; supplying both
/// for the same side is a user error and yields an empty result (with a
/// warning through the logging hook).
///
/// Shaping applies to the collected ascending range in a fixed order:
/// `reverse` first, then `offset` entries are dropped from the front of the
/// (possibly reversed) sequence, then `limit` truncates. `reverse` with
/// `limit` therefore means "the last `limit` entries, highest first".
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Emit only keys strictly greater than this one.
    pub gt: Option<Vec<u8>>,
    /// Emit only keys greater than or equal to this one.
    pub gte: Option<Vec<u8>>,
    /// Stop before keys greater than or equal to this one.
    pub lt: Option<Vec<u8>>,
    /// Stop before keys strictly greater than this one.
    pub lte: Option<Vec<u8>>,
    /// Upper bound on the number of emitted entries.
    pub limit: Option<usize>,
    /// Entries to drop from the front of the shaped sequence.
    pub offset: usize,
    /// Reverse the collected sequence before `offset` and `limit` apply.
    pub reverse: bool,
}

impl ListArgs {
    /// Whether the bounds reject the query outright. Conflicting bounds on
    /// one side are reported through the logging hook; an inverted or
    /// open-degenerate range is silently empty.
    pub(crate) fn rejects(&self, cmp: Comparator) -> bool {
        if self.gt.is_some() && self.gte.is_some() {
            tracing::warn!("list called with both `gt` and `gte` bounds");
            return true;
        }
        if self.lt.is_some() && self.lte.is_some() {
            tracing::warn!("list called with both `lt` and `lte` bounds");
            return true;
        }

        let lower = self.gte.as_deref().or(self.gt.as_deref());
        let upper = self.lt.as_deref().or(self.lte.as_deref());
        match (lower, upper) {
            (Some(lower), Some(upper)) => match cmp(lower, upper) {
                Ordering::Greater => true,
                // A closed point query (gte == lte) is legitimate; a point
                // with an exclusive side cannot match anything.
                Ordering::Equal => self.gt.is_some() || self.lt.is_some(),
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// The key to descend with when locating the first candidate leaf.
    #[inline]
    pub(crate) fn lower_key(&self) -> &[u8] {
        self.gte
            .as_deref()
            .or(self.gt.as_deref())
            .unwrap_or_default()
    }

    #[inline]
    pub(crate) fn above_lower(&self, cmp: Comparator, key: &[u8]) -> bool {
        if let Some(gt) = &self.gt {
            cmp(key, gt) == Ordering::Greater
        } else if let Some(gte) = &self.gte {
            cmp(key, gte) != Ordering::Less
        } else {
            true
        }
    }

    #[inline]
    pub(crate) fn below_upper(&self, cmp: Comparator, key: &[u8]) -> bool {
        if let Some(lt) = &self.lt {
            cmp(key, lt) == Ordering::Less
        } else if let Some(lte) = &self.lte {
            cmp(key, lte) != Ordering::Greater
        } else {
            true
        }
    }

    /// How many entries a forward collection needs before shaping can only
    /// discard from the back. Unbounded for reverse scans, which shape from
    /// the far end of the range.
    #[inline]
    pub(crate) fn collect_cap(&self) -> Option<usize> {
        if self.reverse {
            None
        } else {
            self.limit.map(|limit| limit.saturating_add(self.offset))
        }
    }

    /// Applies `reverse`, `offset` and `limit` to the collected range.
    pub(crate) fn finish(&self, mut entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<(Vec<u8>, Vec<u8>)> {
        if self.reverse {
            entries.reverse();
        }
        if self.offset > 0 {
            entries.drain(..self.offset.min(entries.len()));
        }
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }
        entries
    }
}

/// The bundled in-memory backing store: a sorted array of key-value pairs.
///
/// Primarily useful for tests and as the reference implementation of the
/// [`Store`] contract. The sort order is byte-lexicographic unless a
/// comparator is supplied.
#[derive(Debug, Clone)]
pub struct MemStore {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    cmp: Comparator,
}

impl MemStore {
    #[inline]
    pub fn new() -> Self {
        Self::with_comparator(byte_order)
    }

    /// Creates an empty store sorted by the given comparator.
    #[inline]
    pub fn with_comparator(cmp: Comparator) -> Self {
        Self {
            entries: Vec::new(),
            cmp,
        }
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn position(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| (self.cmp)(k, key))
    }
}

impl Default for MemStore {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    #[inline]
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .position(key)
            .ok()
            .map(|index| self.entries[index].1.clone()))
    }

    fn write(&mut self, batch: Batch) -> Result<()> {
        let (sets, deletes) = batch.into_parts();
        for (key, value) in sets {
            match self.position(&key) {
                Ok(index) => self.entries[index].1 = value,
                Err(index) => self.entries.insert(index, (key, value)),
            }
        }
        for key in deletes {
            if let Ok(index) = self.position(&key) {
                self.entries.remove(index);
            }
        }
        Ok(())
    }

    fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if args.rejects(self.cmp) {
            return Ok(Vec::new());
        }

        let cap = args.collect_cap();
        let mut out = Vec::new();
        for (key, value) in &self.entries {
            if !args.above_lower(self.cmp, key) {
                continue;
            }
            if !args.below_upper(self.cmp, key) {
                break;
            }
            out.push((key.clone(), value.clone()));
            if cap.map_or(false, |cap| out.len() >= cap) {
                break;
            }
        }
        Ok(args.finish(out))
    }
}
