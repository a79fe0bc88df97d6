//! A persistent **B+ tree index** layered on top of a pluggable **ordered
//! key-value store**, written in Rust.
//!
//! `BirchDB` turns a store whose natural lookup is exact-key only into one
//! with logarithmic-depth navigation and efficient range scans. The tree
//! exposes the same ordered key-value contract it consumes (see [`Store`]),
//! so it is recursively composable: a `BirchDB` is a valid backing store for
//! another `BirchDB`.
//!
//! The tree persists itself entirely through its backing store: one record
//! per node, keyed by a depth-prefixed identifier, plus a reserved metadata
//! record (at [`METADATA_KEY`]) holding the root identifier and the height.
//! Reopening over the same store recovers the tree.
//!
//! # Open a tree
//!
//! ```
//! use birchdb::{BirchDB, MemStore, Options, Result};
//! # fn try_main() -> Result<()> {
//!
//! // The simplest way to open, with default `Options`:
//! let db = BirchDB::open(MemStore::new())?;
//!
//! // Open with `Options`:
//! let db = Options::new()
//!     .max_leaf_size(4)
//!     .max_internal_size(4)
//!     .open(MemStore::new())?;
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Get, insert, update, delete
//!
//! ```
//! # use birchdb::{BirchDB, MemStore, Result};
//! # fn try_main() -> Result<()> {
//! # let mut db = BirchDB::open(MemStore::new())?;
//! // Insert a new key-value pair.
//! db.set(b"foo", b"foo")?;
//!
//! // Check if the tree contains a given key.
//! assert!(db.contains(b"foo")?);
//! assert!(!db.contains(b"unknown")?);
//!
//! // Get the value associated with a given key.
//! assert_eq!(db.get(b"foo")?, Some(b"foo".to_vec()));
//! assert_eq!(db.get(b"unknown")?, None);
//!
//! // Update an existing value.
//! db.set(b"foo", b"bar")?;
//! assert_eq!(db.get(b"foo")?, Some(b"bar".to_vec()));
//!
//! // Delete an existing key-value pair.
//! db.delete(b"foo")?;
//! assert_eq!(db.get(b"foo")?, None);
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Batches
//!
//! A [`Batch`] applies its `set` entries first, in order, then its `delete`
//! entries. The last writer wins within a batch; there is no rollback on
//! partial failure.
//!
//! ```
//! # use birchdb::{Batch, BirchDB, MemStore, Result};
//! # fn try_main() -> Result<()> {
//! # let mut db = BirchDB::open(MemStore::new())?;
//! let mut batch = Batch::new();
//! batch.set(b"a", b"1").set(b"b", b"2").delete(b"a");
//! db.write(batch)?;
//!
//! assert_eq!(db.get(b"a")?, None);
//! assert_eq!(db.get(b"b")?, Some(b"2".to_vec()));
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Range scans
//!
//! [`ListArgs`] bounds a scan with `gt`/`gte` and `lt`/`lte` and shapes the
//! result with `reverse`, `offset` and `limit`, applied in that order. The
//! scan walks the leaf sibling chain, so it never revisits internal nodes.
//!
//! ```
//! # use birchdb::{BirchDB, ListArgs, MemStore, Result};
//! # fn try_main() -> Result<()> {
//! # let mut db = BirchDB::open(MemStore::new())?;
//! for key in ["a", "b", "c", "d"] {
//!     db.set(key, key)?;
//! }
//!
//! let range = db.list(&ListArgs {
//!     gte: Some(b"b".to_vec()),
//!     lt: Some(b"d".to_vec()),
//!     ..Default::default()
//! })?;
//! assert_eq!(range.len(), 2);
//! assert_eq!(range[0], (b"b".to_vec(), b"b".to_vec()));
//!
//! // `reverse` with `limit` means "the last N, highest first".
//! let tail = db.list(&ListArgs {
//!     reverse: true,
//!     limit: Some(2),
//!     ..Default::default()
//! })?;
//! assert_eq!(tail[0].0, b"d".to_vec());
//! assert_eq!(tail[1].0, b"c".to_vec());
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Attention
//!
//! ❗️ The tree assumes a single-writer discipline: at most one mutating
//! operation at a time, with no overlapping readers. It offers no internal
//! locking; synchronize externally if you share an instance.
//!
//! ❗️ User keys in the backing store's namespace must not collide with
//! [`METADATA_KEY`] or the [`LEAF_PREFIX`]/[`BRANCH_PREFIX`] identifier
//! space when unrelated records share the store with the tree.

mod bptree;
mod error;
mod meta;
mod store;
mod tree;

pub use crate::{
    bptree::debug::TreeStats,
    bptree::node::{BRANCH_PREFIX, LEAF_PREFIX},
    error::{Error, ErrorCode, Result},
    meta::METADATA_KEY,
    store::{Batch, Comparator, ListArgs, MemStore, Store},
    tree::{BirchDB, Debugger, Options},
};

/// The default split threshold for leaves.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 32;
/// The default split threshold for internal nodes.
pub const DEFAULT_MAX_INTERNAL_SIZE: usize = 32;
