use std::{cell::Cell, collections::BTreeMap, io, rc::Rc};

use birchdb::{
    Batch, BirchDB, Error, ErrorCode, ListArgs, MemStore, Options, Result, Store,
};
use rand::Rng;

// Here are the highest level API tests.
// Some mods also have their own tests inside.

#[test]
fn test_basic() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    db.set(b"a", b"1")?;
    db.set(b"b", b"2")?;
    db.set(b"c", b"3")?;

    assert_eq!(db.get(b"b")?, Some(b"2".to_vec()));
    assert_eq!(
        db.list(&ListArgs::default())?,
        [
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );

    db.delete(b"b")?;
    assert_eq!(
        db.list(&ListArgs::default())?,
        [
            (b"a".to_vec(), b"1".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
    Ok(())
}

#[test]
fn test_empty_tree() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;

    assert!(db.list(&ListArgs::default())?.is_empty());
    assert_eq!(db.get(b"anything")?, None);
    db.delete(b"anything")?;

    let stats = db.debugger().verify()?;
    assert_eq!(stats.height, 0);
    assert_eq!(stats.leaf_count, 1);
    assert_eq!(stats.branch_count, 0);
    assert_eq!(stats.entry_count, 0);
    Ok(())
}

#[test]
fn test_overwrite_keeps_single_entry() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    db.set(b"k", b"first")?;
    db.set(b"k", b"second")?;
    db.set(b"k", b"third")?;

    assert_eq!(db.get(b"k")?, Some(b"third".to_vec()));
    assert_eq!(db.debugger().verify()?.entry_count, 1);

    // Delete then re-set returns the new value.
    db.delete(b"k")?;
    assert_eq!(db.get(b"k")?, None);
    db.set(b"k", b"fourth")?;
    assert_eq!(db.get(b"k")?, Some(b"fourth".to_vec()));
    Ok(())
}

#[test]
fn test_small_fanout_split() -> Result<()> {
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(MemStore::new())?;

    for key in ["a", "b", "c", "d", "e"] {
        db.set(key, key)?;
    }

    let stats = db.debugger().verify()?;
    assert_eq!(stats.height, 1);
    assert_eq!(stats.leaf_count, 2);
    assert_eq!(stats.branch_count, 1);
    assert_eq!(stats.entry_count, 5);

    // The promoted separator is the first key of the right leaf.
    let dump = db.debugger().dump()?;
    assert!(dump.contains("\n┣━ \"c\"\n"), "unexpected shape:\n{dump}");

    // Range scan crossing the split boundary.
    let range = db.list(&ListArgs {
        gte: Some(b"b".to_vec()),
        lt: Some(b"e".to_vec()),
        ..Default::default()
    })?;
    assert_eq!(
        range,
        [
            (b"b".to_vec(), b"b".to_vec()),
            (b"c".to_vec(), b"c".to_vec()),
            (b"d".to_vec(), b"d".to_vec()),
        ]
    );
    Ok(())
}

#[test]
fn test_split_boundary() -> Result<()> {
    // Exactly one insertion past the leaf bound produces a tree of height 1
    // with two leaves and one separator.
    let mut db = BirchDB::open(MemStore::new())?;
    for index in 0..33 {
        db.set(key(index), key(index))?;
    }

    let stats = db.debugger().verify()?;
    assert_eq!(stats.height, 1);
    assert_eq!(stats.leaf_count, 2);
    assert_eq!(stats.branch_count, 1);
    assert_eq!(stats.entry_count, 33);
    Ok(())
}

#[test]
fn test_reverse_offset_limit() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    for key in ["a", "b", "c", "d", "e", "f"] {
        db.set(key, key)?;
    }

    // reverse with limit means "the last N, highest first".
    let tail = db.list(&ListArgs {
        reverse: true,
        limit: Some(3),
        ..Default::default()
    })?;
    assert_eq!(keys_of(tail), [b"f", b"e", b"d"]);

    // offset applies after reverse, before limit.
    let shaped = db.list(&ListArgs {
        reverse: true,
        offset: 1,
        limit: Some(2),
        ..Default::default()
    })?;
    assert_eq!(keys_of(shaped), [b"e", b"d"]);

    let shaped = db.list(&ListArgs {
        offset: 2,
        limit: Some(3),
        ..Default::default()
    })?;
    assert_eq!(keys_of(shaped), [b"c", b"d", b"e"]);
    Ok(())
}

#[test]
fn test_conflicting_bounds_are_empty() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    for key in ["a", "b", "c"] {
        db.set(key, key)?;
    }

    let args = ListArgs {
        gt: Some(b"a".to_vec()),
        gte: Some(b"b".to_vec()),
        ..Default::default()
    };
    assert!(db.list(&args)?.is_empty());

    let args = ListArgs {
        lt: Some(b"c".to_vec()),
        lte: Some(b"c".to_vec()),
        ..Default::default()
    };
    assert!(db.list(&args)?.is_empty());

    // Point queries and plain gets are unaffected.
    assert_eq!(db.get(b"b")?, Some(b"b".to_vec()));
    Ok(())
}

#[test]
fn test_underflow_merge_wave() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    for index in 0..100 {
        db.set(key(index), value(index))?;
    }
    db.debugger().verify()?;

    for index in 20..40 {
        db.delete(key(index))?;
    }

    let stats = db.debugger().verify()?;
    assert_eq!(stats.entry_count, 80);
    assert_eq!(db.get(key(25))?, None);
    assert_eq!(db.get(key(50))?, Some(value(50)));

    let range = db.list(&ListArgs {
        gte: Some(key(10)),
        lt: Some(key(50)),
        ..Default::default()
    })?;
    assert_eq!(range.len(), 20);
    assert_eq!(range[9].0, key(19));
    assert_eq!(range[10].0, key(40));

    // Every structural change cleans up after itself: the store holds
    // exactly the live nodes plus the metadata record.
    assert_eq!(
        db.store().len(),
        stats.leaf_count + stats.branch_count + 1
    );
    Ok(())
}

#[test]
fn test_bulk_delete_demotes_root() -> Result<()> {
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(MemStore::new())?;

    for index in 0..50 {
        db.set(key(index), value(index))?;
    }
    let grown = db.debugger().verify()?;
    assert!(grown.height >= 2);

    for index in (1..50).rev() {
        db.delete(key(index))?;
        if index % 10 == 0 {
            db.debugger().verify()?;
        }
    }

    let stats = db.debugger().verify()?;
    assert_eq!(stats.height, 0);
    assert_eq!(stats.leaf_count, 1);
    assert_eq!(stats.branch_count, 0);
    assert_eq!(stats.entry_count, 1);
    assert_eq!(db.get(key(0))?, Some(value(0)));

    // The collapsed roots were deleted along the way.
    assert_eq!(db.store().len(), 2);
    Ok(())
}

#[test]
fn test_write_batch_applies_sets_then_deletes() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;

    let mut batch = Batch::new();
    batch
        .set(b"k", b"first")
        .set(b"k", b"second")
        .set(b"gone", b"x")
        .delete(b"gone")
        .delete(b"absent");
    db.write(batch)?;

    assert_eq!(db.get(b"k")?, Some(b"second".to_vec()));
    assert_eq!(db.get(b"gone")?, None);
    assert_eq!(db.debugger().verify()?.entry_count, 1);
    Ok(())
}

#[test]
fn test_binary_and_empty_keys() -> Result<()> {
    let mut db = BirchDB::open(MemStore::new())?;
    db.set(b"", b"empty")?;
    db.set(b"\x00", b"nul")?;
    db.set(b"\xff\xfe", b"high")?;
    db.set(b"mid\x00dle", b"mid")?;

    assert_eq!(db.get(b"")?, Some(b"empty".to_vec()));
    assert_eq!(db.get(b"\x00")?, Some(b"nul".to_vec()));

    let keys = keys_of(db.list(&ListArgs::default())?);
    assert_eq!(
        keys,
        [
            b"".to_vec(),
            b"\x00".to_vec(),
            b"mid\x00dle".to_vec(),
            b"\xff\xfe".to_vec(),
        ]
    );

    db.delete(b"")?;
    assert_eq!(db.get(b"")?, None);
    db.debugger().verify()?;
    Ok(())
}

#[test]
fn test_persists_across_reopen() -> Result<()> {
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(MemStore::new())?;
    for index in 0..40 {
        db.set(key(index), value(index))?;
    }
    let before = db.debugger().verify()?;

    // Reopen over the same store: the metadata record restores the tree.
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(db.into_store())?;
    let after = db.debugger().verify()?;
    assert_eq!(before, after);
    assert_eq!(db.get(key(17))?, Some(value(17)));

    // The persisted allocation sequence keeps fresh identifiers unique:
    // further splits must not collide with pre-reopen nodes.
    for index in 40..80 {
        db.set(key(index), value(index))?;
    }
    let stats = db.debugger().verify()?;
    assert_eq!(stats.entry_count, 80);
    assert_eq!(
        db.store().len(),
        stats.leaf_count + stats.branch_count + 1
    );
    Ok(())
}

#[test]
fn test_missing_root_reads_as_empty() -> Result<()> {
    let db = BirchDB::open(MemStore::new())?;
    let mut store = db.into_store();

    // Wipe the root leaf record but keep the metadata: the tree must come up
    // as empty instead of failing.
    store.delete(b"l:root")?;
    let db = BirchDB::open(store)?;
    assert_eq!(db.get(b"anything")?, None);
    assert!(db.list(&ListArgs::default())?.is_empty());
    Ok(())
}

#[test]
fn test_stacked_trees() -> Result<()> {
    // A tree is a valid backing store for another tree.
    let inner = BirchDB::open(MemStore::new())?;
    let mut outer = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(inner)?;

    for index in 0..30 {
        outer.set(key(index), value(index))?;
    }
    assert_eq!(outer.get(key(12))?, Some(value(12)));
    assert_eq!(outer.list(&ListArgs::default())?.len(), 30);
    outer.debugger().verify()?;
    outer.store().debugger().verify()?;
    Ok(())
}

#[test]
fn test_store_failure_propagates() -> Result<()> {
    let fail = Rc::new(Cell::new(false));
    let store = FailingStore {
        inner: MemStore::new(),
        fail: fail.clone(),
    };
    let mut db = BirchDB::open(store)?;
    db.set(b"a", b"1")?;

    fail.set(true);
    let err = db.set(b"b", b"2").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Store);

    fail.set(false);
    db.set(b"b", b"2")?;
    assert_eq!(db.get(b"b")?, Some(b"2".to_vec()));
    Ok(())
}

#[test]
fn test_randomized_against_oracle() -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(MemStore::new())?;
    let mut oracle = BTreeMap::new();

    for round in 0..1000 {
        let key = key(rng.gen_range(0..60));
        if rng.gen_bool(0.5) {
            let value: Vec<u8> = (0..rng.gen_range(0..16)).map(|_| rng.gen()).collect();
            db.set(&key, &value)?;
            oracle.insert(key, value);
        } else {
            db.delete(&key)?;
            oracle.remove(&key);
        }

        let listed = db.list(&ListArgs::default())?;
        let expected = oracle
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>();
        assert_eq!(listed, expected, "diverged from oracle at round {round}");

        if round % 100 == 0 {
            db.debugger().verify()?;
        }
    }

    let stats = db.debugger().verify()?;
    assert_eq!(stats.entry_count, oracle.len());
    Ok(())
}

#[test]
fn test_random_bounds_match_flat_store() -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut db = Options::new()
        .max_leaf_size(4)
        .max_internal_size(4)
        .open(MemStore::new())?;
    let mut flat = MemStore::new();

    for index in (0..100).step_by(2) {
        db.set(key(index), value(index))?;
        flat.set(key(index), value(index))?;
    }

    for _ in 0..300 {
        let mut args = ListArgs::default();
        if rng.gen_bool(0.4) {
            let bound = key(rng.gen_range(0..100));
            if rng.gen_bool(0.5) {
                args.gt = Some(bound);
            } else {
                args.gte = Some(bound);
            }
        }
        if rng.gen_bool(0.4) {
            let bound = key(rng.gen_range(0..100));
            if rng.gen_bool(0.5) {
                args.lt = Some(bound);
            } else {
                args.lte = Some(bound);
            }
        }
        if rng.gen_bool(0.3) {
            args.limit = Some(rng.gen_range(0..20));
        }
        if rng.gen_bool(0.3) {
            args.offset = rng.gen_range(0..10);
        }
        args.reverse = rng.gen_bool(0.3);

        assert_eq!(
            db.list(&args)?,
            flat.list(&args)?,
            "diverged for {args:?}"
        );
    }
    Ok(())
}

fn key(index: usize) -> Vec<u8> {
    format!("key{index:03}").into_bytes()
}

fn value(index: usize) -> Vec<u8> {
    format!("value{index:03}").into_bytes()
}

fn keys_of(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Vec<u8>> {
    entries.into_iter().map(|(key, _)| key).collect()
}

struct FailingStore {
    inner: MemStore,
    fail: Rc<Cell<bool>>,
}

impl Store for FailingStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn write(&mut self, batch: Batch) -> Result<()> {
        if self.fail.get() {
            return Err(Error::store(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        self.inner.write(batch)
    }

    fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.list(args)
    }
}
