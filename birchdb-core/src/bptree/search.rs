//! Binary-search primitives shared by the descent and the in-node edits.

/// Result of a binary search over a leaf's keys.
///
/// * `Ok(index)` - the key was found at `index`.
/// * `Err(index)` - the position where the key would be inserted to keep the
///   sequence sorted.
pub(crate) type SearchIndex = std::result::Result<usize, usize>;

#[inline]
pub(crate) fn leaf_position(keys: &[Vec<u8>], key: &[u8]) -> SearchIndex {
    keys.binary_search_by(|probe| probe.as_slice().cmp(key))
}

/// The child index to descend into for `key`: the smallest `i` whose
/// separator strictly exceeds `key`, or the last child when none does.
///
/// A separator equal to `key` sends the descent right, because separators
/// are copies of the smallest key of their right-hand subtree - that is
/// where an equal key actually lives.
#[inline]
pub(crate) fn child_index(separators: &[Vec<u8>], key: &[u8]) -> usize {
    separators.partition_point(|separator| separator.as_slice() <= key)
}
