use crate::{
    bptree::BPTree,
    error::Result,
    store::{byte_order, ListArgs, Store},
};

impl<S> BPTree<S>
where
    S: Store,
{
    /// Ordered range enumeration: descend once to the first candidate leaf,
    /// then walk the sibling chain. The collected ascending range is shaped
    /// by `reverse`, `offset` and `limit` in that order; forward scans stop
    /// early once shaping can only discard from the back.
    pub(crate) fn list(&self, args: &ListArgs) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if args.rejects(byte_order) {
            return Ok(Vec::new());
        }

        let cap = args.collect_cap();
        let mut out = Vec::new();
        let mut leaf = self.leaf_for(args.lower_key())?;

        loop {
            let start = leaf
                .keys
                .partition_point(|key| !args.above_lower(byte_order, key));
            for index in start..leaf.len() {
                if !args.below_upper(byte_order, &leaf.keys[index]) {
                    return Ok(args.finish(out));
                }
                out.push((leaf.keys[index].clone(), leaf.values[index].clone()));
                if cap.map_or(false, |cap| out.len() >= cap) {
                    return Ok(args.finish(out));
                }
            }

            match leaf.next {
                Some(id) => leaf = self.leaf(&id)?,
                None => break,
            }
        }

        Ok(args.finish(out))
    }
}
