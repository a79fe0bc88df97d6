use crate::{
    bptree::{leaf::Leaf, node::NodeId, BPTree},
    error::Result,
    store::Store,
};

/// Occupancy statistics returned by a successful verification walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    /// Number of internal hops from the root to any leaf.
    pub height: u32,
    /// Live leaf records.
    pub leaf_count: usize,
    /// Live branch records.
    pub branch_count: usize,
    /// User key-value pairs.
    pub entry_count: usize,
}

impl<S> BPTree<S>
where
    S: Store,
{
    /// Renders the tree shape with one line per separator and leaf key.
    pub(crate) fn dump(&self) -> Result<String> {
        let mut out = String::from("┓\n");
        let root = self.meta.root.clone();
        self.dump_node(&root, self.meta.height, "", &mut out)?;
        Ok(out)
    }

    fn dump_node(&self, id: &NodeId, level: u32, prefix: &str, out: &mut String) -> Result<()> {
        if level == 0 {
            let leaf = self.leaf(id)?;
            for (index, key) in leaf.keys.iter().enumerate() {
                let weld = if index + 1 == leaf.len() { '┗' } else { '┣' };
                out.push_str(&format!(
                    "{prefix}{weld}━ {:?}\n",
                    String::from_utf8_lossy(key)
                ));
            }
        } else {
            let branch = self.branch(id)?;
            for (index, child) in branch.children.iter().enumerate() {
                let is_last = index + 1 == branch.children.len();
                if index > 0 {
                    out.push_str(&format!(
                        "{prefix}┣━ {:?}\n",
                        String::from_utf8_lossy(&branch.keys[index - 1])
                    ));
                }
                let weld = if is_last { "┗━━━━━━┓" } else { "┣━━━━━━┓" };
                out.push_str(&format!("{prefix}{weld} ({child})\n"));

                let next_prefix = format!("{prefix}{}", if is_last { "       " } else { "┃      " });
                self.dump_node(child, level - 1, &next_prefix, out)?;
            }
        }
        Ok(())
    }

    /// Walks the whole tree at rest, panicking on any violated structural
    /// invariant: ordering of the leaf chain, key/child count alignment,
    /// uniform depth, separator correctness and occupancy bounds.
    pub(crate) fn verify(&self) -> Result<TreeStats> {
        let mut stats = TreeStats {
            height: self.meta.height,
            ..Default::default()
        };
        let mut leaves = Vec::new();
        let root = self.meta.root.clone();
        self.verify_node(&root, self.meta.height, true, &mut stats, &mut leaves)?;

        // The sibling chain must link exactly the leaves in descent order,
        // and concatenating their keys must be strictly ascending.
        let mut prev: Option<Vec<u8>> = None;
        for (index, (id, leaf)) in leaves.iter().enumerate() {
            let expected_next = leaves.get(index + 1).map(|(id, _)| id.clone());
            assert_eq!(
                leaf.next, expected_next,
                "sibling chain broken after {id}"
            );
            for key in &leaf.keys {
                if let Some(prev) = &prev {
                    assert!(
                        prev.as_slice() < key.as_slice(),
                        "leaf chain keys not strictly ascending"
                    );
                }
                prev = Some(key.clone());
            }
        }

        Ok(stats)
    }

    /// Returns the smallest key reachable under `id`, for separator checks.
    fn verify_node(
        &self,
        id: &NodeId,
        level: u32,
        is_root: bool,
        stats: &mut TreeStats,
        leaves: &mut Vec<(NodeId, Leaf)>,
    ) -> Result<Option<Vec<u8>>> {
        if level == 0 {
            let leaf = self.leaf(id)?;
            assert_eq!(
                leaf.keys.len(),
                leaf.values.len(),
                "leaf {id} has misaligned keys and values"
            );
            if !is_root {
                assert!(
                    leaf.len() >= self.min_leaf_keys(),
                    "leaf {id} underflows its occupancy bound"
                );
            }
            assert!(
                leaf.len() <= self.max_leaf,
                "leaf {id} overflows its occupancy bound"
            );

            stats.leaf_count += 1;
            stats.entry_count += leaf.len();
            let smallest = leaf.keys.first().cloned();
            leaves.push((id.clone(), leaf));
            Ok(smallest)
        } else {
            let branch = self.branch(id)?;
            assert_eq!(
                branch.children.len(),
                branch.keys.len() + 1,
                "branch {id} has misaligned keys and children"
            );
            assert!(
                branch.keys.windows(2).all(|pair| pair[0] < pair[1]),
                "branch {id} separators not strictly ascending"
            );
            if !is_root {
                assert!(
                    branch.len() >= self.min_branch_keys(),
                    "branch {id} underflows its occupancy bound"
                );
            }
            assert!(
                branch.len() <= self.max_branch,
                "branch {id} overflows its occupancy bound"
            );

            stats.branch_count += 1;
            let mut smallest_overall = None;
            for (index, child) in branch.children.iter().enumerate() {
                let smallest = self.verify_node(child, level - 1, false, stats, leaves)?;
                if index == 0 {
                    smallest_overall = smallest;
                } else {
                    let smallest = smallest.expect("non-root nodes are never empty");
                    assert_eq!(
                        branch.keys[index - 1],
                        smallest,
                        "separator of branch {id} does not match its subtree"
                    );
                }
            }
            Ok(smallest_overall)
        }
    }
}
