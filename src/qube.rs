//! The public handle: a compressed tree of structured identifiers, and the
//! operations exposed to callers.

use {
    crate::{
        compress,
        construct::{self, NodeSpec},
        error::Result,
        iter::{self, Identifier, Scalar},
        select::{self, Filter, SelectMode},
        serialize,
        set_ops::{self, OpKind},
        types::{
            children::Children,
            dtype::Dtype,
            metadata::MetadataMap,
            node::Node,
            value::ValueGroup,
        },
    },
    std::{fmt, ops},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Qube {
    root: Node,
}

impl Qube {
    pub fn empty() -> Result<Self> {
        Ok(Self { root: Node::root(Children::default())? })
    }

    pub fn from_node(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn from_datacube(levels: &[(String, Vec<String>)]) -> Result<Self> {
        Ok(Self { root: construct::from_datacube(levels)? })
    }

    pub fn from_nodes(levels: impl IntoIterator<Item = NodeSpec>) -> Result<Self> {
        Ok(Self { root: construct::from_nodes(levels)? })
    }

    pub fn from_ascii(text: &str) -> Result<Self> {
        Ok(Self { root: construct::from_ascii(text)? })
    }

    pub fn from_nested_dict(dict: &std::collections::BTreeMap<String, serde_json::Value>) -> Result<Self> {
        Ok(Self { root: construct::from_nested_dict(dict)? })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self { root: serialize::from_json(text)? })
    }

    pub fn to_json(&self) -> Result<String> {
        serialize::to_json(&self.root)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serialize::to_json_pretty(&self.root)
    }

    pub fn to_ascii(&self) -> String {
        serialize::to_ascii(&self.root)
    }

    /// Run the compressor bottom-up over the whole tree. Idempotent: every
    /// operation in this crate already leaves its result compressed, so
    /// this is mainly useful after building a qube with [`from_nodes`]
    /// level by level without intermediate compression.
    pub fn compress(&self) -> Result<Self> {
        Ok(Self { root: compress::compress_tree(&self.root)? })
    }

    pub fn select(&self, filter: &Filter, mode: SelectMode, consume: bool) -> Result<Self> {
        Ok(Self { root: select::select(&self.root, filter, mode, consume)? })
    }

    pub fn add_metadata(&self, metadata: &MetadataMap) -> Result<Self> {
        let root = self.root.with_metadata({
            let mut m = self.root.metadata().clone();
            m.extend(metadata.clone());
            m
        })?;
        Ok(Self { root })
    }

    pub fn leaves(&self) -> Vec<Identifier> {
        iter::leaves(&self.root)
    }

    pub fn leaves_with_metadata(&self) -> Vec<(Identifier, std::collections::BTreeMap<String, Scalar>)> {
        iter::leaves_with_metadata(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        if self.root.is_leaf() {
            return 0;
        }
        node_child_leaf_count(&self.root)
    }

    pub fn n_nodes(&self) -> usize {
        fn count(node: &Node) -> usize {
            1 + node.children().as_slice().iter().map(count).sum::<usize>()
        }
        count(&self.root) - 1
    }

    /// Remove `key` from every identifier in the tree and recompress — a
    /// dimensionality-reduction companion to [`Self::select`]. Dropping a
    /// key can make siblings that used to differ by that key's value
    /// collapse into identical subtrees, so every level is recompressed on
    /// the way back up, not just the root.
    pub fn remove_by_key(&self, key: &str) -> Result<Self> {
        fn rebuild(node: &Node, key: &str) -> Result<Vec<Node>> {
            let mut out = Vec::new();
            for child in node.children() {
                if child.key() == key {
                    out.extend(rebuild(child, key)?);
                } else {
                    let new_children = rebuild(child, key)?;
                    out.push(child.with_children(Children::new(new_children))?);
                }
            }
            compress::compress_children(out)
        }
        let new_children = rebuild(&self.root, key)?;
        Ok(Self { root: self.root.with_children(Children::new(new_children))? })
    }

    /// Remove every identifier present in `other` from `self`, matching
    /// structurally (same as plain `-`, kept as a named alias since the
    /// source system exposes both spellings).
    pub fn remove_branch(&self, other: &Qube) -> Result<Self> {
        self.difference(other)
    }

    /// Re-tag the dtype of every enumeration at `key`, coercing each value.
    /// A wildcard at `key` is left untouched, since it has no values to
    /// coerce.
    pub fn convert_dtype(&self, key: &str, dtype: Dtype) -> Result<Self> {
        fn rewrite(node: &Node, key: &str, dtype: Dtype) -> Result<Node> {
            let children: Result<Vec<Node>> =
                node.children().as_slice().iter().map(|c| rewrite(c, key, dtype)).collect();
            let node = node.with_children(Children::new(children?))?;
            if node.key() != key {
                return Ok(node);
            }
            match node.values() {
                ValueGroup::Enum { values, .. } => {
                    let coerced: Result<Vec<_>> =
                        values.iter().map(|v| crate::types::dtype::Value::coerce(&v.as_str_repr(), dtype)).collect();
                    node.with_values(ValueGroup::enumeration(dtype, coerced?)?)
                }
                ValueGroup::Wildcard => Ok(node),
            }
        }
        Ok(Self { root: rewrite(&self.root, key, dtype)? })
    }

    pub fn union(&self, other: &Qube) -> Result<Self> {
        Ok(Self { root: set_ops::apply(&self.root, &other.root, set_ops::UNION)? })
    }

    pub fn intersection(&self, other: &Qube) -> Result<Self> {
        Ok(Self { root: set_ops::apply(&self.root, &other.root, set_ops::INTERSECTION)? })
    }

    pub fn difference(&self, other: &Qube) -> Result<Self> {
        Ok(Self { root: set_ops::apply(&self.root, &other.root, set_ops::DIFFERENCE)? })
    }

    pub fn symmetric_difference(&self, other: &Qube) -> Result<Self> {
        Ok(Self { root: set_ops::apply(&self.root, &other.root, set_ops::SYMMETRIC_DIFFERENCE)? })
    }

    fn apply_kind(&self, other: &Qube, kind: OpKind) -> Self {
        let root = set_ops::apply(&self.root, &other.root, kind)
            .expect("binary operations on well-formed qubes do not fail");
        Self { root }
    }
}

fn node_child_leaf_count(node: &Node) -> usize {
    node.children()
        .as_slice()
        .iter()
        .map(|child| {
            if child.is_leaf() {
                child.values().len()
            } else {
                child.values().len() * node_child_leaf_count(child)
            }
        })
        .sum()
}

impl ops::BitOr for &Qube {
    type Output = Qube;

    fn bitor(self, rhs: Self) -> Qube {
        self.apply_kind(rhs, set_ops::UNION)
    }
}

impl ops::BitAnd for &Qube {
    type Output = Qube;

    fn bitand(self, rhs: Self) -> Qube {
        self.apply_kind(rhs, set_ops::INTERSECTION)
    }
}

impl ops::Sub for &Qube {
    type Output = Qube;

    fn sub(self, rhs: Self) -> Qube {
        self.apply_kind(rhs, set_ops::DIFFERENCE)
    }
}

impl ops::BitXor for &Qube {
    type Output = Qube;

    fn bitxor(self, rhs: Self) -> Qube {
        self.apply_kind(rhs, set_ops::SYMMETRIC_DIFFERENCE)
    }
}

impl fmt::Display for Qube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii())
    }
}
