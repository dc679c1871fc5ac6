use {
    crate::{
        error::{Error, Result},
        types::{children::Children, hash::StructuralHash, metadata::MetadataMap, value::ValueGroup},
    },
    std::sync::Arc,
};

/// A single node in the tree. Cheap to clone (an `Arc` bump) and immutable
/// once constructed; operations build new nodes that share unchanged
/// subtrees by reference with their inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Node(Arc<NodeInner>);

#[derive(Debug, PartialEq)]
struct NodeInner {
    key: String,
    values: ValueGroup,
    children: Children,
    metadata: MetadataMap,
    hash: StructuralHash,
    depth: usize,
}

impl Node {
    /// Construct a node, computing and caching its structural hash.
    /// `children` must already be mutually compressed (no two siblings
    /// sharing both `key` and children-structural-hash) — callers that
    /// cannot guarantee this should route through [`crate::compress`]
    /// first.
    pub fn new(
        key: impl Into<String>,
        values: ValueGroup,
        children: Children,
        metadata: MetadataMap,
        depth: usize,
    ) -> Result<Self> {
        let key = key.into();
        check_no_duplicate_subtrees(&children)?;
        check_metadata_shape(&values, &metadata)?;
        let child_hashes: Vec<StructuralHash> = children.as_slice().iter().map(Node::hash).collect();
        let hash = StructuralHash::of_node(&key, &values.digest(), &child_hashes);
        Ok(Self(Arc::new(NodeInner { key, values, children, metadata, hash, depth })))
    }

    pub fn root(children: Children) -> Result<Self> {
        Self::new("root", ValueGroup::enumeration(crate::types::dtype::Dtype::Str, vec![
            crate::types::dtype::Value::Str("root".to_string()),
        ])?, children, MetadataMap::new(), 0)
    }

    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn values(&self) -> &ValueGroup {
        &self.0.values
    }

    pub fn children(&self) -> &Children {
        &self.0.children
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.0.metadata
    }

    pub fn hash(&self) -> StructuralHash {
        self.0.hash
    }

    pub fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    /// True by `Arc` pointer identity; a fast pre-check before falling back
    /// to a full structural-hash comparison.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Rebuild this node with a different metadata map, keeping key, values
    /// and children (and therefore the same structural hash) untouched.
    pub fn with_metadata(&self, metadata: MetadataMap) -> Result<Self> {
        check_metadata_shape(&self.0.values, &metadata)?;
        Ok(Self(Arc::new(NodeInner {
            key: self.0.key.clone(),
            values: self.0.values.clone(),
            children: self.0.children.clone(),
            metadata,
            hash: self.0.hash,
            depth: self.0.depth,
        })))
    }

    /// Rebuild this node with a different child list, recomputing the hash.
    pub fn with_children(&self, children: Children) -> Result<Self> {
        Self::new(self.0.key.clone(), self.0.values.clone(), children, self.0.metadata.clone(), self.0.depth)
    }

    /// Rebuild this node with a different value group, recomputing the hash.
    /// The new group must have the same length as the old one, since
    /// existing metadata is carried over unchanged.
    pub fn with_values(&self, values: ValueGroup) -> Result<Self> {
        Self::new(self.0.key.clone(), values, self.0.children.clone(), self.0.metadata.clone(), self.0.depth)
    }
}

fn check_no_duplicate_subtrees(children: &Children) -> Result<()> {
    let slice = children.as_slice();
    for i in 0..slice.len() {
        for j in (i + 1)..slice.len() {
            if slice[i].key() == slice[j].key() {
                let hi: Vec<StructuralHash> = slice[i].children().as_slice().iter().map(Node::hash).collect();
                let hj: Vec<StructuralHash> = slice[j].children().as_slice().iter().map(Node::hash).collect();
                if hi == hj {
                    return Err(Error::InvariantViolation(format!(
                        "uncompressed sibling nodes under key {:?} share identical children",
                        slice[i].key()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_metadata_shape(values: &ValueGroup, metadata: &MetadataMap) -> Result<()> {
    let n = values.len();
    for (name, arr) in metadata {
        if arr.last_axis_len() != n {
            return Err(Error::ShapeMismatch(format!(
                "metadata {name:?} has trailing axis length {} but node has {n} values",
                arr.last_axis_len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::dtype::{Dtype, Value},
    };

    fn leaf(key: &str, vals: &[&str]) -> Node {
        let values = ValueGroup::from_strs(vals).unwrap();
        Node::new(key, values, Children::default(), MetadataMap::new(), 1).unwrap()
    }

    #[test]
    fn identical_subtrees_hash_equal() {
        let a = leaf("x", &["1", "2"]);
        let b = leaf("x", &["1", "2"]);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn duplicate_sibling_subtrees_are_rejected() {
        let child_a = leaf("y", &["1"]);
        let child_b = leaf("y", &["1"]);
        let values = ValueGroup::from_strs(["p", "q"]).unwrap();
        let err = Node::new(
            "x",
            values,
            Children::new(vec![child_a, child_b]),
            MetadataMap::new(),
            0,
        );
        assert!(err.is_err());
    }

    #[test]
    fn dtype_of_root_is_str() {
        let root = Node::root(Children::default()).unwrap();
        assert_eq!(root.values().dtype(), Some(Dtype::Str));
        assert_eq!(root.values().values(), &[Value::Str("root".to_string())]);
    }
}
