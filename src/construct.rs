//! Constructors: ways to build a qube from the outside, besides combining
//! existing qubes with the set algebra.

use {
    crate::{
        error::Result,
        serialize,
        types::{children::Children, metadata::MetadataMap, node::Node, value::ValueGroup},
    },
    std::collections::BTreeMap,
};

/// One level of a dense identifier: a key and the values to enumerate at
/// that level, optionally with inline metadata.
pub struct NodeSpec {
    pub key: String,
    pub values: Vec<String>,
    pub metadata: MetadataMap,
}

impl NodeSpec {
    pub fn new(key: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            metadata: MetadataMap::new(),
        }
    }
}

/// Build a single linear branch (no branching at any level) from a dense
/// cube: `{key: [values...]}` in iteration order becomes a chain of nodes,
/// one per key, each carrying its full listed value group.
pub fn from_datacube(levels: &[(String, Vec<String>)]) -> Result<Node> {
    let specs: Vec<NodeSpec> = levels
        .iter()
        .map(|(k, vs)| NodeSpec::new(k.clone(), vs.clone()))
        .collect();
    from_nodes(specs)
}

/// Like [`from_datacube`] but each level may additionally carry metadata.
/// Each `NodeSpec`'s metadata is attached to that level exactly as given,
/// shaped only against that level's own value-group length — it is not
/// broadcast against ancestor value-group lengths automatically. Callers
/// that need metadata distinguishable per ancestor value (e.g. before a
/// merge that must keep per-parent-value distinctions apart) must pre-shape
/// it with the leading ancestor axes themselves.
pub fn from_nodes(levels: impl IntoIterator<Item = NodeSpec>) -> Result<Node> {
    let levels: Vec<NodeSpec> = levels.into_iter().collect();
    let mut node: Option<Node> = None;
    for (depth, spec) in levels.into_iter().enumerate().rev() {
        let values = ValueGroup::from_strs(&spec.values)?;
        let children = match node {
            Some(child) => {
                let mut c = Children::default();
                c.insert(child);
                c
            }
            None => Children::default(),
        };
        node = Some(Node::new(spec.key, values, children, spec.metadata, depth + 1)?);
    }
    let mut root_children = Children::default();
    if let Some(n) = node {
        root_children.insert(n);
    }
    Node::root(root_children)
}

/// Build from a nested map, e.g. parsed from JSON, where each key is either
/// a plain `"k=v1/v2"` spine segment or `"k=*"` for a wildcard, and each
/// value is either a further nested map or `null` for a leaf.
pub fn from_nested_dict(dict: &BTreeMap<String, serde_json::Value>) -> Result<Node> {
    let mut root_children = Children::default();
    for (spine, sub) in dict {
        root_children.insert(build_branch(spine, sub, 1)?);
    }
    Node::root(root_children)
}

fn build_branch(spine: &str, sub: &serde_json::Value, depth: usize) -> Result<Node> {
    let (key, raw_values) =
        spine.split_once('=').unwrap_or((spine, "*"));
    let values = if raw_values == "*" {
        ValueGroup::wildcard()
    } else {
        ValueGroup::from_strs(raw_values.split('/'))?
    };

    let mut children = Children::default();
    if let serde_json::Value::Object(map) = sub {
        for (child_spine, child_sub) in map {
            children.insert(build_branch(child_spine, child_sub, depth + 1)?);
        }
    }
    Node::new(key, values, children, MetadataMap::new(), depth)
}

pub fn from_ascii(text: &str) -> Result<Node> {
    serialize::from_ascii(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datacube_builds_linear_chain() {
        let levels = vec![
            ("a".to_string(), vec!["1".to_string(), "2".to_string()]),
            ("b".to_string(), vec!["x".to_string()]),
        ];
        let root = from_datacube(&levels).unwrap();
        assert_eq!(root.children().count(), 1);
        let a = &root.children().as_slice()[0];
        assert_eq!(a.values().summary(), "1/2");
        assert_eq!(a.children().count(), 1);
    }
}
