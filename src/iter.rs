//! Leaf enumeration: expand a qube back into the dense identifiers it
//! represents, optionally paired with the metadata attached along each
//! path. The synthetic `root` key is never part of a yielded identifier.

use {
    crate::types::{
        metadata::{ArrayData, MetadataArray},
        node::Node,
    },
    std::collections::BTreeMap,
};

pub type Identifier = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Int64(i64),
    Float64(f64),
    Str(String),
}

impl MetadataArray {
    /// The scalar reached by walking this array's axes with the ancestor
    /// index path accumulated so far (one entry per visited value, deepest
    /// last). Only the trailing `shape.len()` entries of `idx_path` apply —
    /// an array's rank may be smaller than the current depth when it was
    /// never broadcast against every ancestor, in which case the leading
    /// (unrepresented) ancestors contribute no axis at all.
    fn scalar_at(&self, idx_path: &[usize]) -> Scalar {
        let offset = idx_path.len().saturating_sub(self.shape.len());
        let mut flat = 0usize;
        for (axis, &dim) in self.shape.iter().enumerate() {
            let i = idx_path.get(offset + axis).copied().unwrap_or(0);
            flat = flat * dim + i.min(dim.saturating_sub(1));
        }
        match &self.data {
            ArrayData::Int64(v) => Scalar::Int64(v[flat.min(v.len().saturating_sub(1))]),
            ArrayData::Float64(v) => Scalar::Float64(v[flat.min(v.len().saturating_sub(1))]),
            ArrayData::Str(v) => Scalar::Str(v[flat.min(v.len().saturating_sub(1))].clone()),
        }
    }
}

pub fn leaves(node: &Node) -> Vec<Identifier> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(node, &mut path, &mut out);
    out
}

fn walk(node: &Node, path: &mut Vec<(String, String)>, out: &mut Vec<Identifier>) {
    if node.key() == "root" {
        for child in node.children() {
            walk(child, path, out);
        }
        return;
    }
    for v in node.values().values() {
        path.push((node.key().to_string(), v.to_string()));
        if node.is_leaf() {
            out.push(path.iter().cloned().collect());
        } else {
            for child in node.children() {
                walk(child, path, out);
            }
        }
        path.pop();
    }
    if node.values().is_wildcard() {
        path.push((node.key().to_string(), "*".to_string()));
        if node.is_leaf() {
            out.push(path.iter().cloned().collect());
        } else {
            for child in node.children() {
                walk(child, path, out);
            }
        }
        path.pop();
    }
}

pub fn leaves_with_metadata(node: &Node) -> Vec<(Identifier, BTreeMap<String, Scalar>)> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    let mut index_path = Vec::new();
    let mut metadata: BTreeMap<String, Scalar> = BTreeMap::new();
    walk_with_metadata(node, &mut path, &mut index_path, &mut metadata, &mut out);
    out
}

fn walk_with_metadata(
    node: &Node,
    path: &mut Vec<(String, String)>,
    index_path: &mut Vec<usize>,
    metadata: &mut BTreeMap<String, Scalar>,
    out: &mut Vec<(Identifier, BTreeMap<String, Scalar>)>,
) {
    if node.key() == "root" {
        for child in node.children() {
            walk_with_metadata(child, path, index_path, metadata, out);
        }
        return;
    }
    for (i, v) in node.values().values().iter().enumerate() {
        path.push((node.key().to_string(), v.to_string()));
        index_path.push(i);
        let mut overridden = Vec::new();
        for (name, arr) in node.metadata() {
            let previous = metadata.insert(name.clone(), arr.scalar_at(index_path));
            overridden.push((name.clone(), previous));
        }
        if node.is_leaf() {
            out.push((path.iter().cloned().collect(), metadata.clone()));
        } else {
            for child in node.children() {
                walk_with_metadata(child, path, index_path, metadata, out);
            }
        }
        for (name, previous) in overridden {
            match previous {
                Some(v) => {
                    metadata.insert(name, v);
                }
                None => {
                    metadata.remove(&name);
                }
            }
        }
        index_path.pop();
        path.pop();
    }
}
