//! The recursive set engine: lifts the shallow value-group partition
//! (`set_ops::shallow`) over whole trees, routing metadata correctly and
//! recompressing at every level.

use {
    crate::{
        compress::compress_children,
        error::{Error, Result},
        set_ops::shallow,
        types::{children::Children, metadata::MetadataMap, node::Node, value::ValueGroup},
    },
    std::collections::BTreeSet,
};

/// A binary set operation, parameterized by which of the three shallow
/// partitions (only-A, intersection, only-B) survive into the result.
#[derive(Clone, Copy, Debug)]
pub struct OpKind {
    pub keep_a_only: bool,
    pub keep_intersection: bool,
    pub keep_b_only: bool,
}

pub const UNION: OpKind = OpKind { keep_a_only: true, keep_intersection: true, keep_b_only: true };
pub const INTERSECTION: OpKind = OpKind { keep_a_only: false, keep_intersection: true, keep_b_only: false };
pub const DIFFERENCE: OpKind = OpKind { keep_a_only: true, keep_intersection: false, keep_b_only: false };
pub const SYMMETRIC_DIFFERENCE: OpKind =
    OpKind { keep_a_only: true, keep_intersection: false, keep_b_only: true };

/// Top-level entry point: combine two qube roots (or any two nodes that
/// share a key and value group, which is always true for two roots).
#[tracing::instrument(skip(a, b), fields(kind = ?kind))]
pub fn apply(a: &Node, b: &Node, kind: OpKind) -> Result<Node> {
    match combine(a, b, kind)? {
        Some(node) => Ok(node),
        None => Node::new(a.key(), a.values().clone(), Children::default(), MetadataMap::new(), a.depth()),
    }
}

/// Combine two nodes that share `(key, values)`. Returns `None` when the
/// combination legitimately prunes to nothing (both inputs had children,
/// and the operation removed all of them — e.g. `A - A`).
fn combine(a: &Node, b: &Node, kind: OpKind) -> Result<Option<Node>> {
    if a.key() != b.key() {
        return Err(Error::KeyMismatch { expected: a.key().to_string(), got: b.key().to_string() });
    }
    if a.values() != b.values() {
        return Err(Error::InvariantViolation(
            "combine requires both operands to share the same value group at the recursion head".into(),
        ));
    }

    let (stayput, push_a, push_b) = split_metadata(a, b)?;

    let a_children = push_down_onto(a.children(), &push_a)?;
    let b_children = push_down_onto(b.children(), &push_b)?;

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    keys.extend(a_children.iter().map(|n| n.key()));
    keys.extend(b_children.iter().map(|n| n.key()));

    let mut merged = Vec::new();
    for key in keys {
        let a_group: Vec<&Node> = a_children.iter().filter(|n| n.key() == key).collect();
        let b_group: Vec<&Node> = b_children.iter().filter(|n| n.key() == key).collect();
        merged.extend(group_op(&a_group, &b_group, kind)?);
    }

    let had_children = !a.is_leaf() || !b.is_leaf();
    let compressed = compress_children(merged)?;
    if had_children && compressed.is_empty() {
        return Ok(None);
    }

    let node = Node::new(a.key(), a.values().clone(), Children::new(compressed), stayput, a.depth())?;
    Ok(Some(node))
}

/// Split each node's own metadata entries into: kept at this level
/// (`stayput`, both sides agree), or pushed down onto one side's children
/// (`push_a`/`push_b`) so that the recursion can resolve the disagreement
/// deeper in the tree. When both nodes are leaves there is nowhere to push
/// metadata down to, so disagreements are resolved immediately with the
/// left operand winning — this is the rule a union of overlapping
/// identifiers with differing metadata follows.
fn split_metadata(a: &Node, b: &Node) -> Result<(MetadataMap, MetadataMap, MetadataMap)> {
    let mut names: BTreeSet<&String> = BTreeSet::new();
    names.extend(a.metadata().keys());
    names.extend(b.metadata().keys());

    if a.is_leaf() && b.is_leaf() {
        let mut stayput = MetadataMap::new();
        for name in names {
            let chosen = a.metadata().get(name).or_else(|| b.metadata().get(name));
            if let Some(arr) = chosen {
                stayput.insert(name.clone(), arr.clone());
            }
        }
        return Ok((stayput, MetadataMap::new(), MetadataMap::new()));
    }

    let mut stayput = MetadataMap::new();
    let mut push_a = MetadataMap::new();
    let mut push_b = MetadataMap::new();
    for name in names {
        match (a.metadata().get(name), b.metadata().get(name)) {
            (Some(ma), Some(mb)) if ma == mb => {
                stayput.insert(name.clone(), ma.clone());
            }
            (Some(ma), Some(mb)) => {
                push_a.insert(name.clone(), ma.clone());
                push_b.insert(name.clone(), mb.clone());
            }
            (Some(ma), None) => {
                push_a.insert(name.clone(), ma.clone());
            }
            (None, Some(mb)) => {
                push_b.insert(name.clone(), mb.clone());
            }
            (None, None) => unreachable!(),
        }
    }
    Ok((stayput, push_a, push_b))
}

fn push_down_onto(children: &Children, pushed: &MetadataMap) -> Result<Vec<Node>> {
    if pushed.is_empty() {
        return Ok(children.as_slice().to_vec());
    }
    children
        .as_slice()
        .iter()
        .map(|child| {
            let mut metadata = child.metadata().clone();
            for (name, arr) in pushed {
                metadata.entry(name.clone()).or_insert_with(|| arr.push_down(child.values().len()));
            }
            child.with_metadata(metadata)
        })
        .collect()
}

/// Tracks the not-yet-matched portion of one node's value group across the
/// cross product of pairs under a shared key.
struct Residual<'n> {
    node: &'n Node,
    remaining: Vec<usize>,
}

impl<'n> Residual<'n> {
    fn new(node: &'n Node) -> Self {
        Self { node, remaining: (0..node.values().len()).collect() }
    }

    fn current_group(&self) -> ValueGroup {
        gather_values(self.node.values(), &self.remaining)
    }

    fn emit(&self) -> Result<Node> {
        gather_node(self.node, &self.remaining)
    }
}

fn gather_values(values: &ValueGroup, indices: &[usize]) -> ValueGroup {
    match values {
        ValueGroup::Wildcard => ValueGroup::Wildcard,
        ValueGroup::Enum { dtype, values } => {
            ValueGroup::Enum { dtype: *dtype, values: indices.iter().map(|&i| values[i].clone()).collect() }
        }
    }
}

fn gather_node(node: &Node, indices: &[usize]) -> Result<Node> {
    let values = gather_values(node.values(), indices);
    let mut metadata = MetadataMap::new();
    for (name, arr) in node.metadata() {
        metadata.insert(name.clone(), arr.take_last_axis(indices)?);
    }
    Node::new(node.key(), values, node.children().clone(), metadata, node.depth())
}

/// Run the set operation over every node sharing one key under a common
/// parent, producing the merged child list for that key.
fn group_op(a_nodes: &[&Node], b_nodes: &[&Node], kind: OpKind) -> Result<Vec<Node>> {
    let mut a_residuals: Vec<Residual> = a_nodes.iter().map(|n| Residual::new(n)).collect();
    let mut b_residuals: Vec<Residual> = b_nodes.iter().map(|n| Residual::new(n)).collect();
    let mut out = Vec::new();

    for ai in 0..a_residuals.len() {
        for bi in 0..b_residuals.len() {
            let a_group = a_residuals[ai].current_group();
            let b_group = b_residuals[bi].current_group();
            if a_group.is_empty() || b_group.is_empty() {
                continue;
            }
            let part = shallow::partition(&a_group, &b_group)?;

            if let Some((idx, _)) = &part.intersection_a {
                let (idx_b, _) = part
                    .intersection_b
                    .as_ref()
                    .ok_or_else(|| Error::InvariantViolation("asymmetric intersection partition".into()))?;
                let orig_a: Vec<usize> = idx.iter().map(|&i| a_residuals[ai].remaining[i]).collect();
                let orig_b: Vec<usize> = idx_b.iter().map(|&i| b_residuals[bi].remaining[i]).collect();
                let a_temp = gather_node(a_residuals[ai].node, &orig_a)?;
                let b_temp = gather_node(b_residuals[bi].node, &orig_b)?;
                if let Some(result) = combine(&a_temp, &b_temp, kind)? {
                    if kind.keep_intersection || !result.is_leaf() {
                        out.push(result);
                    }
                }
            }

            match &part.only_a {
                Some((idx, _)) => {
                    a_residuals[ai].remaining = idx.iter().map(|&i| a_residuals[ai].remaining[i]).collect();
                }
                None => a_residuals[ai].remaining.clear(),
            }
            match &part.only_b {
                Some((idx, _)) => {
                    b_residuals[bi].remaining = idx.iter().map(|&i| b_residuals[bi].remaining[i]).collect();
                }
                None => b_residuals[bi].remaining.clear(),
            }
        }
    }

    if kind.keep_a_only {
        for r in &a_residuals {
            if !r.remaining.is_empty() {
                out.push(r.emit()?);
            }
        }
    }
    if kind.keep_b_only {
        for r in &b_residuals {
            if !r.remaining.is_empty() {
                out.push(r.emit()?);
            }
        }
    }

    Ok(out)
}
