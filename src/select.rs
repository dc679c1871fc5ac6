//! The selector: restricted intersection of a qube against a user filter,
//! with strict / relaxed / next_level modes and optional key-consumption.

use {
    crate::{
        error::Result,
        types::{children::Children, metadata::MetadataMap, node::Node, value::Criterion},
    },
    std::collections::BTreeMap,
};

pub type Filter = BTreeMap<String, Vec<String>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectMode {
    /// Prune any branch whose key isn't named in the filter.
    Strict,
    /// Keep branches whose key isn't named in the filter, unrestricted.
    Relaxed,
    /// Like relaxed, but stop and mark a frontier at the first key not
    /// named in the filter, rather than recursing past it.
    NextLevel,
}

/// Metadata marker used on a frontier node produced by [`SelectMode::NextLevel`].
pub const FRONTIER_MARKER: &str = "is_leaf";

#[tracing::instrument(skip(root, filter))]
pub fn select(root: &Node, filter: &Filter, mode: SelectMode, consume: bool) -> Result<Node> {
    let children: Result<Vec<Option<Node>>> =
        root.children().as_slice().iter().map(|c| select_node(c, filter, mode, consume)).collect();
    let survivors: Vec<Node> = children?.into_iter().flatten().collect();
    tracing::debug!(kept = survivors.len(), total = root.children().count(), "selected children");
    Node::new(root.key(), root.values().clone(), Children::new(survivors), root.metadata().clone(), root.depth())
}

fn select_node(node: &Node, filter: &Filter, mode: SelectMode, consume: bool) -> Result<Option<Node>> {
    match filter.get(node.key()) {
        Some(allowed) => select_matched(node, allowed, filter, mode, consume),
        None => match mode {
            SelectMode::Strict => Ok(None),
            SelectMode::Relaxed => select_passthrough(node, filter, mode, consume),
            SelectMode::NextLevel => Ok(Some(frontier_node(node)?)),
        },
    }
}

fn select_matched(
    node: &Node,
    allowed: &[String],
    filter: &Filter,
    mode: SelectMode,
    consume: bool,
) -> Result<Option<Node>> {
    let (indices, new_values) = node.values().filter(Criterion::List(allowed))?;
    if indices.is_empty() {
        return Ok(None);
    }
    let mut metadata = MetadataMap::new();
    for (name, arr) in node.metadata() {
        metadata.insert(name.clone(), arr.take_last_axis(&indices)?);
    }

    let mut next_filter = filter.clone();
    if consume {
        next_filter.remove(node.key());
    }

    let recursed: Result<Vec<Option<Node>>> =
        node.children().as_slice().iter().map(|c| select_node(c, &next_filter, mode, consume)).collect();
    let mut survivors: Vec<Node> = recursed?.into_iter().flatten().collect();

    if !node.is_leaf() && survivors.is_empty() {
        return Ok(None);
    }
    if node.is_leaf() && consume && !next_filter.is_empty() {
        return Ok(None);
    }
    Node::new(node.key(), new_values, Children::new(survivors), metadata, node.depth()).map(Some)
}

fn select_passthrough(node: &Node, filter: &Filter, mode: SelectMode, consume: bool) -> Result<Option<Node>> {
    let recursed: Result<Vec<Option<Node>>> =
        node.children().as_slice().iter().map(|c| select_node(c, filter, mode, consume)).collect();
    let survivors: Vec<Node> = recursed?.into_iter().flatten().collect();

    if !node.is_leaf() && survivors.is_empty() {
        return Ok(None);
    }
    if node.is_leaf() && consume && !filter.is_empty() {
        return Ok(None);
    }

    Node::new(
        node.key(),
        node.values().clone(),
        Children::new(survivors),
        node.metadata().clone(),
        node.depth(),
    )
    .map(Some)
}

fn frontier_node(node: &Node) -> Result<Node> {
    use crate::types::metadata::{ArrayData, MetadataArray};

    let mut metadata = node.metadata().clone();
    let n = node.values().len();
    metadata.insert(
        FRONTIER_MARKER.to_string(),
        MetadataArray::new(vec![n], ArrayData::Int64(vec![1; n]))?,
    );
    Node::new(node.key(), node.values().clone(), Children::default(), metadata, node.depth())
}
