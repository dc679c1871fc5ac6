//! The compressor: merges sibling nodes whose key and *children* agree
//! structurally into a single multi-valued node, unioning their value
//! groups and concatenating their metadata in lockstep.

use {
    crate::{
        error::{Error, Result},
        types::{
            children::Children,
            hash::StructuralHash,
            metadata::{MetadataArray, MetadataMap},
            node::Node,
            value::ValueGroup,
        },
    },
    itertools::Itertools,
};

/// Merge a list of sibling nodes (already structurally minimal one level
/// deeper — this pass is not recursive) into the smallest equivalent list.
#[tracing::instrument(skip(children))]
pub fn compress_children(children: Vec<Node>) -> Result<Vec<Node>> {
    let groups = children.into_iter().into_group_map_by(|child| {
        let child_hashes: Vec<StructuralHash> =
            child.children().as_slice().iter().map(Node::hash).collect();
        (child.key().to_string(), child_hashes)
    });

    let mut merged_count = 0usize;
    let mut out = Vec::with_capacity(groups.len());
    for (_key, mut members) in groups {
        if members.len() == 1 {
            out.push(members.pop().unwrap());
        } else {
            merged_count += members.len() - 1;
            out.push(merge_siblings(members)?);
        }
    }
    if merged_count > 0 {
        tracing::debug!(merged_count, "compressed sibling nodes");
    }
    Ok(out)
}

/// Recursively compress an entire tree, bottom-up.
pub fn compress_tree(node: &Node) -> Result<Node> {
    let compressed_children: Result<Vec<Node>> =
        node.children().as_slice().iter().map(compress_tree).collect();
    let compressed_children = compress_children(compressed_children?)?;
    node.with_children(Children::new(compressed_children))
}

fn merge_siblings(members: Vec<Node>) -> Result<Node> {
    let key = members[0].key().to_string();
    let depth = members[0].depth();

    let merged_values = merge_value_groups(members.iter().map(Node::values))?;
    let merged_own_metadata = merge_metadata_maps(members.iter().map(Node::metadata))?;

    let child_count = members[0].children().count();
    let mut merged_children = Vec::with_capacity(child_count);
    for i in 0..child_count {
        let at_i: Vec<&Node> =
            members.iter().map(|m| &m.children().as_slice()[i]).collect();
        merged_children.push(merge_child_position(&at_i)?);
    }

    Node::new(key, merged_values, Children::new(merged_children), merged_own_metadata, depth)
}

fn merge_value_groups<'a>(mut groups: impl Iterator<Item = &'a ValueGroup>) -> Result<ValueGroup> {
    let first = groups.next().expect("merge group is never empty");
    match first {
        ValueGroup::Wildcard => {
            for g in groups {
                if !g.is_wildcard() {
                    return Err(Error::TypeMismatch(
                        "cannot merge a wildcard sibling with an enumeration sibling".into(),
                    ));
                }
            }
            Ok(ValueGroup::Wildcard)
        }
        ValueGroup::Enum { dtype, values } => {
            let mut all_values = values.clone();
            for g in groups {
                match g {
                    ValueGroup::Enum { dtype: d, values: v } if d == dtype => {
                        all_values.extend(v.iter().cloned())
                    }
                    _ => {
                        return Err(Error::TypeMismatch(
                            "cannot merge sibling value groups of differing type or dtype".into(),
                        ))
                    }
                }
            }
            ValueGroup::enumeration(*dtype, all_values)
        }
    }
}

/// Merge each member's own metadata map. A name must appear on every member
/// or on none — a partially-present metadata name indicates a malformed
/// tree and is reported rather than silently dropped.
fn merge_metadata_maps<'a>(mut maps: impl Iterator<Item = &'a MetadataMap>) -> Result<MetadataMap> {
    let first = maps.next().expect("merge group is never empty");
    let mut per_name: Vec<Vec<&MetadataArray>> =
        first.iter().map(|(_, arr)| vec![arr]).collect();
    let names: Vec<&String> = first.keys().collect();

    for (i, m) in maps.enumerate() {
        for (slot, name) in names.iter().enumerate() {
            match m.get(*name) {
                Some(arr) => per_name[slot].push(arr),
                None => {
                    return Err(Error::ShapeMismatch(format!(
                        "metadata {name:?} present on some merged siblings but not member {}",
                        i + 1
                    )))
                }
            }
        }
        if m.len() != names.len() {
            return Err(Error::ShapeMismatch(
                "merged siblings carry inconsistent metadata schemas".into(),
            ));
        }
    }

    let mut merged = MetadataMap::new();
    for (name, arrays) in names.into_iter().zip(per_name) {
        merged.insert(name.clone(), MetadataArray::concatenate_last_axis(&arrays)?);
    }
    Ok(merged)
}

/// Merge the metadata of the same child position across several structurally
/// identical siblings. Concatenates along the parent's value axis (the
/// second-to-last axis) when present, which preserves a per-parent-value
/// distinction; when a child's metadata has no such axis yet, one is
/// created by giving every member a new leading axis of length one and
/// concatenating along it, so each merged parent value keeps its own
/// element instead of members silently being forced to agree.
fn merge_child_position(members: &[&Node]) -> Result<Node> {
    let first = members[0];
    let mut merged = MetadataMap::new();
    let names: Vec<&String> = first.metadata().keys().collect();
    for name in names {
        let arrays: Vec<&MetadataArray> =
            members.iter().map(|m| m.metadata().get(name).expect("schema checked by caller")).collect();
        let rank = arrays[0].shape.len();
        let value = if rank >= 2 {
            MetadataArray::concatenate_axis(&arrays, rank - 2)?
        } else {
            let promoted: Vec<MetadataArray> = arrays
                .iter()
                .map(|a| {
                    let mut shape = vec![1];
                    shape.extend(a.shape.iter().copied());
                    MetadataArray { shape, data: a.data.clone() }
                })
                .collect();
            let promoted_refs: Vec<&MetadataArray> = promoted.iter().collect();
            MetadataArray::concatenate_axis(&promoted_refs, 0)?
        };
        merged.insert(name.clone(), value);
    }
    Node::new(first.key(), first.values().clone(), first.children().clone(), merged, first.depth())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::{dtype::Dtype, metadata::ArrayData},
    };

    fn leaf(key: &str, vals: &[&str]) -> Node {
        Node::new(key, ValueGroup::from_strs(vals).unwrap(), Children::default(), MetadataMap::new(), 1)
            .unwrap()
    }

    #[test]
    fn merges_siblings_with_identical_empty_children() {
        let a = leaf("k", &["1"]);
        let b = leaf("k", &["2"]);
        let merged = compress_children(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].values().summary(), "1/2");
    }

    #[test]
    fn leaves_non_matching_children_uncompressed() {
        let a = leaf("k", &["1"]);
        let mut child = Children::default();
        child.insert(leaf("inner", &["z"]));
        let b = Node::new("k", ValueGroup::from_strs(["2"]).unwrap(), child, MetadataMap::new(), 1).unwrap();
        let merged = compress_children(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn own_metadata_concatenates_in_member_order() {
        let meta_a = MetadataArray::new(vec![1], ArrayData::Int64(vec![10])).unwrap();
        let meta_b = MetadataArray::new(vec![1], ArrayData::Int64(vec![20])).unwrap();
        let mut ma = MetadataMap::new();
        ma.insert("offset".to_string(), meta_a);
        let mut mb = MetadataMap::new();
        mb.insert("offset".to_string(), meta_b);
        let a = Node::new("k", ValueGroup::from_strs(["1"]).unwrap(), Children::default(), ma, 1).unwrap();
        let b = Node::new("k", ValueGroup::from_strs(["2"]).unwrap(), Children::default(), mb, 1).unwrap();
        let merged = compress_children(vec![a, b]).unwrap();
        let arr = merged[0].metadata().get("offset").unwrap();
        assert_eq!(arr.data, ArrayData::Int64(vec![10, 20]));
    }

    #[test]
    fn wildcard_and_enum_cannot_merge() {
        let a = leaf("k", &["1"]);
        let b = Node::new("k", ValueGroup::wildcard(), Children::default(), MetadataMap::new(), 1).unwrap();
        // Different children-hash groups (both empty here though) but same key:
        // force into same group by construction for the purposes of this test.
        let result = merge_value_groups([a.values(), b.values()].into_iter());
        assert!(result.is_err());
        let _ = Dtype::Str;
    }
}
