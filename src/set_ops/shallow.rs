//! The shallow set engine: partitioning two sibling value groups into
//! only-A / intersection / only-B, with the index bookkeeping the recursive
//! engine needs to gather the corresponding metadata slices.

use crate::{
    error::{Error, Result},
    types::value::ValueGroup,
};

/// One side of a partition: the original indices it came from, and the
/// value group built from those indices. `None` means this part of the
/// partition is empty and should be skipped entirely.
pub type Part = Option<(Vec<usize>, ValueGroup)>;

pub struct ShallowPartition {
    pub only_a: Part,
    pub intersection_a: Part,
    pub intersection_b: Part,
    pub only_b: Part,
}

pub fn partition(a: &ValueGroup, b: &ValueGroup) -> Result<ShallowPartition> {
    match (a, b) {
        (ValueGroup::Enum { dtype: da, values: va }, ValueGroup::Enum { dtype: db, values: vb }) => {
            if da != db {
                return Err(Error::TypeMismatch(format!(
                    "cannot intersect enumerations of dtype {da} and {db}"
                )));
            }
            let mut only_a_idx = Vec::new();
            let mut inter_a_idx = Vec::new();
            let mut inter_b_idx = Vec::new();
            for (i, v) in va.iter().enumerate() {
                if let Some(j) = vb.iter().position(|w| w == v) {
                    inter_a_idx.push(i);
                    inter_b_idx.push(j);
                } else {
                    only_a_idx.push(i);
                }
            }
            let only_b_idx: Vec<usize> = (0..vb.len())
                .filter(|j| !inter_b_idx.contains(j))
                .collect();

            let group_of = |idx: &[usize], src: &[crate::types::dtype::Value]| -> ValueGroup {
                ValueGroup::Enum { dtype: *da, values: idx.iter().map(|&i| src[i].clone()).collect() }
            };

            Ok(ShallowPartition {
                only_a: non_empty(only_a_idx.clone(), group_of(&only_a_idx, va)),
                intersection_a: non_empty(inter_a_idx.clone(), group_of(&inter_a_idx, va)),
                intersection_b: non_empty(inter_b_idx.clone(), group_of(&inter_b_idx, vb)),
                only_b: non_empty(only_b_idx.clone(), group_of(&only_b_idx, vb)),
            })
        }
        (ValueGroup::Wildcard, ValueGroup::Wildcard) => Ok(ShallowPartition {
            only_a: None,
            only_b: None,
            intersection_a: Some((vec![0], ValueGroup::Wildcard)),
            intersection_b: Some((vec![0], ValueGroup::Wildcard)),
        }),
        (ValueGroup::Wildcard, ValueGroup::Enum { values: vb, .. }) => Ok(ShallowPartition {
            only_a: Some((vec![0], ValueGroup::Wildcard)),
            only_b: None,
            intersection_a: non_empty(vec![0; vb.len()], b.clone()),
            intersection_b: non_empty((0..vb.len()).collect(), b.clone()),
        }),
        (ValueGroup::Enum { values: va, .. }, ValueGroup::Wildcard) => Ok(ShallowPartition {
            only_a: None,
            only_b: Some((vec![0], ValueGroup::Wildcard)),
            intersection_a: non_empty((0..va.len()).collect(), a.clone()),
            intersection_b: non_empty(vec![0; va.len()], a.clone()),
        }),
    }
}

fn non_empty(idx: Vec<usize>, group: ValueGroup) -> Part {
    if idx.is_empty() {
        None
    } else {
        Some((idx, group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_group(vals: &[&str]) -> ValueGroup {
        ValueGroup::from_strs(vals).unwrap()
    }

    #[test]
    fn enum_enum_four_way_partition() {
        let a = enum_group(&["1", "2", "3"]);
        let b = enum_group(&["2", "3", "4"]);
        let p = partition(&a, &b).unwrap();
        assert_eq!(p.only_a.unwrap().1.summary(), "1");
        assert_eq!(p.only_b.unwrap().1.summary(), "4");
        assert_eq!(p.intersection_a.unwrap().1.summary(), "2/3");
        assert_eq!(p.intersection_b.unwrap().1.summary(), "2/3");
    }

    #[test]
    fn wildcard_enum_consumes_enum_entirely() {
        let p = partition(&ValueGroup::Wildcard, &enum_group(&["a", "b"])).unwrap();
        assert!(p.only_b.is_none());
        assert_eq!(p.intersection_b.unwrap().1.summary(), "a/b");
    }

    #[test]
    fn wildcard_wildcard_has_no_residual() {
        let p = partition(&ValueGroup::Wildcard, &ValueGroup::Wildcard).unwrap();
        assert!(p.only_a.is_none());
        assert!(p.only_b.is_none());
    }
}
