//! N-dimensional typed metadata arrays attached to a node. A node at depth
//! `d` whose value group has length `n_d` owns metadata arrays of shape
//! `(n_0, .., n_d)`, where `n_0..n_{d-1}` mirror the ancestor chain. Only the
//! operations actually needed by the set engine, compressor and selector are
//! implemented: attach, push-down broadcast, concatenate, and gather
//! ("take").

use {
    crate::error::{Error, Result},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

pub type MetadataMap = BTreeMap<String, MetadataArray>;

#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dtype_name(&self) -> &'static str {
        match self {
            ArrayData::Int64(_) => "int64",
            ArrayData::Float64(_) => "float64",
            ArrayData::Str(_) => "str",
        }
    }

    /// Gather indices along the flat (last-axis-major) buffer.
    fn take_flat(&self, indices: &[usize]) -> ArrayData {
        match self {
            ArrayData::Int64(v) => ArrayData::Int64(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Float64(v) => ArrayData::Float64(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Str(v) => ArrayData::Str(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

}

/// A metadata array together with its logical shape. `shape.last()` must
/// equal the owning node's value-group length; earlier axes mirror the
/// ancestor chain's value-group lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataArray {
    pub shape: Vec<usize>,
    pub data: ArrayData,
}

impl MetadataArray {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch(format!(
                "shape {shape:?} implies {expected} elements but data has {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn last_axis_len(&self) -> usize {
        *self.shape.last().unwrap_or(&0)
    }

    /// Broadcast this array, whose last axis belongs to the parent, down
    /// onto a child whose value-group length is `n`: append a trailing axis
    /// of length `n`, repeating every existing element `n` times.
    pub fn push_down(&self, n: usize) -> MetadataArray {
        let mut shape = self.shape.clone();
        shape.push(n);
        let data = match &self.data {
            ArrayData::Int64(v) => {
                ArrayData::Int64(v.iter().flat_map(|&x| std::iter::repeat(x).take(n)).collect())
            }
            ArrayData::Float64(v) => {
                ArrayData::Float64(v.iter().flat_map(|&x| std::iter::repeat(x).take(n)).collect())
            }
            ArrayData::Str(v) => ArrayData::Str(
                v.iter().flat_map(|x| std::iter::repeat(x.clone()).take(n)).collect(),
            ),
        };
        MetadataArray { shape, data }
    }

    /// Gather along the last axis given retained indices into that axis,
    /// keeping earlier axes untouched (they are assumed length 1, i.e. this
    /// array belongs to a single node's own value group, not a broadcast
    /// ancestor view).
    pub fn take_last_axis(&self, indices: &[usize]) -> Result<MetadataArray> {
        let last = self.last_axis_len();
        for &i in indices {
            if i >= last {
                return Err(Error::ShapeMismatch(format!(
                    "index {i} out of bounds for axis of length {last}"
                )));
            }
        }
        let mut shape = self.shape.clone();
        *shape.last_mut().unwrap() = indices.len();
        let data = self.data.take_flat(indices);
        Ok(MetadataArray { shape, data })
    }

    pub fn concatenate_last_axis(arrays: &[&MetadataArray]) -> Result<MetadataArray> {
        if arrays.is_empty() {
            return Err(Error::ShapeMismatch("cannot concatenate zero arrays".into()));
        }
        let axis = arrays[0].shape.len().saturating_sub(1);
        Self::concatenate_axis(arrays, axis)
    }

    /// Concatenate arrays sharing every dimension except `axis`, along
    /// `axis`. Used by the compressor to merge sibling nodes: their own
    /// value axis (the last axis) concatenates directly, while their
    /// children's metadata concatenates along the parent's value axis (the
    /// second-to-last axis of the child's array) to preserve a
    /// per-parent-value distinction (the "non-monotonic" metadata case).
    pub fn concatenate_axis(arrays: &[&MetadataArray], axis: usize) -> Result<MetadataArray> {
        if arrays.is_empty() {
            return Err(Error::ShapeMismatch("cannot concatenate zero arrays".into()));
        }
        let ndim = arrays[0].shape.len();
        if axis >= ndim {
            return Err(Error::ShapeMismatch(format!("axis {axis} out of bounds for rank {ndim}")));
        }
        for a in arrays {
            if a.shape.len() != ndim {
                return Err(Error::ShapeMismatch("metadata arrays have differing rank".into()));
            }
            for (i, (d1, d2)) in a.shape.iter().zip(arrays[0].shape.iter()).enumerate() {
                if i != axis && d1 != d2 {
                    return Err(Error::ShapeMismatch(
                        "metadata arrays differ outside the concatenation axis".into(),
                    ));
                }
            }
        }

        let inner: usize = arrays[0].shape[axis + 1..].iter().product();
        let outer: usize = arrays[0].shape[..axis].iter().product();
        let axis_lens: Vec<usize> = arrays.iter().map(|a| a.shape[axis]).collect();
        let total_axis: usize = axis_lens.iter().sum();
        let mut shape = arrays[0].shape.clone();
        shape[axis] = total_axis;

        for a in arrays {
            if std::mem::discriminant(&a.data) != std::mem::discriminant(&arrays[0].data) {
                return Err(Error::TypeMismatch("metadata dtype mismatch on concat".into()));
            }
        }

        let data = match &arrays[0].data {
            ArrayData::Int64(_) => {
                let mut out = Vec::with_capacity(outer * total_axis * inner);
                for o in 0..outer {
                    for (a, &alen) in arrays.iter().zip(&axis_lens) {
                        let ArrayData::Int64(v) = &a.data else { unreachable!() };
                        let start = o * alen * inner;
                        out.extend_from_slice(&v[start..start + alen * inner]);
                    }
                }
                ArrayData::Int64(out)
            }
            ArrayData::Float64(_) => {
                let mut out = Vec::with_capacity(outer * total_axis * inner);
                for o in 0..outer {
                    for (a, &alen) in arrays.iter().zip(&axis_lens) {
                        let ArrayData::Float64(v) = &a.data else { unreachable!() };
                        let start = o * alen * inner;
                        out.extend_from_slice(&v[start..start + alen * inner]);
                    }
                }
                ArrayData::Float64(out)
            }
            ArrayData::Str(_) => {
                let mut out = Vec::with_capacity(outer * total_axis * inner);
                for o in 0..outer {
                    for (a, &alen) in arrays.iter().zip(&axis_lens) {
                        let ArrayData::Str(v) = &a.data else { unreachable!() };
                        let start = o * alen * inner;
                        out.extend_from_slice(&v[start..start + alen * inner]);
                    }
                }
                ArrayData::Str(out)
            }
        };
        Ok(MetadataArray { shape, data })
    }
}

/// Wire representation of one metadata array: `{shape, dtype, base64}` for
/// numeric dtypes (raw little-endian bytes), or `{shape, dtype, values}` for
/// strings, which don't have a meaningful fixed-width byte encoding.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataArrayWire {
    Numeric { shape: Vec<usize>, dtype: String, base64: String },
    Textual { shape: Vec<usize>, dtype: String, values: Vec<String> },
}

impl MetadataArray {
    pub fn to_wire(&self) -> MetadataArrayWire {
        use base64::{engine::general_purpose::STANDARD, Engine};
        match &self.data {
            ArrayData::Int64(v) => {
                let bytes: Vec<u8> = v.iter().flat_map(|x| x.to_le_bytes()).collect();
                MetadataArrayWire::Numeric {
                    shape: self.shape.clone(),
                    dtype: self.data.dtype_name().to_string(),
                    base64: STANDARD.encode(bytes),
                }
            }
            ArrayData::Float64(v) => {
                let bytes: Vec<u8> = v.iter().flat_map(|x| x.to_le_bytes()).collect();
                MetadataArrayWire::Numeric {
                    shape: self.shape.clone(),
                    dtype: self.data.dtype_name().to_string(),
                    base64: STANDARD.encode(bytes),
                }
            }
            ArrayData::Str(v) => MetadataArrayWire::Textual {
                shape: self.shape.clone(),
                dtype: self.data.dtype_name().to_string(),
                values: v.clone(),
            },
        }
    }

    pub fn from_wire(wire: MetadataArrayWire) -> Result<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        match wire {
            MetadataArrayWire::Numeric { shape, dtype, base64 } => {
                let bytes = STANDARD.decode(base64)?;
                let data = match dtype.as_str() {
                    "int64" => ArrayData::Int64(
                        bytes.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect(),
                    ),
                    "float64" => ArrayData::Float64(
                        bytes.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().unwrap())).collect(),
                    ),
                    other => {
                        return Err(Error::TypeMismatch(format!("unknown numeric metadata dtype {other}")))
                    }
                };
                MetadataArray::new(shape, data)
            }
            MetadataArrayWire::Textual { shape, values, .. } => {
                MetadataArray::new(shape, ArrayData::Str(values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_down_then_take_roundtrips() {
        let arr = MetadataArray::new(vec![2], ArrayData::Int64(vec![10, 20])).unwrap();
        let broadcast = arr.push_down(3);
        assert_eq!(broadcast.shape, vec![2, 3]);
        let wire = broadcast.to_wire();
        let back = match wire {
            MetadataArrayWire::Numeric { base64, shape, dtype } => {
                MetadataArray::from_wire(MetadataArrayWire::Numeric { base64, shape, dtype }).unwrap()
            }
            _ => unreachable!(),
        };
        assert_eq!(back, broadcast);
    }

    #[test]
    fn concatenate_last_axis_sums_lengths() {
        let a = MetadataArray::new(vec![2], ArrayData::Int64(vec![1, 2])).unwrap();
        let b = MetadataArray::new(vec![1], ArrayData::Int64(vec![3])).unwrap();
        let merged = MetadataArray::concatenate_last_axis(&[&a, &b]).unwrap();
        assert_eq!(merged.shape, vec![3]);
        assert_eq!(merged.data, ArrayData::Int64(vec![1, 2, 3]));
    }
}
