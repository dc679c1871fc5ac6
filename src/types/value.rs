use {
    crate::{
        error::{Error, Result},
        types::dtype::{Dtype, Value},
    },
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// The set of values a node carries along its key. Either a concrete,
/// duplicate-free ordered enumeration, or a wildcard standing in for "any
/// value at all".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueGroup {
    Enum { dtype: Dtype, values: Vec<Value> },
    Wildcard,
}

/// A user-supplied filter criterion for [`ValueGroup::filter`].
pub enum Criterion<'a> {
    List(&'a [String]),
    Predicate(&'a dyn Fn(&Value) -> bool),
}

impl ValueGroup {
    pub fn enumeration(dtype: Dtype, mut values: Vec<Value>) -> Result<Self> {
        for v in &values {
            if v.dtype() != dtype {
                return Err(Error::TypeMismatch(format!(
                    "value {v} has dtype {} but group dtype is {dtype}",
                    v.dtype()
                )));
            }
        }
        dedup_preserve_order(&mut values);
        Ok(ValueGroup::Enum { dtype, values })
    }

    /// Build an enumeration from raw strings, inferring dtype from the
    /// first element and requiring the rest to match.
    pub fn from_strs<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values: Vec<Value> = Vec::new();
        let mut dtype = None;
        for raw in raw {
            let v = Value::infer_from_str(raw.as_ref());
            let d = *dtype.get_or_insert(v.dtype());
            if v.dtype() != d {
                return Err(Error::TypeMismatch(format!(
                    "mixed dtypes in enumeration: {d} and {}",
                    v.dtype()
                )));
            }
            values.push(v);
        }
        let dtype = dtype.unwrap_or(Dtype::Str);
        dedup_preserve_order(&mut values);
        Ok(ValueGroup::Enum { dtype, values })
    }

    pub fn wildcard() -> Self {
        ValueGroup::Wildcard
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ValueGroup::Wildcard)
    }

    pub fn len(&self) -> usize {
        match self {
            ValueGroup::Enum { values, .. } => values.len(),
            ValueGroup::Wildcard => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ValueGroup::Enum { values, .. } if values.is_empty())
    }

    pub fn dtype(&self) -> Option<Dtype> {
        match self {
            ValueGroup::Enum { dtype, .. } => Some(*dtype),
            ValueGroup::Wildcard => None,
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            ValueGroup::Enum { values, .. } => values,
            ValueGroup::Wildcard => &[],
        }
    }

    pub fn contains(&self, v: &Value) -> bool {
        match self {
            ValueGroup::Enum { values, .. } => values.contains(v),
            ValueGroup::Wildcard => true,
        }
    }

    /// Used for sorting sibling nodes: the minimum value, or `None` for a
    /// wildcard (which always sorts last among siblings of the same key).
    pub fn min(&self) -> Option<&Value> {
        match self {
            ValueGroup::Enum { values, .. } => values.iter().min(),
            ValueGroup::Wildcard => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ValueGroup::Enum { values, .. } if values.len() == 1 => values[0].to_string(),
            ValueGroup::Enum { values, .. } => {
                values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("/")
            }
            ValueGroup::Wildcard => "*".to_string(),
        }
    }

    /// Restrict this group to the indices matching `criterion`, returning
    /// the retained original indices (in original order) alongside the new
    /// group.
    pub fn filter(&self, criterion: Criterion<'_>) -> Result<(Vec<usize>, ValueGroup)> {
        match (self, criterion) {
            (ValueGroup::Enum { dtype, values }, Criterion::List(allowed)) => {
                let wanted: Result<Vec<Value>> =
                    allowed.iter().map(|raw| Value::coerce(raw, *dtype)).collect();
                let wanted = wanted?;
                let mut indices = Vec::new();
                let mut kept = Vec::new();
                for (i, v) in values.iter().enumerate() {
                    if wanted.contains(v) {
                        indices.push(i);
                        kept.push(v.clone());
                    }
                }
                Ok((indices, ValueGroup::Enum { dtype: *dtype, values: kept }))
            }
            (ValueGroup::Enum { dtype, values }, Criterion::Predicate(pred)) => {
                let mut indices = Vec::new();
                let mut kept = Vec::new();
                for (i, v) in values.iter().enumerate() {
                    if pred(v) {
                        indices.push(i);
                        kept.push(v.clone());
                    }
                }
                Ok((indices, ValueGroup::Enum { dtype: *dtype, values: kept }))
            }
            (ValueGroup::Wildcard, Criterion::List(allowed)) => {
                let group = ValueGroup::from_strs(allowed.iter())?;
                Ok((vec![0], group))
            }
            (ValueGroup::Wildcard, Criterion::Predicate(_)) => Err(Error::UnsupportedValueType(
                "cannot filter a wildcard group by predicate".to_string(),
            )),
        }
    }
}

impl ValueGroup {
    /// Bytes fed into a node's structural hash. Order-sensitive: two
    /// enumerations with the same elements in different orders are, by
    /// design, different nodes (order is part of the value group's
    /// identity).
    pub fn digest(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            ValueGroup::Wildcard => bytes.push(0xff),
            ValueGroup::Enum { dtype, values } => {
                bytes.push(match dtype {
                    Dtype::Str => 0,
                    Dtype::Int64 => 1,
                    Dtype::Float64 => 2,
                    Dtype::Date => 3,
                    Dtype::Datetime => 4,
                });
                bytes.extend((values.len() as u32).to_be_bytes());
                for v in values {
                    let repr = v.as_str_repr();
                    bytes.extend((repr.len() as u32).to_be_bytes());
                    bytes.extend(repr.as_bytes());
                }
            }
        }
        bytes
    }
}

impl fmt::Display for ValueGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

fn dedup_preserve_order(values: &mut Vec<Value>) {
    let mut seen: Vec<Value> = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_preserving_order() {
        let group = ValueGroup::from_strs(["b", "a", "b", "c"]).unwrap();
        assert_eq!(group.summary(), "b/a/c");
    }

    #[test]
    fn mixed_dtype_is_an_error() {
        let err = ValueGroup::enumeration(Dtype::Int64, vec![Value::Str("x".into())]);
        assert!(err.is_err());
    }

    #[test]
    fn wildcard_filtered_by_list_becomes_enum() {
        let (idx, group) = ValueGroup::wildcard()
            .filter(Criterion::List(&["a".to_string(), "b".to_string()]))
            .unwrap();
        assert_eq!(idx, vec![0]);
        assert!(!group.is_wildcard());
    }
}
