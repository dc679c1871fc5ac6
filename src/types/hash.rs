use {
    blake3::Hasher,
    serde::{
        de::{self, Deserialize, Deserializer, Visitor},
        ser::{Serialize, Serializer},
    },
    std::{array::TryFromSliceError, fmt},
};

pub const HASH_LEN: usize = blake3::OUT_LEN;

/// Domain separator bytes, so that a node with values `["a"]` and no children
/// never hashes the same as some other combination of the same bytes read
/// back to back.
const KEY_TAG: u8 = 0;
const VALUES_TAG: u8 = 1;
const CHILDREN_TAG: u8 = 2;

/// The `blake3::Hash` type doesn't have a convenient serialization method. We
/// replace it with this type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructuralHash([u8; HASH_LEN]);

impl StructuralHash {
    /// Hash a node from its key, a digest of its (sorted) value group, and
    /// the structural hashes of its already-sorted children. Metadata is
    /// deliberately excluded: two subtrees differing only in metadata must
    /// hash identically, which is what makes compression and cross-subtree
    /// equality cheap.
    pub fn of_node(key: &str, values_digest: &[u8], child_hashes: &[StructuralHash]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&[KEY_TAG]);
        hasher.update((key.len() as u32).to_be_bytes().as_slice());
        hasher.update(key.as_bytes());
        hasher.update(&[VALUES_TAG]);
        hasher.update(values_digest);
        hasher.update(&[CHILDREN_TAG]);
        hasher.update((child_hashes.len() as u32).to_be_bytes().as_slice());
        for child in child_hashes {
            hasher.update(child.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    pub fn into_bytes(self) -> [u8; HASH_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for StructuralHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for StructuralHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructuralHash({})", hex::encode(self.0))
    }
}

impl From<[u8; HASH_LEN]> for StructuralHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<blake3::Hash> for StructuralHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl TryFrom<&[u8]> for StructuralHash {
    type Error = TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; HASH_LEN]>::try_from(bytes).map(Self)
    }
}

impl AsRef<[u8]> for StructuralHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for StructuralHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for StructuralHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(HashVisitor)
    }
}

struct HashVisitor;

impl<'de> Visitor<'de> for HashVisitor {
    type Value = StructuralHash;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 32-byte array in hex encoding")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let bytes = hex::decode(v).map_err(E::custom)?;
        let bytes: [u8; HASH_LEN] = bytes.as_slice().try_into().map_err(E::custom)?;
        Ok(StructuralHash(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_hash_identically() {
        let a = StructuralHash::of_node("k", b"digest", &[]);
        let b = StructuralHash::of_node("k", b"digest", &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_part_of_the_hash() {
        let a = StructuralHash::of_node("k1", b"digest", &[]);
        let b = StructuralHash::of_node("k2", b"digest", &[]);
        assert_ne!(a, b);
    }
}
