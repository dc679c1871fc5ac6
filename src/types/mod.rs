pub mod children;
pub mod dtype;
pub mod hash;
pub mod metadata;
pub mod node;
pub mod value;

pub use {
    children::Children,
    dtype::{Dtype, Value},
    hash::{StructuralHash, HASH_LEN},
    metadata::{ArrayData, MetadataArray, MetadataMap},
    node::Node,
    value::{Criterion, ValueGroup},
};
