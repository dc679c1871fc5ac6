pub mod compress;
pub mod construct;
pub mod error;
pub mod iter;
pub mod qube;
pub mod select;
pub mod serialize;
pub mod set_ops;
pub mod types;

pub use {
    error::{Error, Result},
    qube::Qube,
    select::{Filter, SelectMode},
    types::{ArrayData, Children, Dtype, MetadataArray, MetadataMap, Node, StructuralHash, Value, ValueGroup},
};

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
