pub mod recursive;
pub mod shallow;

pub use recursive::{apply, OpKind, DIFFERENCE, INTERSECTION, SYMMETRIC_DIFFERENCE, UNION};
