//! Core contracts and adapters: operator, inner product, block kernels.

pub mod block;
pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, Operator};
pub use wrappers::{DiagonalOperator, EuclideanInner, FnOperator, WeightedInner};
