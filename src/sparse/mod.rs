//! Sparse block linear algebra for the implicit cloth solver.
//!
//! [`SparseMat33`] stores 3×3 blocks per row and allocates its rows from a
//! [`FrameArena`] that lives for one simulation step.

mod arena;
mod dense_vec3;
mod diag_mat33;
mod sparse_mat33;

pub use arena::{FrameArena, RowValue};
pub use dense_vec3::DenseVec3;
pub use diag_mat33::DiagMat33;
pub use sparse_mat33::SparseMat33;
