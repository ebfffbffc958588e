//! Orthogonalization engines driving the Krylov solvers.
//!
//! Both engines build an incrementally growing basis that is orthonormal
//! with respect to the active inner product, one block per step, batched
//! over the k right-hand-side columns:
//!
//! - [`Arnoldi`]: general operators, upper-Hessenberg recurrence (GMRES).
//! - [`Lanczos`]: symmetric operators, three-term tridiagonal recurrence
//!   (MINRES).
//!
//! A near-zero recurrence coefficient marks the column's Krylov subspace as
//! invariant. That is usually a benign convergence event; the solver decides
//! by checking the residual (see `BreakdownReason::SingularProjection`).

pub mod arnoldi;
pub mod lanczos;

pub use arnoldi::Arnoldi;
pub use lanczos::{Lanczos, LanczosStep};
