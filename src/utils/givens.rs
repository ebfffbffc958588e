//! Givens rotations for the incremental least-squares reductions.
//!
//! A rotation G = [[c, s], [-s, c]] is chosen so that G·[a, b]ᵀ = [r, 0]ᵀ,
//! eliminating the subdiagonal entry of a Hessenberg or tridiagonal column.
//! Blocked solvers build one rotation per right-hand-side column.

use num_traits::Float;

#[derive(Clone, Copy, Debug)]
pub struct GivensRotation<T> {
    pub c: T,
    pub s: T,
}

impl<T: Float> GivensRotation<T> {
    /// Rotation annihilating `b` against `a`; returns the rotation and the
    /// resulting r = sqrt(a² + b²). Falls back to the identity when the pair
    /// is below `eps`, leaving `a` unchanged (zero-pivot guard).
    pub fn new(a: T, b: T, eps: T) -> (Self, T) {
        let r = (a * a + b * b).sqrt();
        if r < eps {
            (Self { c: T::one(), s: T::zero() }, a)
        } else {
            (Self { c: a / r, s: b / r }, r)
        }
    }

    /// Apply to a coefficient pair: (a, b) → (c·a + s·b, −s·a + c·b).
    pub fn apply(&self, a: T, b: T) -> (T, T) {
        (self.c * a + self.s * b, self.s.neg() * a + self.c * b)
    }
}
