/*!
Symmetry merging: folding terms that a symmetry identifies.

When the propagated observable and the reference state share a symmetry (e.g.
translation on a ring), strings in the same orbit carry interchangeable
contributions. Mapping every string to a canonical orbit representative and
merging shrinks the sum without changing downstream overlaps.
*/

use crate::{coefficient::Coefficient, pauli::code::PauliCode, sum::TermSum};

/// Fold the sum along a symmetry: every string is replaced by its canonical
/// representative under `canon`, colliding terms merge.
///
/// `canon` must be constant on symmetry orbits; the driver does not check
/// this.
pub fn merge_by_symmetry<B, C, S, F>(sum: &S, canon: F) -> S
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
    F: Fn(&B) -> B,
{
    let mut merged = sum.similar();
    for (code, coeff) in sum.iter_terms() {
        merged.add(canon(code), coeff.clone());
    }
    merged
}
