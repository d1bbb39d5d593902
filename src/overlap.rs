/*!
Overlaps of Pauli sums with stock states, and the scalar-product surface.

An overlap `⟨ψ| sum |ψ⟩` in the Pauli basis is a filtered sum of coefficients:
a Pauli string contributes iff it is not orthogonal to the reference state, and
for product states orthogonality is a per-site popcount question. The stock
predicates cover `|0…0⟩` (any X or Y is orthogonal) and `|+…+⟩` (any Y or Z);
computational basis states additionally pick up a sign per Z on a `1` site.
*/

use num_traits::Zero;

use crate::{
    coefficient::{CoeffValue, Coefficient},
    pauli::{code::PauliCode, string::ShapeMismatch, Pauli},
    sum::TermSum,
};

/// Sum the numeric components of all terms whose string is **not** orthogonal
/// to the reference state described by `orthogonal`.
pub fn overlap_by_orthogonality<B, C, S, F>(sum: &S, orthogonal: F) -> C::Value
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
    F: Fn(&B) -> bool,
{
    let mut total = C::Value::zero();
    for (code, coeff) in sum.iter_terms() {
        if !orthogonal(code) {
            total += coeff.value();
        }
    }
    total
}

/// The expectation value of the sum in `|0…0⟩`.
pub fn overlap_with_zero<B, C, S>(sum: &S) -> C::Value
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
{
    overlap_by_orthogonality(sum, |code| code.count_x_or_y() > 0)
}

/// The expectation value of the sum in `|+…+⟩`.
pub fn overlap_with_plus<B, C, S>(sum: &S) -> C::Value
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
{
    overlap_by_orthogonality(sum, |code| code.count_y_or_z() > 0)
}

/// The expectation value in the computational basis state with `1`s exactly at
/// `one_sites`.
///
/// A term contributes iff it carries no X or Y; each Z at a `1` site flips its
/// sign.
pub fn overlap_with_computational<B, C, S>(sum: &S, one_sites: &[usize]) -> C::Value
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
{
    let mut total = C::Value::zero();
    for (code, coeff) in sum.iter_terms() {
        if code.count_x_or_y() > 0 {
            continue;
        }
        let flips = one_sites.iter().filter(|&&site| code.get(site) == Pauli::Z).count();
        let mut value = coeff.value();
        if flips % 2 == 1 {
            value.scale(-1.0);
        }
        total += value;
    }
    total
}

/// The scalar product of two sums: the sum over the common strings of the
/// products of the numeric components.
pub fn scalar_product<B, C, S, T>(left: &S, right: &T) -> Result<C::Value, ShapeMismatch>
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
    T: TermSum<B, C>,
{
    if left.nsites() != right.nsites() {
        return Err(ShapeMismatch { left: left.nsites(), right: right.nsites() });
    }
    let mut total = C::Value::zero();
    for (code, coeff) in left.iter_terms() {
        total += coeff.value() * right.coeff(code).value();
    }
    Ok(total)
}

/// The trace of the sum as an operator: `2^n` times the identity coefficient.
pub fn trace<B, C, S>(sum: &S) -> C::Value
where
    B: PauliCode,
    C: Coefficient,
    S: TermSum<B, C>,
{
    let mut value = sum.coeff(&B::identity()).value();
    value.scale(2f64.powi(sum.nsites() as i32));
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sum::{DensePauliSum, PauliSum};

    fn sample() -> PauliSum<u64, f64> {
        let mut sum = PauliSum::new(3);
        sum.add_pauli(Pauli::Z, 0, 0.5).unwrap();
        sum.add_pauli(Pauli::X, 1, 2.0).unwrap();
        sum.add_paulis(&[Pauli::Z, Pauli::Z], &[0, 2], 0.25).unwrap();
        sum.add(0, 1.0); // identity term
        sum
    }

    #[test]
    fn stock_states() {
        let sum = sample();
        // X-carrying terms are orthogonal to |000>
        assert_eq!(overlap_with_zero(&sum), 1.75);
        // Z-carrying terms are orthogonal to |+++>
        assert_eq!(overlap_with_plus(&sum), 3.0);
    }

    #[test]
    fn computational_states() {
        let sum = sample();
        // |001> (site 2 is 1): ZI Z flips once, Z at site 0 does not
        assert_eq!(overlap_with_computational(&sum, &[2]), 1.0 + 0.5 - 0.25);
        // |100>: both Z-carrying terms flip
        assert_eq!(overlap_with_computational(&sum, &[0]), 1.0 - 0.5 - 0.25);
        // |000> reduces to the zero-state overlap
        assert_eq!(overlap_with_computational(&sum, &[]), overlap_with_zero(&sum));
    }

    #[test]
    fn scalar_product_symmetry() {
        let a = sample();
        let mut b = PauliSum::<u64, f64>::new(3);
        b.add_pauli(Pauli::Z, 0, -2.0).unwrap();
        b.add_pauli(Pauli::Y, 2, 1.0).unwrap();
        assert_eq!(scalar_product(&a, &b).unwrap(), scalar_product(&b, &a).unwrap());
        assert_eq!(scalar_product(&a, &b).unwrap(), 0.5 * -2.0);

        let dense = DensePauliSum::from(&b);
        assert_eq!(scalar_product(&a, &dense).unwrap(), -1.0);

        let wrong = PauliSum::<u64, f64>::new(2);
        assert!(scalar_product(&a, &wrong).is_err());
    }

    #[test]
    fn trace_reads_identity() {
        let sum = sample();
        assert_eq!(trace(&sum), 8.0);
        let empty = PauliSum::<u64, f64>::new(3);
        assert_eq!(trace(&empty), 0.0);
    }
}
