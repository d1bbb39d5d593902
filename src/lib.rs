// lints and similar
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
Heisenberg-picture Pauli propagation.

An observable, written as a weighted sum of Pauli strings, is conjugated
backwards through a quantum circuit. Clifford gates permute the strings with a
sign; Pauli rotations and amplitude-damping noise split one term into two with
angle-dependent coefficients; configurable truncation keeps the growth bounded.
Expectation values against stock states are filtered coefficient sums over the
final terms.

Pauli strings are packed two bits per site into an unsigned integer chosen by
the user (any of `u8` through `u128`, or — behind the `bigint` feature — an
arbitrary-precision integer). Sums come in two shapes: the hash-keyed
[PauliSum](sum::PauliSum) and the vector-backed
[DensePauliSum](sum::DensePauliSum), whose propagation kernels run
data-parallel.

# Example

```
use pauli_propagation::{
    circuit::Circuit,
    overlap::overlap_with_zero,
    pauli::Pauli,
    propagator::{propagate, Options, Truncation},
    sum::{PauliSum, TermSum},
};

// a Z observable on the middle of a small transverse-field Ising chain
let mut observable = PauliSum::<u64>::new(4);
observable.add_pauli(Pauli::Z, 2, 1.0).unwrap();

let mut circuit = Circuit::new();
for layer in 0..3 {
    for site in 0..4 {
        circuit.rx(site);
    }
    for site in (layer % 2)..3 {
        circuit.rzz(site, site + 1);
    }
}
let angles = vec![0.1; circuit.num_parametrized()];

let options = Options::new(Truncation::default().max_weight(3).min_abs_coeff(1e-10));
let evolved = propagate(&circuit, &observable, &angles, &options).unwrap();
let expectation = overlap_with_zero(&evolved);
assert!(expectation.abs() <= 1.0 + 1e-12);
```
*/

pub mod circuit;
pub mod coefficient;
pub mod gate;
pub mod overlap;
pub mod pauli;
pub mod propagator;
pub mod sum;
pub mod symmetry;

#[doc(inline)]
pub use circuit::Circuit;
#[doc(inline)]
pub use coefficient::{Coefficient, PathProperties};
#[doc(inline)]
pub use gate::Gate;
#[doc(inline)]
pub use pauli::{Pauli, PauliString};
#[doc(inline)]
pub use propagator::{propagate, propagate_in_place, Options, Picture, PropagationError, Truncation};
#[doc(inline)]
pub use sum::{DensePauliSum, PauliSum, TermSum};

#[cfg(test)]
mod tests {
    use super::*;

    fn normal<T: Sized + Send + Sync + Unpin>() {}

    #[test]
    fn marker() {
        // keep the public types usable across threads; a failure here would be
        // a breaking change
        normal::<Pauli>();
        normal::<pauli::Phase>();
        normal::<PauliString<u64>>();
        normal::<PathProperties<f64>>();
        normal::<PauliSum<u64, f64>>();
        normal::<DensePauliSum<u64, f64>>();
        normal::<Gate<u64, f64>>();
        normal::<Circuit<u64, f64>>();
        normal::<Truncation<u64, f64>>();
        normal::<Options<u64, f64>>();
        normal::<propagator::KeyedPropagator<u64, f64>>();
        normal::<propagator::DensePropagator<u64, f64>>();
        normal::<PropagationError>();
        #[cfg(feature = "bigint")]
        normal::<PauliString<num_bigint::BigUint>>();
    }
}
