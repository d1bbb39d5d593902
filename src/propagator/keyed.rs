/*!
The single-threaded backend over the hash-keyed sum.
*/

use std::mem;

use log::trace;

use super::{Propagatable, PropagationError, Propagator, Truncation};
use crate::{
    coefficient::Coefficient,
    gate::{AmplitudeDamping, CliffordGate, PauliNoise, PauliRotation, UserGate},
    pauli::{code::PauliCode, Pauli},
    sum::{PauliSum, TermSum},
};

/// The keyed propagation cache: a live map and an auxiliary map of the same
/// shape.
///
/// Kernels that rewrite keys (Clifford, custom) rebuild into `aux` and swap;
/// branching kernels leave the surviving term in `main` and collect the new
/// branches in `aux` until [merge](Propagator::merge) folds them back. Outside
/// a gate application `aux` is empty.
#[derive(Debug, Clone)]
pub struct KeyedPropagator<B, C> {
    main: PauliSum<B, C>,
    aux: PauliSum<B, C>,
}

impl<B: PauliCode, C: Coefficient> KeyedPropagator<B, C> {
    /// The live sum.
    pub fn main(&self) -> &PauliSum<B, C> {
        &self.main
    }

    /// Exchange the live and the auxiliary sum, O(1).
    pub fn swap(&mut self) {
        mem::swap(&mut self.main, &mut self.aux);
    }
}

impl<B: PauliCode, C: Coefficient> Propagator<B, C> for KeyedPropagator<B, C> {
    type Sum = PauliSum<B, C>;

    fn from_sum(sum: Self::Sum) -> Self {
        let aux = sum.similar();
        Self { main: sum, aux }
    }

    fn into_sum(self) -> Self::Sum {
        self.main
    }

    fn nsites(&self) -> usize {
        self.main.nsites()
    }

    fn len(&self) -> usize {
        self.main.len()
    }

    fn apply_clifford(&mut self, gate: &CliffordGate) -> Result<(), PropagationError> {
        let Self { main, aux } = self;
        for (code, coeff) in main.drain_terms() {
            let mut image = code;
            let sign = gate.conjugate(&mut image);
            let mut coeff = coeff;
            coeff.scale(sign);
            // a permutation cannot collide
            aux.set(image, coeff);
        }
        mem::swap(main, aux);
        Ok(())
    }

    fn apply_rotation(
        &mut self,
        gate: &PauliRotation,
        theta: f64,
    ) -> Result<(), PropagationError> {
        let Self { main, aux } = self;
        let generator: B = gate.generator();
        for (code, coeff) in main.iter_terms_mut() {
            if generator.commutes_with(code) {
                continue;
            }
            let (sign, product) = PauliRotation::branch(&generator, code);
            aux.add(product, coeff.branch_sin(theta, sign));
            coeff.apply_cos(theta);
        }
        Ok(())
    }

    fn apply_pauli_noise(&mut self, gate: &PauliNoise) -> Result<(), PropagationError> {
        for (code, coeff) in self.main.iter_terms_mut() {
            coeff.scale(gate.factor(code.get(gate.site())));
        }
        Ok(())
    }

    fn apply_damping(&mut self, gate: &AmplitudeDamping) -> Result<(), PropagationError> {
        let Self { main, aux } = self;
        for (code, coeff) in main.iter_terms_mut() {
            match gate.diagonal_factor(code.get(gate.site())) {
                Some(factor) => coeff.scale(factor),
                None => {
                    let (kept_factor, fed_factor) = gate.branch_factors();
                    let mut fed = coeff.clone();
                    fed.scale(fed_factor);
                    let mut identity = code.clone();
                    identity.set(gate.site(), Pauli::I);
                    // the identity child may collide with existing strings
                    aux.add(identity, fed);
                    coeff.scale(kept_factor);
                },
            }
        }
        Ok(())
    }

    fn apply_custom(
        &mut self,
        gate: &dyn UserGate<B, C>,
        parameter: Option<f64>,
    ) -> Result<(), PropagationError> {
        let Self { main, aux } = self;
        for (code, coeff) in main.drain_terms() {
            for (branch, branch_coeff) in gate.apply(&code, coeff, parameter) {
                aux.add(branch, branch_coeff);
            }
        }
        mem::swap(main, aux);
        Ok(())
    }

    fn merge(&mut self) -> Result<(), PropagationError> {
        // fold the smaller map into the larger one
        if self.main.len() < self.aux.len() {
            mem::swap(&mut self.main, &mut self.aux);
        }
        trace!("merging {} terms into {}", self.aux.len(), self.main.len());
        let Self { main, aux } = self;
        for (code, coeff) in aux.drain_terms() {
            main.add(code, coeff);
        }
        Ok(())
    }

    fn truncate(&mut self, truncation: &Truncation<B, C>) -> Result<(), PropagationError> {
        self.main.retain_terms(|code, coeff| !truncation.discards(code, coeff));
        Ok(())
    }
}

impl<B: PauliCode, C: Coefficient> Propagatable<B, C> for PauliSum<B, C> {
    type Backend = KeyedPropagator<B, C>;
}
