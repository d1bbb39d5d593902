/*!
Pauli rotations, `exp(-i θ/2 P)` for a Pauli-string generator `P`.

Conjugating a Pauli `Q` through a rotation leaves `Q` fixed when it commutes
with the generator; otherwise it splits into the cosine branch `cos θ · Q` and
the sine branch `s · sin θ · (P ⊕ Q)`, where `s = Re(i · phase(P·Q))` is a real
sign because anticommuting Pauli products carry imaginary phases.
*/

use crate::{
    gate::UnsupportedGate,
    pauli::{code::PauliCode, Pauli},
};

/// A parametrized rotation about a Pauli-string generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauliRotation {
    paulis: Vec<Pauli>,
    sites: Vec<usize>,
}

impl PauliRotation {
    /// A rotation with generator `paulis` on `sites` (one Pauli per site).
    ///
    /// The generator must have support everywhere it is defined: identity
    /// entries are rejected, as are repeated sites.
    pub fn new(paulis: Vec<Pauli>, sites: Vec<usize>) -> Result<Self, UnsupportedGate> {
        if paulis.is_empty()
            || paulis.len() != sites.len()
            || paulis.iter().any(|p| !p.is_support())
            || sites.iter().enumerate().any(|(i, a)| sites[..i].contains(a))
        {
            return Err(UnsupportedGate(format!(
                "rotation generator needs distinct sites with non-identity Paulis, \
                 got {paulis:?} on {sites:?}"
            )));
        }
        Ok(Self { paulis, sites })
    }

    /// The generator Paulis, matching [sites](Self::sites) entry by entry.
    pub fn paulis(&self) -> &[Pauli] {
        &self.paulis
    }

    /// The sites the generator acts on.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// The packed generator mask. Built once per gate application, before the
    /// per-term loop.
    pub fn generator<B: PauliCode>(&self) -> B {
        let mut code = B::identity();
        for (&pauli, &site) in self.paulis.iter().zip(&self.sites) {
            code.set(site, pauli);
        }
        code
    }

    /// The sign `s` of the sine branch produced by conjugating `code`, together
    /// with the branch string. Callers must ensure that `code` anticommutes
    /// with the generator.
    #[inline]
    pub fn branch<B: PauliCode>(generator: &B, code: &B) -> (f64, B) {
        let (phase, product) = generator.product(code);
        (phase.times_i().real(), product)
    }
}

/// A parametrized gate with its parameter bound at circuit construction.
///
/// At propagation time the gate is static: it consumes nothing from the
/// parameter sequence and dispatches to the inner gate with the frozen value.
#[derive(Debug, Clone)]
pub struct FrozenGate<B, C> {
    inner: Box<crate::gate::Gate<B, C>>,
    parameter: f64,
}

impl<B, C> FrozenGate<B, C> {
    /// Bind `parameter` to `gate`.
    pub fn new(gate: crate::gate::Gate<B, C>, parameter: f64) -> Self {
        Self { inner: Box::new(gate), parameter }
    }

    /// The wrapped gate.
    pub fn inner(&self) -> &crate::gate::Gate<B, C> {
        &self.inner
    }

    /// The bound parameter.
    pub fn parameter(&self) -> f64 {
        self.parameter
    }
}
