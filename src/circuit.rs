/*!
Circuits as ordered gate sequences.

A [Circuit] is the finite, ordered sequence of gates the propagation driver
walks (in reverse, in the Heisenberg picture). The builder methods cover the
registered Clifford vocabulary, the common rotations, and the noise channels;
anything else is pushed as a constructed [Gate].
*/

use std::sync::Arc;

use crate::{
    coefficient::Coefficient,
    gate::{
        AmplitudeDamping, CliffordGate, FrozenGate, Gate, NoiseKind, PauliNoise, PauliRotation,
        UnsupportedGate, UserGate,
    },
    pauli::{code::PauliCode, Pauli},
};

/// An ordered sequence of gates.
#[derive(Debug, Clone, Default)]
pub struct Circuit<B, C = f64> {
    gates: Vec<Gate<B, C>>,
}

macro_rules! single_cliffords {
    ($(($name:ident, $symbol:literal),)*) => {$(
        /// Append the
        #[doc = $symbol]
        /// gate on `site`.
        pub fn $name(&mut self, site: usize) -> &mut Self {
            self.push(Gate::Clifford(builtin($symbol, vec![site])))
        }
    )*};
}

macro_rules! double_cliffords {
    ($(($name:ident, $symbol:literal),)*) => {$(
        /// Append the
        #[doc = $symbol]
        /// gate on the pair `(a, b)`.
        ///
        /// # Panics
        /// If `a == b`.
        pub fn $name(&mut self, a: usize, b: usize) -> &mut Self {
            self.push(Gate::Clifford(builtin($symbol, vec![a, b])))
        }
    )*};
}

macro_rules! single_rotations {
    ($(($name:ident, $pauli:ident),)*) => {$(
        /// Append a rotation about
        #[doc = stringify!($pauli)]
        /// on `site`.
        pub fn $name(&mut self, site: usize) -> &mut Self {
            match PauliRotation::new(vec![Pauli::$pauli], vec![site]) {
                Ok(rotation) => self.push(Gate::Rotation(rotation)),
                Err(_) => unreachable!("single-site generators are valid"),
            }
        }
    )*};
}

impl<B: PauliCode, C: Coefficient> Circuit<B, C> {
    /// An empty circuit.
    pub fn new() -> Self {
        Self { gates: Vec::new() }
    }

    /// The gates, in application order.
    pub fn gates(&self) -> &[Gate<B, C>] {
        &self.gates
    }

    /// The number of gates.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether the circuit has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// The number of gates that consume a parameter.
    pub fn num_parametrized(&self) -> usize {
        self.gates.iter().filter(|gate| gate.is_parametrized()).count()
    }

    /// Append a gate.
    pub fn push(&mut self, gate: Gate<B, C>) -> &mut Self {
        self.gates.push(gate);
        self
    }

    /// Append a registered Clifford gate by symbol.
    pub fn clifford(&mut self, symbol: &str, sites: Vec<usize>) -> Result<&mut Self, UnsupportedGate> {
        let gate = CliffordGate::new(symbol, sites)?;
        Ok(self.push(Gate::Clifford(gate)))
    }

    single_cliffords!(
        (h, "H"),
        (x, "X"),
        (y, "Y"),
        (z, "Z"),
        (s, "S"),
        (sx, "SX"),
        (sy, "SY"),
    );

    double_cliffords!(
        (cnot, "CNOT"),
        (cz, "CZ"),
        (swap, "SWAP"),
        (zz_pihalf, "ZZpihalf"),
    );

    single_rotations!((rx, X), (ry, Y), (rz, Z),);

    /// Append a rotation about the two-site ZZ generator.
    ///
    /// # Panics
    /// If `a == b`.
    pub fn rzz(&mut self, a: usize, b: usize) -> &mut Self {
        let rotation = PauliRotation::new(vec![Pauli::Z, Pauli::Z], vec![a, b])
            .unwrap_or_else(|e| panic!("{e}"));
        self.push(Gate::Rotation(rotation))
    }

    /// Append a rotation about an arbitrary Pauli-string generator.
    pub fn rotation(
        &mut self,
        paulis: Vec<Pauli>,
        sites: Vec<usize>,
    ) -> Result<&mut Self, UnsupportedGate> {
        let rotation = PauliRotation::new(paulis, sites)?;
        Ok(self.push(Gate::Rotation(rotation)))
    }

    /// Append a parametrized gate with its parameter bound now.
    pub fn frozen(&mut self, gate: Gate<B, C>, parameter: f64) -> &mut Self {
        self.push(Gate::Frozen(FrozenGate::new(gate, parameter)))
    }

    /// Append a Pauli noise channel.
    pub fn pauli_noise(
        &mut self,
        site: usize,
        strength: f64,
        kind: NoiseKind,
    ) -> Result<&mut Self, UnsupportedGate> {
        let noise = PauliNoise::new(site, strength, kind)?;
        Ok(self.push(Gate::Noise(noise)))
    }

    /// Append an amplitude damping channel.
    pub fn amplitude_damping(
        &mut self,
        site: usize,
        gamma: f64,
    ) -> Result<&mut Self, UnsupportedGate> {
        let damping = AmplitudeDamping::new(site, gamma)?;
        Ok(self.push(Gate::Damping(damping)))
    }

    /// Append a user-defined gate.
    pub fn custom(&mut self, gate: Arc<dyn UserGate<B, C>>) -> &mut Self {
        self.push(Gate::Custom(gate))
    }
}

impl<B: PauliCode, C: Coefficient> FromIterator<Gate<B, C>> for Circuit<B, C> {
    fn from_iter<I: IntoIterator<Item = Gate<B, C>>>(iter: I) -> Self {
        Self { gates: iter.into_iter().collect() }
    }
}

fn builtin(symbol: &str, sites: Vec<usize>) -> CliffordGate {
    CliffordGate::new(symbol, sites).unwrap_or_else(|e| panic!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let mut circuit = Circuit::<u64, f64>::new();
        circuit.h(0).cnot(0, 1).rz(1).rzz(1, 2);
        assert_eq!(circuit.len(), 4);
        assert_eq!(circuit.num_parametrized(), 2);
        assert!(!circuit.is_empty());
    }

    #[test]
    fn frozen_gates_are_static() {
        let mut circuit = Circuit::<u64, f64>::new();
        let rotation = {
            let mut inner = Circuit::<u64, f64>::new();
            inner.rx(0);
            inner.gates()[0].clone()
        };
        circuit.frozen(rotation, 0.5).rx(0);
        assert_eq!(circuit.num_parametrized(), 1);
    }
}
