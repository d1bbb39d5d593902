/*!
The gate taxonomy.

[Gate] is a closed sum type over the gate behaviors the propagation pipeline
knows: Clifford permutations, Pauli rotations, frozen parametrized gates, Pauli
noise, amplitude damping and user-defined gates. Dispatch over the variants is
O(1); user gates plug in through the [UserGate] term-level contract without
touching the pipeline.
*/

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use thiserror::Error;
use tinyvec::TinyVec;

use crate::{
    coefficient::Coefficient,
    pauli::code::PauliCode,
};


pub mod clifford;
pub mod noise;
pub mod rotation;

pub use clifford::{CliffordGate, CliffordMap};
pub use noise::{AmplitudeDamping, NoiseKind, PauliNoise};
pub use rotation::{FrozenGate, PauliRotation};

/// The error when a gate cannot be constructed or applied in the requested
/// mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
#[error("unsupported gate: {0}")]
pub struct UnsupportedGate(pub String);

/// The successor terms produced by conjugating one term through one gate.
///
/// The built-in gates produce at most two successors, which stay inline; user
/// gates may return any arity.
pub type Branches<B, C> = TinyVec<[(B, C); 2]>;

/// The term-level contract of a user-defined gate.
///
/// Implementing [apply](Self::apply) is sufficient to plug into the pipeline:
/// the backends loop over the terms of the sum, feed each through `apply` and
/// merge the successors. Gates that split more aggressively or want to avoid
/// the generic loop can be expressed as several gates, or pre-freeze their
/// parameters.
pub trait UserGate<B: PauliCode, C: Coefficient>: Debug + Send + Sync {
    /// A short name, used in logs and error messages.
    fn name(&self) -> &str;

    /// The sites the gate acts on (used for the shape check at the driver
    /// boundary).
    fn sites(&self) -> &[usize];

    /// Whether the gate consumes one value from the parameter sequence.
    fn is_parametrized(&self) -> bool {
        false
    }

    /// Whether the gate may map distinct strings to equal ones, requiring a
    /// merge after application.
    fn requires_merging(&self) -> bool {
        true
    }

    /// Conjugate one term, returning its successors.
    ///
    /// `parameter` is [Some] iff [is_parametrized](Self::is_parametrized).
    fn apply(&self, code: &B, coeff: C, parameter: Option<f64>) -> Branches<B, C>;

    /// The transposed gate, for Schrödinger-picture propagation. [None] means
    /// the gate does not support transposition and the driver errors.
    fn transposed(&self) -> Option<Arc<dyn UserGate<B, C>>> {
        None
    }
}

/// A gate of the propagation pipeline.
#[derive(Debug, Clone)]
pub enum Gate<B, C> {
    /// A named permutation-with-sign map from the Clifford registry.
    Clifford(CliffordGate),
    /// A parametrized rotation about a Pauli-string generator.
    Rotation(PauliRotation),
    /// A parametrized gate with its parameter bound at construction.
    Frozen(FrozenGate<B, C>),
    /// Single-site Pauli noise (diagonal).
    Noise(PauliNoise),
    /// Single-site amplitude damping.
    Damping(AmplitudeDamping),
    /// A user-defined gate.
    Custom(Arc<dyn UserGate<B, C>>),
}

impl<B: PauliCode, C: Coefficient> Gate<B, C> {
    /// Whether the gate consumes one value from the parameter sequence.
    pub fn is_parametrized(&self) -> bool {
        match self {
            Gate::Rotation(_) => true,
            Gate::Custom(gate) => gate.is_parametrized(),
            _ => false,
        }
    }

    /// Whether the driver must merge after applying this gate.
    ///
    /// Clifford and Pauli-noise kernels never create duplicate keys, so they
    /// skip the pass.
    pub fn requires_merging(&self) -> bool {
        match self {
            Gate::Clifford(_) | Gate::Noise(_) => false,
            Gate::Rotation(_) | Gate::Damping(_) => true,
            Gate::Frozen(frozen) => frozen.inner().requires_merging(),
            Gate::Custom(gate) => gate.requires_merging(),
        }
    }

    /// The largest site the gate touches.
    pub fn max_site(&self) -> usize {
        fn of(sites: &[usize]) -> usize {
            sites.iter().copied().max().unwrap_or(0)
        }
        match self {
            Gate::Clifford(gate) => of(gate.sites()),
            Gate::Rotation(gate) => of(gate.sites()),
            Gate::Frozen(frozen) => frozen.inner().max_site(),
            Gate::Noise(gate) => gate.site(),
            Gate::Damping(gate) => gate.site(),
            Gate::Custom(gate) => of(gate.sites()),
        }
    }

    /// The transposed gate for Schrödinger-picture propagation.
    ///
    /// Cliffords look up (and lazily register) their transposed table;
    /// rotations transpose by angle negation, which the driver applies to the
    /// parameter, so the gate itself is unchanged. The noise channels act the
    /// same in both directions here.
    pub fn transposed(&self) -> Result<Self, UnsupportedGate> {
        match self {
            Gate::Clifford(gate) => Ok(Gate::Clifford(gate.transposed())),
            Gate::Rotation(gate) => Ok(Gate::Rotation(gate.clone())),
            Gate::Frozen(frozen) => {
                let inner = frozen.inner().transposed()?;
                let parameter = if frozen.inner().negates_on_transpose() {
                    -frozen.parameter()
                } else {
                    frozen.parameter()
                };
                Ok(Gate::Frozen(FrozenGate::new(inner, parameter)))
            },
            Gate::Noise(gate) => Ok(Gate::Noise(gate.clone())),
            Gate::Damping(gate) => Ok(Gate::Damping(gate.clone())),
            Gate::Custom(gate) => match gate.transposed() {
                Some(transposed) => Ok(Gate::Custom(transposed)),
                None => Err(UnsupportedGate(format!(
                    "{} has no transpose for Schrödinger-picture propagation",
                    gate.name()
                ))),
            },
        }
    }

    /// Whether transposition negates the gate's parameter.
    pub fn negates_on_transpose(&self) -> bool {
        matches!(self, Gate::Rotation(_))
    }

    /// Conjugate a single term through the gate.
    ///
    /// This is the pure term-level layer: the backends use specialized
    /// sum-level kernels for the built-in gates, but the semantics are defined
    /// here and the generic path feeds user gates through it.
    ///
    /// # Panics
    /// If the gate is parametrized and `parameter` is [None]; the driver
    /// checks the parameter count upfront.
    pub fn apply_to_term(&self, code: &B, coeff: C, parameter: Option<f64>) -> Branches<B, C> {
        let mut branches = Branches::default();
        match self {
            Gate::Clifford(gate) => {
                let mut image = code.clone();
                let sign = gate.conjugate(&mut image);
                let mut coeff = coeff;
                coeff.scale(sign);
                branches.push((image, coeff));
            },
            Gate::Rotation(gate) => {
                let theta = match parameter {
                    Some(theta) => theta,
                    None => unreachable!("the driver assigns every rotation a parameter"),
                };
                let generator: B = gate.generator();
                if generator.commutes_with(code) {
                    branches.push((code.clone(), coeff));
                } else {
                    let (sign, product) = PauliRotation::branch(&generator, code);
                    branches.push((product, coeff.branch_sin(theta, sign)));
                    let mut kept = coeff;
                    kept.apply_cos(theta);
                    branches.push((code.clone(), kept));
                }
            },
            Gate::Frozen(frozen) => {
                return frozen.inner().apply_to_term(code, coeff, Some(frozen.parameter()));
            },
            Gate::Noise(gate) => {
                let mut coeff = coeff;
                coeff.scale(gate.factor(code.get(gate.site())));
                branches.push((code.clone(), coeff));
            },
            Gate::Damping(gate) => match gate.diagonal_factor(code.get(gate.site())) {
                Some(factor) => {
                    let mut coeff = coeff;
                    coeff.scale(factor);
                    branches.push((code.clone(), coeff));
                },
                None => {
                    let (kept_factor, fed_factor) = gate.branch_factors();
                    let mut fed = coeff.clone();
                    fed.scale(fed_factor);
                    let mut identity = code.clone();
                    identity.set(gate.site(), crate::pauli::Pauli::I);
                    branches.push((identity, fed));
                    let mut kept = coeff;
                    kept.scale(kept_factor);
                    branches.push((code.clone(), kept));
                },
            },
            Gate::Custom(gate) => return gate.apply(code, coeff, parameter),
        }
        branches
    }
}

impl<B: PauliCode, C: Coefficient> Display for Gate<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Clifford(gate) => write!(f, "{}{:?}", gate.symbol(), gate.sites()),
            Gate::Rotation(gate) => {
                write!(f, "R[")?;
                for pauli in gate.paulis() {
                    write!(f, "{pauli}")?;
                }
                write!(f, "]{:?}", gate.sites())
            },
            Gate::Frozen(frozen) => {
                write!(f, "{}(θ={})", frozen.inner(), frozen.parameter())
            },
            Gate::Noise(gate) => write!(f, "noise[{}]", gate.site()),
            Gate::Damping(gate) => write!(f, "damping[{}]", gate.site()),
            Gate::Custom(gate) => write!(f, "{}", gate.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;

    fn single(pauli: Pauli) -> u8 {
        let mut code = 0u8;
        code.set(0, pauli);
        code
    }

    #[test]
    fn clifford_term_application() {
        let gate: Gate<u8, f64> =
            Gate::Clifford(CliffordGate::new("S", vec![0]).unwrap());
        let branches = gate.apply_to_term(&single(Pauli::X), 2.0, None);
        assert_eq!(&branches[..], &[(single(Pauli::Y), -2.0)]);
        assert!(!gate.requires_merging());
        assert!(!gate.is_parametrized());
    }

    #[test]
    fn rotation_term_application() {
        let gate: Gate<u8, f64> =
            Gate::Rotation(PauliRotation::new(vec![Pauli::Z], vec![0]).unwrap());
        assert!(gate.is_parametrized());

        let theta = 0.7;
        let branches = gate.apply_to_term(&single(Pauli::Z), 1.0, Some(theta));
        assert_eq!(&branches[..], &[(single(Pauli::Z), 1.0)]);

        let branches = gate.apply_to_term(&single(Pauli::X), 1.0, Some(theta));
        assert_eq!(branches.len(), 2);
        let cos_sq_plus_sin_sq: f64 =
            branches.iter().map(|(_, coeff)| coeff * coeff).sum();
        assert!((cos_sq_plus_sin_sq - 1.0).abs() < 1e-12);
    }

    #[test]
    fn frozen_needs_no_parameter() {
        let rotation: Gate<u8, f64> =
            Gate::Rotation(PauliRotation::new(vec![Pauli::Z], vec![0]).unwrap());
        let frozen = Gate::Frozen(FrozenGate::new(rotation, 0.3));
        assert!(!frozen.is_parametrized());
        let branches = frozen.apply_to_term(&single(Pauli::X), 1.0, None);
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn damping_term_application() {
        let gate: Gate<u8, f64> =
            Gate::Damping(AmplitudeDamping::new(0, 0.5).unwrap());
        let branches = gate.apply_to_term(&single(Pauli::Z), 1.0, None);
        assert_eq!(
            &branches[..],
            &[(single(Pauli::I), 0.5), (single(Pauli::Z), 0.5)]
        );
        let branches = gate.apply_to_term(&single(Pauli::I), 1.0, None);
        assert_eq!(&branches[..], &[(single(Pauli::I), 1.0)]);
    }

    #[test]
    fn transposed_clifford_inverts() {
        let gate: Gate<u8, f64> =
            Gate::Clifford(CliffordGate::new("S", vec![0]).unwrap());
        let transposed = gate.transposed().unwrap();
        for pauli in [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z] {
            let forward = gate.apply_to_term(&single(pauli), 1.0, None);
            let (image, sign) = (forward[0].0, forward[0].1);
            let back = transposed.apply_to_term(&image, sign, None);
            assert_eq!(&back[..], &[(single(pauli), 1.0)]);
        }
    }
}
