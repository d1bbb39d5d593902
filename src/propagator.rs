/*!
The apply/merge/truncate propagation pipeline.

The driver walks a circuit (reversed, in the Heisenberg picture), dispatches
each gate to a backend kernel, merges duplicate keys where the gate may have
created them, and truncates terms failing the configured thresholds. The
[Propagator] trait is the seam between the driver and the two cache shapes:
[KeyedPropagator](keyed::KeyedPropagator) over the hash-keyed sum and
[DensePropagator](dense::DensePropagator) over the vector-backed sum with
data-parallel kernels.

Both backends hold a `main` and an `aux` sum of identical shape; `main` is fully
consistent before and after every gate, never during.
*/

use std::fmt;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::{
    circuit::Circuit,
    coefficient::Coefficient,
    gate::{
        AmplitudeDamping, CliffordGate, Gate, PauliNoise, PauliRotation, UnsupportedGate, UserGate,
    },
    pauli::{
        code::PauliCode,
        string::{OutOfRange, ShapeMismatch},
    },
    sum::{zero_coeff, CapacityExhausted, TermSum},
};

pub mod dense;
pub mod keyed;

pub use dense::DensePropagator;
pub use keyed::KeyedPropagator;

/// The errors surfaced at the driver boundary.
#[derive(Debug, Clone, Error)]
pub enum PropagationError {
    /// Sum and gate disagree on the qubit count.
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
    /// The number of parameters does not match the number of parametrized
    /// gates (a shape mismatch of the parameter sequence).
    #[error("the circuit has {expected} parametrized gates but {got} parameters were supplied")]
    ParameterCount {
        /// Parametrized gates in the circuit.
        expected: usize,
        /// Supplied parameters.
        got: usize,
    },
    /// A site index or Pauli code outside its range.
    #[error(transparent)]
    OutOfRangePauli(#[from] OutOfRange),
    /// A gate that cannot be applied in the requested mode.
    #[error(transparent)]
    UnsupportedGate(#[from] UnsupportedGate),
    /// A path-based threshold was requested with plain numeric coefficients.
    ///
    /// Wrap the sum first, cf.
    /// [PauliSum::wrap_paths](crate::sum::PauliSum::wrap_paths); thresholds are
    /// never silently dropped and coefficients are never silently wrapped.
    #[error("max_freq/max_sins need path-properties coefficients; wrap the sum first")]
    IncompatibleCoefficient,
    /// The dense buffers failed to grow.
    #[error(transparent)]
    CapacityExhausted(#[from] CapacityExhausted),
}

/// The propagation direction convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Picture {
    /// Walk the reversed circuit, conjugating the observable backwards. The
    /// default.
    #[default]
    Heisenberg,
    /// Walk the circuit in order with every gate transposed (rotation angles
    /// negated, Clifford tables transposed). Noise channels are applied
    /// unchanged in both pictures.
    Schroedinger,
}

/// The truncation thresholds of the pipeline.
///
/// Every predicate that is not configured defaults to "keep"; a term is
/// discarded as soon as one configured predicate fires. Truncation is silent
/// removal, never an error.
#[derive(Clone)]
pub struct Truncation<B, C> {
    /// Discard terms with a coefficient magnitude below this bound.
    pub min_abs_coeff: f64,
    /// Discard terms with Pauli weight above this bound.
    pub max_weight: Option<usize>,
    /// Discard paths with more than this many angle factors (requires
    /// path-properties coefficients).
    pub max_freq: Option<u32>,
    /// Discard paths with more than this many sine factors (requires
    /// path-properties coefficients).
    pub max_sins: Option<u32>,
    /// A user predicate; `true` discards the term.
    pub custom: Option<Arc<dyn Fn(&B, &C) -> bool + Send + Sync>>,
}

impl<B, C> Default for Truncation<B, C> {
    fn default() -> Self {
        Self {
            min_abs_coeff: f64::EPSILON,
            max_weight: None,
            max_freq: None,
            max_sins: None,
            custom: None,
        }
    }
}

impl<B, C> fmt::Debug for Truncation<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Truncation")
            .field("min_abs_coeff", &self.min_abs_coeff)
            .field("max_weight", &self.max_weight)
            .field("max_freq", &self.max_freq)
            .field("max_sins", &self.max_sins)
            .field("custom", &self.custom.as_ref().map(|_| ".."))
            .finish()
    }
}

impl<B: PauliCode, C: Coefficient> Truncation<B, C> {
    /// No truncation at all, `min_abs_coeff = 0`; mainly for exactness tests.
    pub fn none() -> Self {
        Self { min_abs_coeff: 0.0, ..Self::default() }
    }

    /// Set the coefficient-magnitude bound.
    pub fn min_abs_coeff(mut self, bound: f64) -> Self {
        self.min_abs_coeff = bound;
        self
    }

    /// Set the Pauli-weight bound.
    pub fn max_weight(mut self, bound: usize) -> Self {
        self.max_weight = Some(bound);
        self
    }

    /// Set the path-frequency bound.
    pub fn max_freq(mut self, bound: u32) -> Self {
        self.max_freq = Some(bound);
        self
    }

    /// Set the sine-count bound.
    pub fn max_sins(mut self, bound: u32) -> Self {
        self.max_sins = Some(bound);
        self
    }

    /// Set a custom predicate; `true` discards the term.
    pub fn custom(mut self, predicate: impl Fn(&B, &C) -> bool + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(predicate));
        self
    }

    /// Whether the configured thresholds need path-properties coefficients.
    pub fn requires_paths(&self) -> bool {
        self.max_freq.is_some() || self.max_sins.is_some()
    }

    /// Whether a term is discarded.
    pub fn discards(&self, code: &B, coeff: &C) -> bool {
        if let Some(bound) = self.max_weight {
            if code.weight() > bound {
                return true;
            }
        }
        if coeff.magnitude() < self.min_abs_coeff {
            return true;
        }
        if let Some(bound) = self.max_sins {
            if coeff.nsins().is_some_and(|count| count > bound) {
                return true;
            }
        }
        if let Some(bound) = self.max_freq {
            if coeff.freq().is_some_and(|count| count > bound) {
                return true;
            }
        }
        if let Some(predicate) = &self.custom {
            if predicate(code, coeff) {
                return true;
            }
        }
        false
    }
}

/// The full propagation configuration: thresholds plus direction.
#[derive(Debug, Clone, Default)]
pub struct Options<B, C> {
    /// The truncation thresholds.
    pub truncation: Truncation<B, C>,
    /// The direction convention.
    pub picture: Picture,
}

impl<B: PauliCode, C: Coefficient> Options<B, C> {
    /// Heisenberg propagation with the given thresholds.
    pub fn new(truncation: Truncation<B, C>) -> Self {
        Self { truncation, picture: Picture::Heisenberg }
    }

    /// Change the direction convention.
    pub fn picture(mut self, picture: Picture) -> Self {
        self.picture = picture;
        self
    }
}

/// The backend seam of the pipeline: a main/aux cache with one kernel per gate
/// kind, plus merge and truncate.
///
/// The driver guarantees that every gate passed down acts within
/// `[0, nsites)`; kernels do not re-check and do not swallow errors.
pub trait Propagator<B: PauliCode, C: Coefficient> {
    /// The sum shape this backend operates on.
    type Sum: TermSum<B, C>;

    /// Wrap a sum into a fresh cache (empty aux of the same shape).
    fn from_sum(sum: Self::Sum) -> Self;

    /// Unwrap the live sum.
    fn into_sum(self) -> Self::Sum;

    /// The number of sites.
    fn nsites(&self) -> usize;

    /// The number of live terms.
    fn len(&self) -> usize;

    /// Whether no terms are live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Conjugate every term through a Clifford gate. Never creates duplicate
    /// keys.
    fn apply_clifford(&mut self, gate: &CliffordGate) -> Result<(), PropagationError>;

    /// Conjugate every term through a rotation, splitting the anticommuting
    /// ones.
    fn apply_rotation(&mut self, gate: &PauliRotation, theta: f64)
        -> Result<(), PropagationError>;

    /// Damp coefficients under single-site Pauli noise (diagonal).
    fn apply_pauli_noise(&mut self, gate: &PauliNoise) -> Result<(), PropagationError>;

    /// Apply amplitude damping; Z terms feed the identity.
    fn apply_damping(&mut self, gate: &AmplitudeDamping) -> Result<(), PropagationError>;

    /// Feed every term through a user gate's term-level contract.
    fn apply_custom(
        &mut self,
        gate: &dyn UserGate<B, C>,
        parameter: Option<f64>,
    ) -> Result<(), PropagationError>;

    /// Consolidate duplicate keys, summing their coefficients.
    fn merge(&mut self) -> Result<(), PropagationError>;

    /// Remove all terms failing the configured thresholds.
    fn truncate(&mut self, truncation: &Truncation<B, C>) -> Result<(), PropagationError>;
}

/// The sums that know their propagation backend.
pub trait Propagatable<B: PauliCode, C: Coefficient>: TermSum<B, C> {
    /// The backend operating on this shape.
    type Backend: Propagator<B, C, Sum = Self>;
}

/// Propagate `sum` through `circuit`, leaving the input untouched.
///
/// In the (default) Heisenberg picture the circuit and the parameter order are
/// reversed internally; `parameters` is always supplied in circuit order, one
/// value per parametrized gate.
pub fn propagate<B, C, S>(
    circuit: &Circuit<B, C>,
    sum: &S,
    parameters: &[f64],
    options: &Options<B, C>,
) -> Result<S, PropagationError>
where
    B: PauliCode,
    C: Coefficient,
    S: Propagatable<B, C>,
{
    propagate_in_place(circuit, sum.clone(), parameters, options)
}

/// Propagate consuming the input sum; the returned sum reuses its storage.
pub fn propagate_in_place<B, C, S>(
    circuit: &Circuit<B, C>,
    sum: S,
    parameters: &[f64],
    options: &Options<B, C>,
) -> Result<S, PropagationError>
where
    B: PauliCode,
    C: Coefficient,
    S: Propagatable<B, C>,
{
    let expected = circuit.num_parametrized();
    if parameters.len() != expected {
        return Err(PropagationError::ParameterCount { expected, got: parameters.len() });
    }
    if options.truncation.requires_paths() && zero_coeff::<C>().freq().is_none() {
        return Err(PropagationError::IncompatibleCoefficient);
    }
    let nsites = sum.nsites();
    for gate in circuit.gates() {
        if gate.max_site() >= nsites {
            return Err(ShapeMismatch { left: nsites, right: gate.max_site() + 1 }.into());
        }
    }

    // parameters in circuit order, one slot per gate
    let mut remaining = parameters.iter();
    let assigned: Vec<Option<f64>> = circuit
        .gates()
        .iter()
        .map(|gate| {
            if gate.is_parametrized() {
                remaining.next().copied()
            } else {
                None
            }
        })
        .collect();

    let mut backend = S::Backend::from_sum(sum);
    match options.picture {
        Picture::Heisenberg => {
            for (gate, parameter) in circuit.gates().iter().zip(assigned).rev() {
                step(&mut backend, gate, parameter, &options.truncation)?;
            }
        },
        Picture::Schroedinger => {
            for (gate, parameter) in circuit.gates().iter().zip(assigned) {
                let transposed = gate.transposed()?;
                let parameter = parameter
                    .map(|theta| if gate.negates_on_transpose() { -theta } else { theta });
                step(&mut backend, &transposed, parameter, &options.truncation)?;
            }
        },
    }
    Ok(backend.into_sum())
}

fn step<B, C, P>(
    backend: &mut P,
    gate: &Gate<B, C>,
    parameter: Option<f64>,
    truncation: &Truncation<B, C>,
) -> Result<(), PropagationError>
where
    B: PauliCode,
    C: Coefficient,
    P: Propagator<B, C>,
{
    dispatch(backend, gate, parameter)?;
    if gate.requires_merging() {
        backend.merge()?;
    }
    backend.truncate(truncation)?;
    debug!("applied {gate}, {} terms live", backend.len());
    Ok(())
}

fn dispatch<B, C, P>(
    backend: &mut P,
    gate: &Gate<B, C>,
    parameter: Option<f64>,
) -> Result<(), PropagationError>
where
    B: PauliCode,
    C: Coefficient,
    P: Propagator<B, C>,
{
    match gate {
        Gate::Clifford(gate) => backend.apply_clifford(gate),
        Gate::Rotation(gate) => {
            let theta = match parameter {
                Some(theta) => theta,
                None => unreachable!("parameters are assigned upfront"),
            };
            backend.apply_rotation(gate, theta)
        },
        Gate::Frozen(frozen) => dispatch(backend, frozen.inner(), Some(frozen.parameter())),
        Gate::Noise(gate) => backend.apply_pauli_noise(gate),
        Gate::Damping(gate) => backend.apply_damping(gate),
        Gate::Custom(gate) => backend.apply_custom(gate.as_ref(), parameter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pauli::Pauli, sum::PauliSum};

    #[test]
    fn parameter_count_is_checked() {
        let mut circuit = Circuit::<u64, f64>::new();
        circuit.rx(0).h(0).rz(0);
        let sum = PauliSum::<u64>::new(1);
        let options = Options::default();
        assert!(matches!(
            propagate(&circuit, &sum, &[0.1], &options),
            Err(PropagationError::ParameterCount { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn gate_shape_is_checked() {
        let mut circuit = Circuit::<u64, f64>::new();
        circuit.h(3);
        let sum = PauliSum::<u64>::new(2);
        assert!(matches!(
            propagate(&circuit, &sum, &[], &Options::default()),
            Err(PropagationError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn path_thresholds_need_path_coefficients() {
        let mut circuit = Circuit::<u64, f64>::new();
        circuit.rx(0);
        let sum = PauliSum::<u64>::new(1);
        let options = Options::new(Truncation::none().max_sins(3));
        assert!(matches!(
            propagate(&circuit, &sum, &[0.1], &options),
            Err(PropagationError::IncompatibleCoefficient)
        ));

        let wrapped = {
            let mut sum = PauliSum::<u64>::new(1);
            sum.add_pauli(Pauli::Z, 0, 1.0).unwrap();
            sum.wrap_paths()
        };
        let mut circuit = Circuit::new();
        circuit.rx(0);
        let options = Options::new(Truncation::none().max_sins(3));
        assert!(propagate(&circuit, &wrapped, &[0.1], &options).is_ok());
    }

    #[test]
    fn truncation_predicates() {
        let truncation: Truncation<u64, f64> =
            Truncation::none().max_weight(1).min_abs_coeff(0.25);
        let mut heavy = 0u64;
        heavy.set(0, Pauli::X);
        heavy.set(1, Pauli::Z);
        assert!(truncation.discards(&heavy, &1.0));
        let mut light = 0u64;
        light.set(0, Pauli::X);
        assert!(!truncation.discards(&light, &1.0));
        assert!(truncation.discards(&light, &0.1));

        let custom: Truncation<u64, f64> =
            Truncation::none().custom(|code: &u64, _| code.get(0) == Pauli::Y);
        let mut y = 0u64;
        y.set(0, Pauli::Y);
        assert!(custom.discards(&y, &1.0));
        assert!(!custom.discards(&light, &1.0));
    }
}
