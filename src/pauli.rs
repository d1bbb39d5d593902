/*!
Single-site Pauli operators and phases.

A site Pauli is encoded into two bits as I=0, X=1, Y=2, Z=3. Products of Paulis
are Paulis again, up to a phase which is always a power of the imaginary unit;
[Phase] captures that power. The packed multi-site representations build on this
encoding, cf. [code](crate::pauli::code) and [string](crate::pauli::string).
*/

use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single-site Pauli operator.
///
/// The discriminants are the two-bit codes used throughout the packed
/// representations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Pauli {
    /// The identity.
    #[default]
    I = 0,
    /// The Pauli X operator.
    X = 1,
    /// The Pauli Y operator.
    Y = 2,
    /// The Pauli Z operator.
    Z = 3,
}

/// The error when a two-bit code or a symbol does not describe a Pauli.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
#[error("{0} is not a Pauli code (must be 0, 1, 2 or 3)")]
pub struct InvalidPauli(pub u8);

impl Pauli {
    /// The two-bit code of this Pauli.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this Pauli is not the identity.
    #[inline]
    pub fn is_support(self) -> bool {
        self != Pauli::I
    }

    /// Multiply two site Paulis, returning the phase and the resulting Pauli.
    ///
    /// The resulting code is the XOR of the input codes; the phase is a power of
    /// the imaginary unit, e.g., `X * Y = i Z`.
    ///
    /// # Examples
    /// ```
    /// # use pauli_propagation::pauli::{Pauli, Phase};
    /// assert_eq!(Pauli::X.product(Pauli::Y), (Phase::PLUS_I, Pauli::Z));
    /// assert_eq!(Pauli::Y.product(Pauli::X), (Phase::MINUS_I, Pauli::Z));
    /// assert_eq!(Pauli::Z.product(Pauli::Z), (Phase::ONE, Pauli::I));
    /// ```
    pub fn product(self, other: Self) -> (Phase, Self) {
        let exponent = PHASE_EXPONENTS[self as usize][other as usize];
        let code = self.code() ^ other.code();
        // the XOR of two valid codes is a valid code
        match Pauli::try_from(code) {
            Ok(pauli) => (Phase::new(exponent), pauli),
            Err(_) => unreachable!("xor of two-bit codes is a two-bit code"),
        }
    }

    /// Whether the two site Paulis commute (they do iff one is the identity or
    /// both are equal).
    #[inline]
    pub fn commutes_with(self, other: Self) -> bool {
        self == Pauli::I || other == Pauli::I || self == other
    }
}

/// Per-site phase exponents of `a * b = i^e (a xor b)`, indexed `[a][b]`.
const PHASE_EXPONENTS: [[u8; 4]; 4] = [
    [0, 0, 0, 0],
    [0, 0, 1, 3],
    [0, 3, 0, 1],
    [0, 1, 3, 0],
];

impl TryFrom<u8> for Pauli {
    type Error = InvalidPauli;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pauli::I),
            1 => Ok(Pauli::X),
            2 => Ok(Pauli::Y),
            3 => Ok(Pauli::Z),
            _ => Err(InvalidPauli(value)),
        }
    }
}

impl From<Pauli> for u8 {
    fn from(value: Pauli) -> u8 {
        value.code()
    }
}

impl Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pauli::I => write!(f, "I"),
            Pauli::X => write!(f, "X"),
            Pauli::Y => write!(f, "Y"),
            Pauli::Z => write!(f, "Z"),
        }
    }
}

impl FromStr for Pauli {
    type Err = InvalidPauli;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(Pauli::I),
            "X" => Ok(Pauli::X),
            "Y" => Ok(Pauli::Y),
            "Z" => Ok(Pauli::Z),
            _ => Err(InvalidPauli(u8::MAX)),
        }
    }
}

/// A power of the imaginary unit, `i^exponent` with `exponent < 4`.
///
/// Pauli-string products pick up phases from this group; rotation kernels reduce
/// them to real signs via [times_i](Phase::times_i) and [real](Phase::real).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase {
    exponent: u8,
}

impl Phase {
    /// The phase `+1`.
    pub const ONE: Self = Self { exponent: 0 };
    /// The phase `+i`.
    pub const PLUS_I: Self = Self { exponent: 1 };
    /// The phase `-1`.
    pub const MINUS_ONE: Self = Self { exponent: 2 };
    /// The phase `-i`.
    pub const MINUS_I: Self = Self { exponent: 3 };

    /// Create a phase from an exponent of the imaginary unit (taken mod 4).
    #[inline]
    pub fn new(exponent: u8) -> Self {
        Self { exponent: exponent & 3 }
    }

    /// The exponent, in `0..4`.
    #[inline]
    pub fn exponent(self) -> u8 {
        self.exponent
    }

    /// The product of two phases.
    #[inline]
    pub fn times(self, other: Self) -> Self {
        Self::new(self.exponent + other.exponent)
    }

    /// This phase multiplied by the imaginary unit.
    #[inline]
    pub fn times_i(self) -> Self {
        Self::new(self.exponent + 1)
    }

    /// The complex conjugate, `i^(-exponent)`.
    #[inline]
    pub fn conj(self) -> Self {
        Self::new(4 - self.exponent)
    }

    /// Whether the phase is `+1` or `-1`.
    #[inline]
    pub fn is_real(self) -> bool {
        self.exponent & 1 == 0
    }

    /// The real part: `1.0`, `0.0` or `-1.0`.
    #[inline]
    pub fn real(self) -> f64 {
        match self.exponent {
            0 => 1.0,
            2 => -1.0,
            _ => 0.0,
        }
    }

    /// The phase as a complex number.
    pub fn to_complex(self) -> num_complex::Complex64 {
        match self.exponent {
            0 => num_complex::Complex64::new(1.0, 0.0),
            1 => num_complex::Complex64::new(0.0, 1.0),
            2 => num_complex::Complex64::new(-1.0, 0.0),
            _ => num_complex::Complex64::new(0.0, -1.0),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exponent {
            0 => write!(f, "+1"),
            1 => write!(f, "+i"),
            2 => write!(f, "-1"),
            _ => write!(f, "-i"),
        }
    }
}

pub mod code;
pub mod string;

#[doc(inline)]
pub use code::PauliCode;
#[doc(inline)]
pub use string::PauliString;

#[cfg(test)]
mod tests {
    use super::*;

    // the full single-site multiplication table, checked against the matrix
    // products of I, X, Y, Z
    #[test]
    fn products() {
        use Pauli::{I, X, Y, Z};
        let expected = [
            ((I, I), (Phase::ONE, I)),
            ((I, X), (Phase::ONE, X)),
            ((I, Y), (Phase::ONE, Y)),
            ((I, Z), (Phase::ONE, Z)),
            ((X, I), (Phase::ONE, X)),
            ((X, X), (Phase::ONE, I)),
            ((X, Y), (Phase::PLUS_I, Z)),
            ((X, Z), (Phase::MINUS_I, Y)),
            ((Y, I), (Phase::ONE, Y)),
            ((Y, X), (Phase::MINUS_I, Z)),
            ((Y, Y), (Phase::ONE, I)),
            ((Y, Z), (Phase::PLUS_I, X)),
            ((Z, I), (Phase::ONE, Z)),
            ((Z, X), (Phase::PLUS_I, Y)),
            ((Z, Y), (Phase::MINUS_I, X)),
            ((Z, Z), (Phase::ONE, I)),
        ];
        for ((a, b), result) in expected {
            assert_eq!(a.product(b), result, "{a} * {b}");
        }
    }

    #[test]
    fn product_antisymmetry() {
        use Pauli::{I, X, Y, Z};
        for a in [I, X, Y, Z] {
            for b in [I, X, Y, Z] {
                let (ab, _) = a.product(b);
                let (ba, _) = b.product(a);
                if a.commutes_with(b) {
                    assert_eq!(ab, ba);
                } else {
                    assert_eq!(ab, ba.times(Phase::MINUS_ONE));
                }
            }
        }
    }

    #[test]
    fn phase_arithmetic() {
        assert_eq!(Phase::PLUS_I.times(Phase::PLUS_I), Phase::MINUS_ONE);
        assert_eq!(Phase::MINUS_I.times_i(), Phase::ONE);
        assert_eq!(Phase::MINUS_I.conj(), Phase::PLUS_I);
        assert_eq!(Phase::MINUS_ONE.real(), -1.0);
        assert_eq!(Phase::PLUS_I.real(), 0.0);
        assert!(!Phase::PLUS_I.is_real());
    }

    #[test]
    fn codes_roundtrip() {
        for code in 0..4u8 {
            assert_eq!(Pauli::try_from(code).unwrap().code(), code);
        }
        assert_eq!(Pauli::try_from(4), Err(InvalidPauli(4)));
    }
}
