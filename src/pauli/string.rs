/*!
Pauli strings with an explicit number of sites.

[PauliString] pairs a packed [PauliCode] carrier with the number of sites it acts
on and range-checks all site access. It is the user-facing single-term type; the
sums in [sum](crate::sum) store the bare carriers as keys and keep the site count
on the container.
*/

use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{code::PauliCode, InvalidPauli, Pauli, Phase};

/// The error when a site index does not exist on a string or sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
#[error("site {site} is out of range for {nsites} sites")]
pub struct OutOfRange {
    /// The offending site index.
    pub site: usize,
    /// The number of sites of the object that was accessed.
    pub nsites: usize,
}

/// The error when two objects act on different numbers of sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
#[error("operands act on different numbers of sites: {left} vs {right}")]
pub struct ShapeMismatch {
    /// Sites of the left operand.
    pub left: usize,
    /// Sites of the right operand.
    pub right: usize,
}

/// A Pauli string on a fixed number of sites.
///
/// # Examples
/// ```
/// # use pauli_propagation::pauli::{Pauli, PauliString};
/// let string: PauliString<u8> = "IXY".parse().unwrap();
/// assert_eq!(string.get(1), Ok(Pauli::X));
/// assert_eq!(string.weight(), 2);
/// assert_eq!(string.to_string(), "IXY");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PauliString<B> {
    nsites: usize,
    code: B,
}

impl<B: PauliCode> PauliString<B> {
    /// The identity string on `nsites` sites.
    ///
    /// # Panics
    /// If `2 * nsites` bits do not fit into the carrier `B`.
    pub fn identity(nsites: usize) -> Self {
        if let Some(capacity) = B::SITES {
            assert!(
                nsites <= capacity,
                "{nsites} sites do not fit into the carrier ({capacity} sites)"
            );
        }
        Self { nsites, code: B::identity() }
    }

    /// A string with a single `pauli` at `site` and identities elsewhere.
    pub fn single(nsites: usize, pauli: Pauli, site: usize) -> Result<Self, OutOfRange> {
        let mut ret = Self::identity(nsites);
        ret.set(site, pauli)?;
        Ok(ret)
    }

    /// A string from one Pauli per site, site 0 first.
    pub fn from_paulis(paulis: &[Pauli]) -> Self {
        let mut ret = Self::identity(paulis.len());
        for (site, &pauli) in paulis.iter().enumerate() {
            ret.code.set(site, pauli);
        }
        ret
    }

    /// Wrap a raw carrier; bits at positions `>= 2 * nsites` must be zero.
    pub fn from_code(nsites: usize, code: B) -> Self {
        Self { nsites, code }
    }

    /// The number of sites.
    #[inline]
    pub fn nsites(&self) -> usize {
        self.nsites
    }

    /// The packed carrier.
    #[inline]
    pub fn code(&self) -> &B {
        &self.code
    }

    /// Unwrap into the packed carrier.
    pub fn into_code(self) -> B {
        self.code
    }

    /// The Pauli at `site`.
    pub fn get(&self, site: usize) -> Result<Pauli, OutOfRange> {
        self.check(site)?;
        Ok(self.code.get(site))
    }

    /// Overwrite the Pauli at `site`.
    pub fn set(&mut self, site: usize, pauli: Pauli) -> Result<(), OutOfRange> {
        self.check(site)?;
        self.code.set(site, pauli);
        Ok(())
    }

    /// Multiply with `other`, returning the phase and the string of the product.
    pub fn product(&self, other: &Self) -> Result<(Phase, Self), ShapeMismatch> {
        self.check_shape(other)?;
        let (phase, code) = self.code.product(&other.code);
        Ok((phase, Self { nsites: self.nsites, code }))
    }

    /// Whether the two strings commute.
    pub fn commutes_with(&self, other: &Self) -> Result<bool, ShapeMismatch> {
        self.check_shape(other)?;
        Ok(self.code.commutes_with(&other.code))
    }

    /// The number of non-identity sites.
    pub fn weight(&self) -> usize {
        self.code.weight()
    }

    /// The number of sites carrying X or Y.
    pub fn count_x_or_y(&self) -> usize {
        self.code.count_x_or_y()
    }

    /// The number of sites carrying Y or Z.
    pub fn count_y_or_z(&self) -> usize {
        self.code.count_y_or_z()
    }

    fn check(&self, site: usize) -> Result<(), OutOfRange> {
        if site < self.nsites {
            Ok(())
        } else {
            Err(OutOfRange { site, nsites: self.nsites })
        }
    }

    fn check_shape(&self, other: &Self) -> Result<(), ShapeMismatch> {
        if self.nsites == other.nsites {
            Ok(())
        } else {
            Err(ShapeMismatch { left: self.nsites, right: other.nsites })
        }
    }
}

impl<B: PauliCode> Display for PauliString<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for site in 0..self.nsites {
            write!(f, "{}", self.code.get(site))?;
        }
        Ok(())
    }
}

impl<B: PauliCode> FromStr for PauliString<B> {
    type Err = InvalidPauli;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let paulis = s
            .chars()
            .map(|c| match c {
                'I' => Ok(Pauli::I),
                'X' => Ok(Pauli::X),
                'Y' => Ok(Pauli::Y),
                'Z' => Ok(Pauli::Z),
                _ => Err(InvalidPauli(u8::MAX)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_paulis(&paulis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let string: PauliString<u16> = "XIZY".parse().unwrap();
        assert_eq!(string.nsites(), 4);
        assert_eq!(string.get(0), Ok(Pauli::X));
        assert_eq!(string.get(2), Ok(Pauli::Z));
        assert_eq!(string.to_string(), "XIZY");
        assert!("XQ".parse::<PauliString<u16>>().is_err());
    }

    #[test]
    fn out_of_range() {
        let mut string = PauliString::<u8>::identity(2);
        assert_eq!(string.get(2), Err(OutOfRange { site: 2, nsites: 2 }));
        assert_eq!(
            string.set(5, Pauli::X),
            Err(OutOfRange { site: 5, nsites: 2 })
        );
    }

    #[test]
    #[should_panic]
    fn capacity_overflow() {
        let _ = PauliString::<u8>::identity(5);
    }

    #[test]
    fn shape_mismatch() {
        let a = PauliString::<u32>::identity(3);
        let b = PauliString::<u32>::identity(4);
        assert_eq!(a.product(&b), Err(ShapeMismatch { left: 3, right: 4 }));
    }

    #[test]
    fn string_product() {
        let a: PauliString<u32> = "XXI".parse().unwrap();
        let b: PauliString<u32> = "YIZ".parse().unwrap();
        let (phase, product) = a.product(&b).unwrap();
        assert_eq!(phase, Phase::PLUS_I);
        assert_eq!(product.to_string(), "ZXZ");
    }
}
