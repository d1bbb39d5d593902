/*!
Coefficient types carried by the terms of a Pauli sum.

A coefficient is a plain numeric scalar ([f64] or [Complex64]) or a
[PathProperties] record decorating a scalar with counters of the sine and cosine
factors accumulated along a propagation path. The counters feed the path-based
truncation thresholds; merging two paths keeps the elementwise minima because
either parent path is still reachable.

The propagation kernels talk to coefficients exclusively through [Coefficient]:
Clifford and noise kernels [scale](Coefficient::scale) by real factors, rotation
kernels use the [apply_cos](Coefficient::apply_cos) and
[branch_sin](Coefficient::branch_sin) hooks so the decorated type can record its
path.
*/

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul};

use num_complex::Complex64;
use num_traits::{One, Zero};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The bare numeric scalar inside a coefficient.
pub trait CoeffValue:
    Copy
    + Debug
    + PartialEq
    + Default
    + Send
    + Sync
    + Zero
    + One
    + Add<Output = Self>
    + AddAssign
    + Mul<Output = Self>
{
    /// Embed a real number.
    fn from_real(value: f64) -> Self;

    /// Multiply by a real factor in place.
    fn scale(&mut self, factor: f64);

    /// The absolute value.
    fn magnitude(&self) -> f64;
}

impl CoeffValue for f64 {
    #[inline]
    fn from_real(value: f64) -> Self {
        value
    }

    #[inline]
    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

impl CoeffValue for Complex64 {
    #[inline]
    fn from_real(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    #[inline]
    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

/// The behavior the propagation pipeline needs from a term coefficient.
pub trait Coefficient: Clone + Debug + PartialEq + Default + Send + Sync {
    /// The numeric scalar component.
    type Value: CoeffValue;

    /// The multiplicative unit (the seed coefficient of a fresh term).
    fn one() -> Self {
        Self::from_value(Self::Value::one())
    }

    /// Wrap a bare scalar.
    fn from_value(value: Self::Value) -> Self;

    /// The numeric component.
    fn value(&self) -> Self::Value;

    /// The absolute value of the numeric component.
    fn magnitude(&self) -> f64 {
        self.value().magnitude()
    }

    /// Merge-addition: the coefficient of two colliding terms.
    fn add_merge(&mut self, other: Self);

    /// Multiply the numeric component by a real factor.
    fn scale(&mut self, factor: f64);

    /// Multiply the numeric component by a scalar.
    fn mult_value(&mut self, factor: Self::Value);

    /// Multiply by `cos(theta)`, recording the factor where supported.
    fn apply_cos(&mut self, theta: f64) {
        self.scale(theta.cos());
    }

    /// The coefficient of a sine branch: multiplied by `sign * sin(theta)`,
    /// recording the factor where supported.
    fn branch_sin(&self, theta: f64, sign: f64) -> Self {
        let mut ret = self.clone();
        ret.scale(sign * theta.sin());
        ret
    }

    /// The accumulated sine count; [None] for plain numeric coefficients.
    fn nsins(&self) -> Option<u32> {
        None
    }

    /// The accumulated cosine count; [None] for plain numeric coefficients.
    fn ncos(&self) -> Option<u32> {
        None
    }

    /// The accumulated total factor count; [None] for plain numerics.
    fn freq(&self) -> Option<u32> {
        None
    }
}

impl Coefficient for f64 {
    type Value = f64;

    fn from_value(value: f64) -> Self {
        value
    }

    fn value(&self) -> f64 {
        *self
    }

    fn add_merge(&mut self, other: Self) {
        *self += other;
    }

    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }

    fn mult_value(&mut self, factor: f64) {
        *self *= factor;
    }
}

impl Coefficient for Complex64 {
    type Value = Complex64;

    fn from_value(value: Complex64) -> Self {
        value
    }

    fn value(&self) -> Complex64 {
        *self
    }

    fn add_merge(&mut self, other: Self) {
        *self += other;
    }

    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }

    fn mult_value(&mut self, factor: Complex64) {
        *self *= factor;
    }
}

/// A numeric coefficient decorated with the sine/cosine history of its path.
///
/// `freq = nsins + ncos` is kept explicitly because merging takes elementwise
/// minima, under which the sum relation may break for the merged record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathProperties<V> {
    /// The numeric component.
    pub value: V,
    /// Count of sine factors on this path.
    pub nsins: u32,
    /// Count of cosine factors on this path.
    pub ncos: u32,
    /// Total count of angle factors on this path.
    pub freq: u32,
}

impl<V: CoeffValue> PathProperties<V> {
    /// A fresh path record around `value`.
    pub fn new(value: V) -> Self {
        Self { value, nsins: 0, ncos: 0, freq: 0 }
    }
}

impl<V: CoeffValue> Coefficient for PathProperties<V> {
    type Value = V;

    fn from_value(value: V) -> Self {
        Self::new(value)
    }

    fn value(&self) -> V {
        self.value
    }

    fn add_merge(&mut self, other: Self) {
        // a merged path inherits the most permissive history
        self.value += other.value;
        self.nsins = self.nsins.min(other.nsins);
        self.ncos = self.ncos.min(other.ncos);
        self.freq = self.freq.min(other.freq);
    }

    fn scale(&mut self, factor: f64) {
        self.value.scale(factor);
    }

    fn mult_value(&mut self, factor: V) {
        self.value = self.value * factor;
    }

    fn apply_cos(&mut self, theta: f64) {
        self.value.scale(theta.cos());
        self.ncos += 1;
        self.freq += 1;
    }

    fn branch_sin(&self, theta: f64, sign: f64) -> Self {
        let mut value = self.value;
        value.scale(sign * theta.sin());
        Self {
            value,
            nsins: self.nsins + 1,
            ncos: self.ncos,
            freq: self.freq + 1,
        }
    }

    fn nsins(&self) -> Option<u32> {
        Some(self.nsins)
    }

    fn ncos(&self) -> Option<u32> {
        Some(self.ncos)
    }

    fn freq(&self) -> Option<u32> {
        Some(self.freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hooks() {
        let mut c = 2.0f64;
        c.apply_cos(0.0);
        assert_eq!(c, 2.0);
        let branch = c.branch_sin(std::f64::consts::FRAC_PI_2, -1.0);
        assert!((branch + 2.0).abs() < 1e-12);
        assert_eq!(c.freq(), None);
    }

    #[test]
    fn path_counting() {
        let mut c = PathProperties::new(1.0);
        c.apply_cos(0.3);
        let branch = c.branch_sin(0.3, 1.0);
        assert_eq!((c.nsins, c.ncos, c.freq), (0, 1, 1));
        assert_eq!((branch.nsins, branch.ncos, branch.freq), (1, 1, 2));
        assert!((c.value - 0.3f64.cos()).abs() < 1e-12);
        assert!((branch.value - 0.3f64.cos() * 0.3f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn merge_takes_minima() {
        let mut a = PathProperties { value: 0.5, nsins: 2, ncos: 5, freq: 7 };
        let b = PathProperties { value: 0.25, nsins: 4, ncos: 1, freq: 5 };
        a.add_merge(b);
        assert_eq!(a.value, 0.75);
        assert_eq!((a.nsins, a.ncos, a.freq), (2, 1, 5));
    }

    #[test]
    fn complex_values() {
        let mut c = Complex64::new(0.0, 1.0);
        CoeffValue::scale(&mut c, 2.0);
        assert_eq!(c, Complex64::new(0.0, 2.0));
        assert!((Coefficient::magnitude(&c) - 2.0).abs() < 1e-12);
    }
}
