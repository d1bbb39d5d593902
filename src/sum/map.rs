/*!
The keyed term-sum shape.
*/

use hashbrown::{hash_map, HashMap};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{zero_coeff, TermSum};
use crate::{
    coefficient::{CoeffValue, Coefficient, PathProperties},
    pauli::{code::PauliCode, string::PauliString},
};

/// A Pauli sum keyed by a hash map.
///
/// `add` and `set` are amortized O(1); deletion is supported. This is the
/// general-purpose shape for sparse, unpredictably branching sums.
///
/// # Examples
/// ```
/// # use pauli_propagation::{pauli::Pauli, sum::{PauliSum, TermSum}};
/// let mut observable = PauliSum::<u64>::new(4);
/// observable.add_pauli(Pauli::Z, 2, 1.0).unwrap();
/// assert_eq!(observable.len(), 1);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound(
    serialize = "B: PauliCode + Serialize, C: Coefficient + Serialize",
    deserialize = "B: PauliCode + Deserialize<'de>, C: Coefficient + Deserialize<'de>",
)))]
pub struct PauliSum<B, C = f64> {
    nsites: usize,
    terms: HashMap<B, C>,
}

impl<B: PauliCode, C: Coefficient> PartialEq for PauliSum<B, C> {
    fn eq(&self, other: &Self) -> bool {
        self.nsites == other.nsites && self.terms == other.terms
    }
}

impl<B: PauliCode, C: Coefficient> PauliSum<B, C> {
    /// An empty sum on `nsites` sites.
    ///
    /// # Panics
    /// If `2 * nsites` bits do not fit into the carrier `B`.
    pub fn new(nsites: usize) -> Self {
        if let Some(capacity) = B::SITES {
            assert!(
                nsites <= capacity,
                "{nsites} sites do not fit into the carrier ({capacity} sites)"
            );
        }
        Self { nsites, terms: HashMap::new() }
    }

    /// A sum seeded with a single term.
    pub fn from_string(string: PauliString<B>, coeff: C) -> Self {
        let mut ret = Self::new(string.nsites());
        ret.terms.insert(string.into_code(), coeff);
        ret
    }

    /// Wrap every coefficient into a fresh [PathProperties] record.
    pub fn wrap_paths(self) -> PauliSum<B, PathProperties<C::Value>> {
        PauliSum {
            nsites: self.nsites,
            terms: self
                .terms
                .into_iter()
                .map(|(code, coeff)| (code, PathProperties::new(coeff.value())))
                .collect(),
        }
    }

    /// Strip [PathProperties] records down to their numeric components.
    pub fn unwrap_paths<V>(self) -> PauliSum<B, V>
    where
        C: Coefficient<Value = V>,
        V: CoeffValue + Coefficient<Value = V>,
    {
        PauliSum {
            nsites: self.nsites,
            terms: self.terms.into_iter().map(|(code, coeff)| (code, coeff.value())).collect(),
        }
    }

    pub(crate) fn drain_terms(&mut self) -> hash_map::Drain<'_, B, C> {
        self.terms.drain()
    }

    pub(crate) fn retain_terms(&mut self, keep: impl FnMut(&B, &mut C) -> bool) {
        self.terms.retain(keep);
    }

    pub(crate) fn iter_terms_mut(&mut self) -> hash_map::IterMut<'_, B, C> {
        self.terms.iter_mut()
    }
}

impl<B: PauliCode, C: Coefficient> TermSum<B, C> for PauliSum<B, C> {
    type Iter<'l>
        = hash_map::Iter<'l, B, C>
    where
        Self: 'l;

    fn nsites(&self) -> usize {
        self.nsites
    }

    fn len(&self) -> usize {
        self.terms.len()
    }

    fn coeff(&self, code: &B) -> C {
        self.terms.get(code).cloned().unwrap_or_else(zero_coeff)
    }

    fn add(&mut self, code: B, coeff: C) {
        match self.terms.entry(code) {
            hash_map::Entry::Occupied(mut entry) => entry.get_mut().add_merge(coeff),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(coeff);
            },
        }
    }

    fn set(&mut self, code: B, coeff: C) {
        self.terms.insert(code, coeff);
    }

    fn remove(&mut self, code: &B) -> Option<C> {
        self.terms.remove(code)
    }

    fn mult_by(&mut self, factor: C::Value) {
        for coeff in self.terms.values_mut() {
            coeff.mult_value(factor);
        }
    }

    fn similar(&self) -> Self {
        Self { nsites: self.nsites, terms: HashMap::new() }
    }

    fn iter_terms(&self) -> Self::Iter<'_> {
        self.terms.iter()
    }
}

/// Shape-checked term-wise addition.
///
/// # Panics
/// If the sums act on different numbers of sites; use
/// [add_sum](TermSum::add_sum) for a checked variant.
impl<B: PauliCode, C: Coefficient> std::ops::AddAssign<&PauliSum<B, C>> for PauliSum<B, C> {
    fn add_assign(&mut self, other: &Self) {
        self.add_sum(other).unwrap_or_else(|e| panic!("{e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;

    #[test]
    fn seed_constructors() {
        let string: PauliString<u32> = "IZX".parse().unwrap();
        let sum = PauliSum::from_string(string.clone(), 0.5);
        assert_eq!(sum.coeff(string.code()), 0.5);

        let mut sum = PauliSum::<u32>::new(3);
        sum.add_paulis(&[Pauli::Z, Pauli::X], &[1, 2], 0.5).unwrap();
        assert_eq!(sum.coeff(string.code()), 0.5);
        assert!(sum.add_pauli(Pauli::X, 3, 1.0).is_err());
    }

    #[test]
    fn sum_addition() {
        let mut a = PauliSum::<u16>::new(2);
        a.add_pauli(Pauli::X, 0, 1.0).unwrap();
        let mut b = PauliSum::<u16>::new(2);
        b.add_pauli(Pauli::X, 0, 0.5).unwrap();
        b.add_pauli(Pauli::Y, 1, 2.0).unwrap();
        a += &b;
        assert_eq!(a.len(), 2);
        let mut x0 = 0u16;
        x0.set(0, Pauli::X);
        assert_eq!(a.coeff(&x0), 1.5);
    }

    #[test]
    fn path_wrapping_roundtrip() {
        let mut sum = PauliSum::<u8>::new(1);
        sum.add_pauli(Pauli::Z, 0, 2.0).unwrap();
        let wrapped = sum.clone().wrap_paths();
        let z = {
            let mut code = 0u8;
            code.set(0, Pauli::Z);
            code
        };
        assert_eq!(wrapped.coeff(&z).value, 2.0);
        assert_eq!(wrapped.coeff(&z).freq, 0);
        assert_eq!(wrapped.unwrap_paths(), sum);
    }
}
