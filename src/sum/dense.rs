/*!
The vector-backed term-sum shape.
*/

use std::{iter, slice};

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{zero_coeff, CapacityExhausted, TermSum};
use crate::{
    coefficient::Coefficient,
    pauli::{code::PauliCode, string::PauliString},
};

/// A Pauli sum stored as two parallel vectors.
///
/// Terms live in the active prefix `[0, active)`; the buffers may be larger so
/// that branching gates can grow the sum without reallocating per term. Between
/// a branching gate and the next merge the active prefix may contain duplicate
/// keys; the [TermSum] operations describe the merged state and [add](TermSum::add)
/// deduplicates eagerly in O(active), so bulk pipelines append with
/// [push](Self::push) and merge once.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DensePauliSum<B, C> {
    nsites: usize,
    terms: Vec<B>,
    coeffs: Vec<C>,
    active: usize,
}

impl<B: PauliCode, C: Coefficient> DensePauliSum<B, C> {
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
        Self { nsites, terms: Vec::new(), coeffs: Vec::new(), active: 0 }
    }

    /// A sum seeded with a single term.
    pub fn from_string(string: PauliString<B>, coeff: C) -> Self {
        let mut ret = Self::new(string.nsites());
        ret.push(string.into_code(), coeff);
        ret
    }

    /// The number of allocated slots; at least [len](TermSum::len).
    pub fn capacity(&self) -> usize {
        self.terms.len()
    }

    /// Grow the buffers to hold at least `required` slots, following the
    /// doubling policy. New slots are filled with default values; the active
    /// prefix is untouched.
    pub fn reserve_slots(&mut self, required: usize) -> Result<(), CapacityExhausted> {
        let current = self.capacity();
        if required <= current {
            return Ok(());
        }
        let target = required.max(2 * current);
        let additional = target - current;
        self.terms
            .try_reserve_exact(additional)
            .and_then(|()| self.coeffs.try_reserve_exact(additional))
            .map_err(|_| CapacityExhausted { requested: target })?;
        self.terms.extend(iter::repeat_with(B::default).take(additional));
        self.coeffs.extend(iter::repeat_with(C::default).take(additional));
        Ok(())
    }

    /// Append a term at the end of the active prefix without deduplication.
    pub fn push(&mut self, code: B, coeff: C) {
        if self.active == self.capacity() {
            self.reserve_slots(self.capacity().max(1) * 2)
                .unwrap_or_else(|e| panic!("{e}"));
        }
        self.terms[self.active] = code;
        self.coeffs[self.active] = coeff;
        self.active += 1;
    }

    /// Drop all terms, keeping the allocation.
    pub fn clear(&mut self) {
        self.active = 0;
    }

    pub(crate) fn set_active(&mut self, active: usize) {
        debug_assert!(active <= self.capacity());
        self.active = active;
    }

    pub(crate) fn parts(&self) -> (&[B], &[C]) {
        (&self.terms[..self.active], &self.coeffs[..self.active])
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [B], &mut [C]) {
        (&mut self.terms[..self.active], &mut self.coeffs[..self.active])
    }

    /// Split both buffers at the active cursor: the live terms and the free
    /// tail slots, usable as disjoint read/write regions by a branching kernel.
    pub(crate) fn split_at_active(
        &mut self,
    ) -> ((&mut [B], &mut [C]), (&mut [B], &mut [C])) {
        let (live_terms, tail_terms) = self.terms.split_at_mut(self.active);
        let (live_coeffs, tail_coeffs) = self.coeffs.split_at_mut(self.active);
        ((live_terms, live_coeffs), (tail_terms, tail_coeffs))
    }

    fn position(&self, code: &B) -> Option<usize> {
        self.terms[..self.active].iter().position(|t| t == code)
    }

    fn canonical(&self) -> Vec<(B, C)> {
        let (terms, coeffs) = self.parts();
        let mut pairs: Vec<(B, C)> =
            terms.iter().cloned().zip(coeffs.iter().cloned()).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
            .into_iter()
            .coalesce(|mut left, right| {
                if left.0 == right.0 {
                    left.1.add_merge(right.1);
                    Ok(left)
                } else {
                    Err((left, right))
                }
            })
            .collect()
    }
}

impl<B: PauliCode, C: Coefficient> TermSum<B, C> for DensePauliSum<B, C> {
    type Iter<'l>
        = iter::Zip<slice::Iter<'l, B>, slice::Iter<'l, C>>
    where
        Self: 'l;

    fn nsites(&self) -> usize {
        self.nsites
    }

    fn len(&self) -> usize {
        self.active
    }

    fn coeff(&self, code: &B) -> C {
        let (terms, coeffs) = self.parts();
        let mut acc: Option<C> = None;
        for (term, coeff) in terms.iter().zip(coeffs) {
            if term == code {
                match &mut acc {
                    Some(acc) => acc.add_merge(coeff.clone()),
                    None => acc = Some(coeff.clone()),
                }
            }
        }
        acc.unwrap_or_else(zero_coeff)
    }

    fn add(&mut self, code: B, coeff: C) {
        match self.position(&code) {
            Some(index) => self.coeffs[index].add_merge(coeff),
            None => self.push(code, coeff),
        }
    }

    fn set(&mut self, code: B, coeff: C) {
        match self.position(&code) {
            Some(index) => self.coeffs[index] = coeff,
            None => self.push(code, coeff),
        }
    }

    fn remove(&mut self, code: &B) -> Option<C> {
        let index = self.position(code)?;
        self.active -= 1;
        self.terms.swap(index, self.active);
        self.coeffs.swap(index, self.active);
        Some(self.coeffs[self.active].clone())
    }

    fn mult_by(&mut self, factor: C::Value) {
        for coeff in &mut self.coeffs[..self.active] {
            coeff.mult_value(factor);
        }
    }

    fn similar(&self) -> Self {
        Self { nsites: self.nsites, terms: Vec::new(), coeffs: Vec::new(), active: 0 }
    }

    fn iter_terms(&self) -> Self::Iter<'_> {
        let (terms, coeffs) = self.parts();
        terms.iter().zip(coeffs.iter())
    }
}

/// Compares the merged states; duplicate keys are folded before comparison.
impl<B: PauliCode, C: Coefficient> PartialEq for DensePauliSum<B, C> {
    fn eq(&self, other: &Self) -> bool {
        self.nsites == other.nsites && self.canonical() == other.canonical()
    }
}

impl<B: PauliCode, C: Coefficient> From<&crate::sum::PauliSum<B, C>> for DensePauliSum<B, C> {
    fn from(keyed: &crate::sum::PauliSum<B, C>) -> Self {
        let mut ret = Self::new(keyed.nsites());
        ret.reserve_slots(keyed.len()).unwrap_or_else(|e| panic!("{e}"));
        for (code, coeff) in keyed.iter_terms() {
            ret.push(code.clone(), coeff.clone());
        }
        ret
    }
}

impl<B: PauliCode, C: Coefficient> From<&DensePauliSum<B, C>> for crate::sum::PauliSum<B, C> {
    fn from(dense: &DensePauliSum<B, C>) -> Self {
        let mut ret = Self::new(dense.nsites());
        for (code, coeff) in dense.iter_terms() {
            ret.add(code.clone(), coeff.clone());
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::Pauli;

    #[test]
    fn growth_keeps_active_prefix() {
        let mut sum = DensePauliSum::<u64, f64>::new(8);
        for site in 0..8 {
            sum.add_pauli(Pauli::X, site, site as f64).unwrap();
        }
        assert!(sum.capacity() >= 8);
        let mut x3 = 0u64;
        x3.set(3, Pauli::X);
        assert_eq!(sum.coeff(&x3), 3.0);
        assert_eq!(sum.len(), 8);
    }

    #[test]
    fn duplicates_fold_in_queries() {
        let mut sum = DensePauliSum::<u8, f64>::new(2);
        let mut zx = 0u8;
        zx.set(0, Pauli::Z);
        zx.set(1, Pauli::X);
        sum.push(zx, 1.0);
        sum.push(zx, 0.5);
        assert_eq!(sum.len(), 2);
        assert_eq!(sum.coeff(&zx), 1.5);

        let mut merged = DensePauliSum::<u8, f64>::new(2);
        merged.push(zx, 1.5);
        assert_eq!(sum, merged);
    }

    #[test]
    fn keyed_conversions() {
        let mut keyed = crate::sum::PauliSum::<u32, f64>::new(3);
        keyed.add_pauli(Pauli::Y, 1, -0.25).unwrap();
        keyed.add_pauli(Pauli::Z, 2, 1.0).unwrap();
        let dense = DensePauliSum::from(&keyed);
        assert_eq!(dense.len(), 2);
        assert_eq!(crate::sum::PauliSum::from(&dense), keyed);
    }
}
