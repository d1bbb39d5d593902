/*!
The data-parallel backend over the vector-backed sum.

Every kernel follows the same decomposition: a pure per-term predicate fills the
flag vector, a prefix scan over the flags yields counts and destination offsets,
and a final parallel pass writes each slot. The scatter of the write pass is
inverted into a gather (each destination slot pulls from its flagged source
position) so all writes stay disjoint by construction; the flagged positions are
collected in source order, which makes the gather exact.

Branching kernels write their surviving part in place (each index owns its
slot) and the new branches into the free tail of the same buffers; merge and
truncate rebuild into the auxiliary buffers and swap.
*/

use std::mem;

use log::trace;
use rayon::prelude::*;

use super::{Propagatable, PropagationError, Propagator, Truncation};
use crate::{
    coefficient::Coefficient,
    gate::{AmplitudeDamping, CliffordGate, PauliNoise, PauliRotation, UserGate},
    pauli::{code::PauliCode, Pauli},
    sum::{DensePauliSum, TermSum},
};

const SCAN_CHUNK: usize = 1 << 12;

/// An inclusive `+`-scan over the flag vector; `out[i]` is the number of set
/// flags in `flags[..=i]`.
fn inclusive_scan(flags: &[bool], out: &mut Vec<usize>) {
    out.clear();
    out.resize(flags.len(), 0);
    let chunk_sums: Vec<usize> = flags
        .par_chunks(SCAN_CHUNK)
        .map(|chunk| chunk.iter().map(|&flag| flag as usize).sum())
        .collect();
    let mut offsets = Vec::with_capacity(chunk_sums.len());
    let mut running = 0;
    for sum in chunk_sums {
        offsets.push(running);
        running += sum;
    }
    out.par_chunks_mut(SCAN_CHUNK)
        .zip(flags.par_chunks(SCAN_CHUNK))
        .zip(offsets.into_par_iter())
        .for_each(|((out_chunk, flag_chunk), offset)| {
            let mut acc = offset;
            for (out, &flag) in out_chunk.iter_mut().zip(flag_chunk) {
                acc += flag as usize;
                *out = acc;
            }
        });
}

/// The positions of the set flags, in source order.
fn flagged_positions(flags: &[bool]) -> Vec<usize> {
    flags
        .par_iter()
        .enumerate()
        .filter_map(|(position, &flag)| flag.then_some(position))
        .collect()
}

/// The dense propagation cache: live and auxiliary parallel-array sums plus
/// the flag and index scratch, all grown in lockstep.
#[derive(Debug, Clone)]
pub struct DensePropagator<B, C> {
    main: DensePauliSum<B, C>,
    aux: DensePauliSum<B, C>,
    flags: Vec<bool>,
    indices: Vec<usize>,
}

impl<B: PauliCode, C: Coefficient> DensePropagator<B, C> {
    /// The live sum.
    pub fn main(&self) -> &DensePauliSum<B, C> {
        &self.main
    }

    /// Exchange the live and the auxiliary sum, O(1).
    pub fn swap(&mut self) {
        mem::swap(&mut self.main, &mut self.aux);
    }

    /// Grow every internal buffer to hold at least `capacity` slots, in
    /// lockstep. The active sizes are untouched.
    pub fn resize(&mut self, capacity: usize) -> Result<(), PropagationError> {
        self.main.reserve_slots(capacity)?;
        self.aux.reserve_slots(capacity)?;
        if self.flags.len() < capacity {
            self.flags.resize(capacity, false);
        }
        if self.indices.len() < capacity {
            self.indices.resize(capacity, 0);
        }
        Ok(())
    }
}

impl<B: PauliCode, C: Coefficient> Propagator<B, C> for DensePropagator<B, C> {
    type Sum = DensePauliSum<B, C>;

    fn from_sum(sum: Self::Sum) -> Self {
        let aux = sum.similar();
        Self { main: sum, aux, flags: Vec::new(), indices: Vec::new() }
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
        let (terms, coeffs) = self.main.parts_mut();
        terms
            .par_iter_mut()
            .zip(coeffs.par_iter_mut())
            .for_each(|(code, coeff)| {
                let sign = gate.conjugate(code);
                coeff.scale(sign);
            });
        Ok(())
    }

    fn apply_rotation(
        &mut self,
        gate: &PauliRotation,
        theta: f64,
    ) -> Result<(), PropagationError> {
        let n = self.main.len();
        if n == 0 {
            return Ok(());
        }
        let generator: B = gate.generator();
        let Self { main, flags, indices, .. } = self;

        flags.clear();
        flags.resize(n, false);
        {
            let (terms, _) = main.parts();
            flags
                .par_iter_mut()
                .zip(terms.par_iter())
                .for_each(|(flag, code)| *flag = !generator.commutes_with(code));
        }
        inclusive_scan(flags, indices);
        let branching = indices.last().copied().unwrap_or(0);
        if branching == 0 {
            return Ok(());
        }

        main.reserve_slots(n + branching)?;
        let sources = flagged_positions(flags);
        let ((live_terms, live_coeffs), (tail_terms, tail_coeffs)) = main.split_at_active();
        {
            // the sine branches read the original coefficients, so they are
            // written before the cosine pass scales in place
            let live_terms = &*live_terms;
            let live_coeffs = &*live_coeffs;
            tail_terms[..branching]
                .par_iter_mut()
                .zip(tail_coeffs[..branching].par_iter_mut())
                .zip(sources.into_par_iter())
                .for_each(|((slot_term, slot_coeff), source)| {
                    let (sign, product) =
                        PauliRotation::branch(&generator, &live_terms[source]);
                    *slot_term = product;
                    *slot_coeff = live_coeffs[source].branch_sin(theta, sign);
                });
        }
        live_coeffs
            .par_iter_mut()
            .zip(flags.par_iter())
            .for_each(|(coeff, &flag)| {
                if flag {
                    coeff.apply_cos(theta);
                }
            });
        main.set_active(n + branching);
        Ok(())
    }

    fn apply_pauli_noise(&mut self, gate: &PauliNoise) -> Result<(), PropagationError> {
        let site = gate.site();
        let (terms, coeffs) = self.main.parts_mut();
        terms
            .par_iter()
            .zip(coeffs.par_iter_mut())
            .for_each(|(code, coeff)| coeff.scale(gate.factor(code.get(site))));
        Ok(())
    }

    fn apply_damping(&mut self, gate: &AmplitudeDamping) -> Result<(), PropagationError> {
        let n = self.main.len();
        if n == 0 {
            return Ok(());
        }
        let site = gate.site();
        let (kept_factor, fed_factor) = gate.branch_factors();
        let Self { main, flags, indices, .. } = self;

        flags.clear();
        flags.resize(n, false);
        {
            let (terms, _) = main.parts();
            flags
                .par_iter_mut()
                .zip(terms.par_iter())
                .for_each(|(flag, code)| *flag = code.get(site) == Pauli::Z);
        }
        inclusive_scan(flags, indices);
        let branching = indices.last().copied().unwrap_or(0);

        if branching > 0 {
            main.reserve_slots(n + branching)?;
            let sources = flagged_positions(flags);
            let ((live_terms, live_coeffs), (tail_terms, tail_coeffs)) =
                main.split_at_active();
            let live_terms = &*live_terms;
            let live_coeffs = &*live_coeffs;
            tail_terms[..branching]
                .par_iter_mut()
                .zip(tail_coeffs[..branching].par_iter_mut())
                .zip(sources.into_par_iter())
                .for_each(|((slot_term, slot_coeff), source)| {
                    let mut identity = live_terms[source].clone();
                    identity.set(site, Pauli::I);
                    let mut fed = live_coeffs[source].clone();
                    fed.scale(fed_factor);
                    *slot_term = identity;
                    *slot_coeff = fed;
                });
        }
        {
            let (terms, coeffs) = main.parts_mut();
            terms
                .par_iter()
                .zip(coeffs.par_iter_mut())
                .for_each(|(code, coeff)| match code.get(site) {
                    Pauli::I => {},
                    Pauli::X | Pauli::Y => coeff.scale((1.0 - gate.gamma()).sqrt()),
                    Pauli::Z => coeff.scale(kept_factor),
                });
        }
        main.set_active(n + branching);
        Ok(())
    }

    fn apply_custom(
        &mut self,
        gate: &dyn UserGate<B, C>,
        parameter: Option<f64>,
    ) -> Result<(), PropagationError> {
        // generic term-level path; arity is up to the gate, so this drains
        // sequentially into the auxiliary buffers instead of pre-sizing a tail
        let Self { main, aux, .. } = self;
        aux.clear();
        {
            let (terms, coeffs) = main.parts();
            for (code, coeff) in terms.iter().zip(coeffs) {
                for (branch, branch_coeff) in gate.apply(code, coeff.clone(), parameter) {
                    aux.push(branch, branch_coeff);
                }
            }
        }
        mem::swap(main, aux);
        aux.clear();
        Ok(())
    }

    fn merge(&mut self) -> Result<(), PropagationError> {
        let n = self.main.len();
        if n <= 1 {
            return Ok(());
        }
        let Self { main, aux, flags, indices } = self;
        let unique;
        {
            let (terms, coeffs) = main.parts();
            let mut perm: Vec<usize> = (0..n).collect();
            perm.par_sort_unstable_by(|&a, &b| terms[a].cmp(&terms[b]));

            flags.clear();
            flags.resize(n, false);
            flags.par_iter_mut().enumerate().for_each(|(position, flag)| {
                *flag = position == 0 || terms[perm[position]] != terms[perm[position - 1]];
            });
            inclusive_scan(flags, indices);
            unique = indices.last().copied().unwrap_or(0);
            if unique == n {
                // every key distinct, skip the deduplication copy
                return Ok(());
            }
            trace!("merge folds {n} terms into {unique}");

            let starts = flagged_positions(flags);
            aux.reserve_slots(unique)?;
            let (_, (aux_terms, aux_coeffs)) = aux.split_at_active();
            aux_terms[..unique]
                .par_iter_mut()
                .zip(aux_coeffs[..unique].par_iter_mut())
                .enumerate()
                .for_each(|(destination, (slot_term, slot_coeff))| {
                    let begin = starts[destination];
                    let end = starts.get(destination + 1).copied().unwrap_or(n);
                    let mut acc = coeffs[perm[begin]].clone();
                    for position in begin + 1..end {
                        acc.add_merge(coeffs[perm[position]].clone());
                    }
                    *slot_term = terms[perm[begin]].clone();
                    *slot_coeff = acc;
                });
        }
        aux.set_active(unique);
        mem::swap(main, aux);
        aux.clear();
        Ok(())
    }

    fn truncate(&mut self, truncation: &Truncation<B, C>) -> Result<(), PropagationError> {
        let n = self.main.len();
        if n == 0 {
            return Ok(());
        }
        let Self { main, aux, flags, indices } = self;
        let kept;
        {
            let (terms, coeffs) = main.parts();
            flags.clear();
            flags.resize(n, false);
            flags
                .par_iter_mut()
                .zip(terms.par_iter().zip(coeffs.par_iter()))
                .for_each(|(flag, (code, coeff))| *flag = !truncation.discards(code, coeff));
            inclusive_scan(flags, indices);
            kept = indices.last().copied().unwrap_or(0);
            if kept == n {
                return Ok(());
            }

            let starts = flagged_positions(flags);
            aux.reserve_slots(kept)?;
            let (_, (aux_terms, aux_coeffs)) = aux.split_at_active();
            aux_terms[..kept]
                .par_iter_mut()
                .zip(aux_coeffs[..kept].par_iter_mut())
                .zip(starts.into_par_iter())
                .for_each(|((slot_term, slot_coeff), source)| {
                    *slot_term = terms[source].clone();
                    *slot_coeff = coeffs[source].clone();
                });
        }
        aux.set_active(kept);
        mem::swap(main, aux);
        aux.clear();
        Ok(())
    }
}

impl<B: PauliCode, C: Coefficient> Propagatable<B, C> for DensePauliSum<B, C> {
    type Backend = DensePropagator<B, C>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pauli: Pauli) -> u8 {
        let mut code = 0u8;
        code.set(0, pauli);
        code
    }

    #[test]
    fn scan_counts_flags() {
        let flags = [true, false, true, true, false];
        let mut indices = Vec::new();
        inclusive_scan(&flags, &mut indices);
        assert_eq!(indices, vec![1, 1, 2, 3, 3]);
        assert_eq!(flagged_positions(&flags), vec![0, 2, 3]);

        inclusive_scan(&[], &mut indices);
        assert!(indices.is_empty());
    }

    #[test]
    fn scan_across_chunks() {
        let flags: Vec<bool> = (0..3 * SCAN_CHUNK + 17).map(|i| i % 3 == 0).collect();
        let mut indices = Vec::new();
        inclusive_scan(&flags, &mut indices);
        let mut acc = 0;
        for (index, &flag) in indices.iter().zip(&flags) {
            acc += flag as usize;
            assert_eq!(*index, acc);
        }
    }

    #[test]
    fn rotation_writes_tail_slots() {
        let mut sum = DensePauliSum::<u8, f64>::new(1);
        sum.push(single(Pauli::Z), 1.0);
        sum.push(single(Pauli::X), 0.5);
        let mut cache = DensePropagator::from_sum(sum);
        let gate = PauliRotation::new(vec![Pauli::X], vec![0]).unwrap();
        cache.apply_rotation(&gate, 0.3).unwrap();
        // Z splits, X is left alone
        assert_eq!(cache.main.len(), 3);
        cache.merge().unwrap();
        assert_eq!(cache.main.len(), 3);
        assert!((cache.main.coeff(&single(Pauli::Z)) - 0.3f64.cos()).abs() < 1e-12);
        assert!((cache.main.coeff(&single(Pauli::Y)) - 0.3f64.sin()).abs() < 1e-12);
        assert_eq!(cache.main.coeff(&single(Pauli::X)), 0.5);
    }

    #[test]
    fn merge_deduplicates_and_skips_when_unique() {
        let mut sum = DensePauliSum::<u8, f64>::new(1);
        sum.push(single(Pauli::Z), 1.0);
        sum.push(single(Pauli::X), 2.0);
        sum.push(single(Pauli::Z), 0.25);
        sum.push(single(Pauli::X), -2.0);
        let mut cache = DensePropagator::from_sum(sum);
        cache.merge().unwrap();
        assert_eq!(cache.main.len(), 2);
        assert_eq!(cache.main.coeff(&single(Pauli::Z)), 1.25);
        assert_eq!(cache.main.coeff(&single(Pauli::X)), 0.0);

        // already unique: merge leaves the buffer untouched
        let before: Vec<_> = cache.main.iter_terms().map(|(c, v)| (*c, *v)).collect();
        cache.merge().unwrap();
        let after: Vec<_> = cache.main.iter_terms().map(|(c, v)| (*c, *v)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn truncate_compacts() {
        let mut sum = DensePauliSum::<u8, f64>::new(2);
        let mut heavy = 0u8;
        heavy.set(0, Pauli::X);
        heavy.set(1, Pauli::Z);
        sum.push(single(Pauli::Z), 1.0);
        sum.push(heavy, 1.0);
        sum.push(single(Pauli::X), 1e-9);
        let mut cache = DensePropagator::from_sum(sum);
        cache
            .truncate(&Truncation::none().max_weight(1).min_abs_coeff(1e-6))
            .unwrap();
        assert_eq!(cache.main.len(), 1);
        assert_eq!(cache.main.coeff(&single(Pauli::Z)), 1.0);
    }

    #[test]
    fn damping_branches_z_terms() {
        let mut sum = DensePauliSum::<u8, f64>::new(1);
        sum.push(single(Pauli::Z), 0.8);
        sum.push(single(Pauli::X), 1.0);
        let mut cache = DensePropagator::from_sum(sum);
        let gate = AmplitudeDamping::new(0, 0.5).unwrap();
        cache.apply_damping(&gate).unwrap();
        cache.merge().unwrap();
        assert!((cache.main.coeff(&single(Pauli::Z)) - 0.4).abs() < 1e-12);
        assert!((cache.main.coeff(&single(Pauli::I)) - 0.4).abs() < 1e-12);
        assert!((cache.main.coeff(&single(Pauli::X)) - 0.5f64.sqrt()).abs() < 1e-12);
    }
}
