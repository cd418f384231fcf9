//! A set of disjoint intervals over `i64`.
//!
//! A `LongRangeSet` is always kept canonical: its intervals are sorted,
//! non-overlapping, and non-adjacent. Adjacent intervals are merged when the
//! set is built. Equality and emptiness checks therefore never need to
//! normalize.
//!
//! Arithmetic over sets is sound but not always exact. Whenever a bound would
//! overflow, the result is the full range.

use crate::il::BinaryOp;
use serde::{Deserialize, Serialize};
use std::cmp::{max, min};
use std::fmt;

/// Above this many interval pairs, arithmetic is performed over the hulls of
/// the operands.
pub const MAX_ARITHMETIC_PAIRS: usize = 64;

/// A canonical set of closed `i64` intervals.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "Vec<(i64, i64)>", into = "Vec<(i64, i64)>")]
pub struct LongRangeSet {
    intervals: Vec<(i64, i64)>,
}

impl LongRangeSet {
    /// The empty set.
    pub const fn empty() -> LongRangeSet {
        LongRangeSet {
            intervals: Vec::new(),
        }
    }

    /// Every `i64`.
    pub fn all() -> LongRangeSet {
        LongRangeSet::range(i64::MIN, i64::MAX)
    }

    /// The set `{value}`.
    pub fn point(value: i64) -> LongRangeSet {
        LongRangeSet {
            intervals: vec![(value, value)],
        }
    }

    /// The closed interval `[lo, hi]`. Empty if `lo > hi`.
    pub fn range(lo: i64, hi: i64) -> LongRangeSet {
        if lo > hi {
            LongRangeSet::empty()
        } else {
            LongRangeSet {
                intervals: vec![(lo, hi)],
            }
        }
    }

    /// Build a canonical set from arbitrary, possibly overlapping, intervals.
    /// Intervals with `lo > hi` are ignored.
    pub fn from_intervals<I>(intervals: I) -> LongRangeSet
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut sorted: Vec<(i64, i64)> = intervals
            .into_iter()
            .filter(|&(lo, hi)| lo <= hi)
            .collect();
        sorted.sort_unstable();

        let mut canonical: Vec<(i64, i64)> = Vec::with_capacity(sorted.len());
        for (lo, hi) in sorted {
            if let Some(last) = canonical.last_mut() {
                if last.1 == i64::MAX || lo <= last.1 + 1 {
                    last.1 = max(last.1, hi);
                    continue;
                }
            }
            canonical.push((lo, hi));
        }

        LongRangeSet {
            intervals: canonical,
        }
    }

    /// The canonical intervals of this set, in ascending order.
    pub fn intervals(&self) -> &[(i64, i64)] {
        &self.intervals
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns true if this set holds every `i64`.
    pub fn is_all(&self) -> bool {
        self.intervals == [(i64::MIN, i64::MAX)]
    }

    pub fn min(&self) -> Option<i64> {
        self.intervals.first().map(|&(lo, _)| lo)
    }

    pub fn max(&self) -> Option<i64> {
        self.intervals.last().map(|&(_, hi)| hi)
    }

    /// If this set holds exactly one value, return it.
    pub fn as_point(&self) -> Option<i64> {
        match self.intervals.as_slice() {
            [(lo, hi)] if lo == hi => Some(*lo),
            _ => None,
        }
    }

    /// The smallest single interval containing this set.
    pub fn hull(&self) -> LongRangeSet {
        match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => LongRangeSet::range(lo, hi),
            _ => LongRangeSet::empty(),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.intervals
            .binary_search_by(|&(lo, hi)| {
                if hi < value {
                    std::cmp::Ordering::Less
                } else if lo > value {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Returns true if this set and `other` share at least one value.
    pub fn intersects(&self, other: &LongRangeSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let (llo, lhi) = self.intervals[i];
            let (rlo, rhi) = other.intervals[j];
            if max(llo, rlo) <= min(lhi, rhi) {
                return true;
            }
            if lhi < rhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Every value in this set, or in `other`.
    pub fn union(&self, other: &LongRangeSet) -> LongRangeSet {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        LongRangeSet::from_intervals(
            self.intervals
                .iter()
                .chain(other.intervals.iter())
                .cloned(),
        )
    }

    /// Every value in both this set, and `other`.
    pub fn intersect(&self, other: &LongRangeSet) -> LongRangeSet {
        let mut intervals = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let (llo, lhi) = self.intervals[i];
            let (rlo, rhi) = other.intervals[j];
            let lo = max(llo, rlo);
            let hi = min(lhi, rhi);
            if lo <= hi {
                intervals.push((lo, hi));
            }
            if lhi < rhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        // Two intersections can only be adjacent if both operands hold the
        // values between them in one interval, so this is already canonical.
        LongRangeSet { intervals }
    }

    /// Every value in this set which is not in `other`.
    pub fn subtract(&self, other: &LongRangeSet) -> LongRangeSet {
        if other.is_empty() {
            return self.clone();
        }
        self.intersect(&other.negate())
    }

    /// The complement of this set over every `i64`.
    pub fn negate(&self) -> LongRangeSet {
        let mut intervals = Vec::with_capacity(self.intervals.len() + 1);
        // The lowest value not yet known to be covered. None once i64::MAX
        // is covered.
        let mut next = Some(i64::MIN);
        for &(lo, hi) in &self.intervals {
            if let Some(n) = next {
                if lo > n {
                    intervals.push((n, lo - 1));
                }
            }
            next = hi.checked_add(1);
        }
        if let Some(n) = next {
            intervals.push((n, i64::MAX));
        }
        LongRangeSet { intervals }
    }

    /// The complement of this set within `domain`.
    pub fn complement_in(&self, domain: &LongRangeSet) -> LongRangeSet {
        domain.subtract(self)
    }

    /// Every `x` for which `x op y` holds for at least one `y` in this set.
    ///
    /// Returns `None` if `op` is not a comparison.
    pub fn from_relation(op: BinaryOp, other: &LongRangeSet) -> Option<LongRangeSet> {
        let (lo, hi) = match (other.min(), other.max()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return op.is_comparison().then(LongRangeSet::empty),
        };
        Some(match op {
            BinaryOp::Eq => other.clone(),
            BinaryOp::Ne => match other.as_point() {
                Some(point) => LongRangeSet::point(point).negate(),
                None => LongRangeSet::all(),
            },
            BinaryOp::Lt => match hi.checked_sub(1) {
                Some(hi) => LongRangeSet::range(i64::MIN, hi),
                None => LongRangeSet::empty(),
            },
            BinaryOp::Le => LongRangeSet::range(i64::MIN, hi),
            BinaryOp::Gt => match lo.checked_add(1) {
                Some(lo) => LongRangeSet::range(lo, i64::MAX),
                None => LongRangeSet::empty(),
            },
            BinaryOp::Ge => LongRangeSet::range(lo, i64::MAX),
            _ => return None,
        })
    }

    /// Apply `op` to every pair of intervals, where `op` returns `None` on
    /// overflow.
    fn pairwise<F>(&self, other: &LongRangeSet, op: F) -> LongRangeSet
    where
        F: Fn((i64, i64), (i64, i64)) -> Option<(i64, i64)>,
    {
        if self.is_empty() || other.is_empty() {
            return LongRangeSet::empty();
        }
        if self.interval_count() * other.interval_count() > MAX_ARITHMETIC_PAIRS {
            return self.hull().pairwise(&other.hull(), op);
        }
        let mut intervals = Vec::with_capacity(self.interval_count() * other.interval_count());
        for &l in &self.intervals {
            for &r in &other.intervals {
                match op(l, r) {
                    Some(interval) => intervals.push(interval),
                    None => return LongRangeSet::all(),
                }
            }
        }
        LongRangeSet::from_intervals(intervals)
    }

    fn points(&self, other: &LongRangeSet) -> Option<(i64, i64)> {
        Some((self.as_point()?, other.as_point()?))
    }

    /// `{x + y}`, wrapping like a 64-bit machine integer.
    pub fn add(&self, other: &LongRangeSet) -> LongRangeSet {
        if let Some((l, r)) = self.points(other) {
            return LongRangeSet::point(l.wrapping_add(r));
        }
        self.pairwise(other, |(llo, lhi), (rlo, rhi)| {
            Some((llo.checked_add(rlo)?, lhi.checked_add(rhi)?))
        })
    }

    /// `{x - y}`, wrapping like a 64-bit machine integer.
    pub fn sub(&self, other: &LongRangeSet) -> LongRangeSet {
        if let Some((l, r)) = self.points(other) {
            return LongRangeSet::point(l.wrapping_sub(r));
        }
        self.pairwise(other, |(llo, lhi), (rlo, rhi)| {
            Some((llo.checked_sub(rhi)?, lhi.checked_sub(rlo)?))
        })
    }

    /// `{x * y}`, wrapping like a 64-bit machine integer.
    pub fn mul(&self, other: &LongRangeSet) -> LongRangeSet {
        if let Some((l, r)) = self.points(other) {
            return LongRangeSet::point(l.wrapping_mul(r));
        }
        self.pairwise(other, |(llo, lhi), (rlo, rhi)| {
            let corners = [
                llo.checked_mul(rlo)?,
                llo.checked_mul(rhi)?,
                lhi.checked_mul(rlo)?,
                lhi.checked_mul(rhi)?,
            ];
            Some((
                corners.iter().cloned().min()?,
                corners.iter().cloned().max()?,
            ))
        })
    }

    /// `{x / y}` for every non-zero `y`, truncating toward zero. Division by
    /// zero produces no value.
    pub fn div(&self, other: &LongRangeSet) -> LongRangeSet {
        let divisor = other.subtract(&LongRangeSet::point(0));
        if let Some((l, r)) = self.points(&divisor) {
            return LongRangeSet::point(l.wrapping_div(r));
        }
        // Within one sign of the divisor, division is monotonic in both
        // operands, so the corners bound the result.
        let negative = divisor.intersect(&LongRangeSet::range(i64::MIN, -1));
        let positive = divisor.intersect(&LongRangeSet::range(1, i64::MAX));
        let quotient = |(llo, lhi): (i64, i64), (rlo, rhi): (i64, i64)| {
            let corners = [
                llo.checked_div(rlo)?,
                llo.checked_div(rhi)?,
                lhi.checked_div(rlo)?,
                lhi.checked_div(rhi)?,
            ];
            Some((
                corners.iter().cloned().min()?,
                corners.iter().cloned().max()?,
            ))
        };
        self.pairwise(&negative, quotient)
            .union(&self.pairwise(&positive, quotient))
    }

    /// `{x % y}` for every non-zero `y`. The result takes the sign of the
    /// dividend.
    pub fn rem(&self, other: &LongRangeSet) -> LongRangeSet {
        let divisor = other.subtract(&LongRangeSet::point(0));
        if self.is_empty() || divisor.is_empty() {
            return LongRangeSet::empty();
        }
        if let Some((l, r)) = self.points(&divisor) {
            return LongRangeSet::point(l.wrapping_rem(r));
        }
        let magnitude = |v: i64| v.checked_abs().unwrap_or(i64::MAX);
        let modulus = max(
            magnitude(divisor.min().unwrap_or(0)),
            magnitude(divisor.max().unwrap_or(0)),
        ) - 1;
        let (lo, hi) = match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return LongRangeSet::empty(),
        };
        if lo >= 0 {
            LongRangeSet::range(0, min(hi, modulus))
        } else if hi <= 0 {
            LongRangeSet::range(max(lo, -modulus), 0)
        } else {
            LongRangeSet::range(max(lo, -modulus), min(hi, modulus))
        }
    }

    /// `{-x}`, wrapping like a 64-bit machine integer, so `-i64::MIN` is
    /// `i64::MIN`.
    pub fn unary_minus(&self) -> LongRangeSet {
        let mut intervals = Vec::with_capacity(self.intervals.len() + 1);
        for &(lo, hi) in &self.intervals {
            let lo = if lo == i64::MIN {
                intervals.push((i64::MIN, i64::MIN));
                if hi == i64::MIN {
                    continue;
                }
                lo + 1
            } else {
                lo
            };
            intervals.push((-hi, -lo));
        }
        LongRangeSet::from_intervals(intervals)
    }

    /// `{!x}`, the bitwise complement.
    pub fn bit_not(&self) -> LongRangeSet {
        LongRangeSet::from_intervals(self.intervals.iter().map(|&(lo, hi)| (!hi, !lo)))
    }

    /// `{x & y}`. Exact for single values, bounded when either side is
    /// non-negative.
    pub fn bit_and(&self, other: &LongRangeSet) -> LongRangeSet {
        if self.is_empty() || other.is_empty() {
            return LongRangeSet::empty();
        }
        if let Some((l, r)) = self.points(other) {
            return LongRangeSet::point(l & r);
        }
        let non_negative_max = |set: &LongRangeSet| match set.min() {
            Some(lo) if lo >= 0 => set.max(),
            _ => None,
        };
        match (non_negative_max(self), non_negative_max(other)) {
            (Some(l), Some(r)) => LongRangeSet::range(0, min(l, r)),
            (Some(bound), None) | (None, Some(bound)) => LongRangeSet::range(0, bound),
            (None, None) => LongRangeSet::all(),
        }
    }

    /// `{x | y}` or `{x ^ y}`. Exact for single values, bounded when both
    /// sides are non-negative.
    fn bit_or_xor<F>(&self, other: &LongRangeSet, op: F) -> LongRangeSet
    where
        F: Fn(i64, i64) -> i64,
    {
        if self.is_empty() || other.is_empty() {
            return LongRangeSet::empty();
        }
        if let Some((l, r)) = self.points(other) {
            return LongRangeSet::point(op(l, r));
        }
        match (self.min(), other.min()) {
            (Some(llo), Some(rlo)) if llo >= 0 && rlo >= 0 => {
                let highest = max(self.max().unwrap_or(0), other.max().unwrap_or(0));
                let mask = match highest {
                    0 => 0,
                    highest => (u64::MAX >> highest.leading_zeros()) as i64,
                };
                LongRangeSet::range(0, mask)
            }
            _ => LongRangeSet::all(),
        }
    }

    pub fn bit_or(&self, other: &LongRangeSet) -> LongRangeSet {
        self.bit_or_xor(other, |l, r| l | r)
    }

    pub fn bit_xor(&self, other: &LongRangeSet) -> LongRangeSet {
        self.bit_or_xor(other, |l, r| l ^ r)
    }

    /// `{x << y}`, the shift distance masked to six bits.
    pub fn shl(&self, other: &LongRangeSet) -> LongRangeSet {
        if self.is_empty() || other.is_empty() {
            return LongRangeSet::empty();
        }
        match self.points(other) {
            Some((l, r)) => LongRangeSet::point(l.wrapping_shl((r & 63) as u32)),
            None => LongRangeSet::all(),
        }
    }

    /// `{x >> y}`, an arithmetic shift with the distance masked to six bits.
    pub fn shr(&self, other: &LongRangeSet) -> LongRangeSet {
        if self.is_empty() || other.is_empty() {
            return LongRangeSet::empty();
        }
        match other.as_point() {
            // Arithmetic shift by a fixed distance is monotonic.
            Some(distance) => {
                let distance = (distance & 63) as u32;
                LongRangeSet::from_intervals(
                    self.intervals
                        .iter()
                        .map(|&(lo, hi)| (lo >> distance, hi >> distance)),
                )
            }
            None => LongRangeSet::all(),
        }
    }
}

impl Default for LongRangeSet {
    fn default() -> LongRangeSet {
        LongRangeSet::empty()
    }
}

impl From<Vec<(i64, i64)>> for LongRangeSet {
    fn from(intervals: Vec<(i64, i64)>) -> LongRangeSet {
        LongRangeSet::from_intervals(intervals)
    }
}

impl From<LongRangeSet> for Vec<(i64, i64)> {
    fn from(set: LongRangeSet) -> Vec<(i64, i64)> {
        set.intervals
    }
}

impl fmt::Display for LongRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn bound(value: i64) -> String {
            match value {
                i64::MIN => "MIN".to_string(),
                i64::MAX => "MAX".to_string(),
                value => value.to_string(),
            }
        }
        write!(
            f,
            "{{{}}}",
            self.intervals
                .iter()
                .map(|&(lo, hi)| if lo == hi {
                    bound(lo)
                } else {
                    format!("{}..{}", bound(lo), bound(hi))
                })
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}
