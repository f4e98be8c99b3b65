//! Token-index spans made of one or more disjoint half-open ranges.
//!
//! A [`Span`] is immutable once built and is used as a map key or set
//! element when comparing gold and predicted annotations. Equality is on
//! the range boundaries, so `Span(3,5)` and `Span(3,4, 4,5)` differ even
//! though they cover the same indices.

use super::error::SpanError;
use itertools::Itertools;
use std::{cmp::Ordering, fmt};

/// Whether end-to-start adjacent ranges are merged at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Adjacency {
    #[default]
    Keep,
    Join,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    // Sorted by start, pairwise disjoint, every range non-empty
    ranges: Vec<(usize, usize)>,
}

impl Span {
    /// Builds a span from flat `start, end, start, end, ...` bounds.
    pub fn new(bounds: &[usize]) -> Result<Self, SpanError> {
        Self::with_adjacency(bounds, Adjacency::Keep)
    }

    pub fn with_adjacency(bounds: &[usize], adjacency: Adjacency) -> Result<Self, SpanError> {
        let invalid = |reason: &str| SpanError::InvalidSpan {
            bounds: bounds.to_vec(),
            reason: reason.to_string(),
        };
        if bounds.is_empty() || bounds.len() % 2 != 0 {
            return Err(invalid("expected a positive even number of bounds"));
        }

        let mut pairs: Vec<(usize, usize)> = bounds.chunks(2).map(|c| (c[0], c[1])).collect();
        if pairs.iter().any(|&(start, end)| start >= end) {
            return Err(invalid("empty range"));
        }
        pairs.sort_unstable();

        let mut ranges: Vec<(usize, usize)> = Vec::with_capacity(pairs.len());
        for (start, end) in pairs {
            match ranges.last_mut() {
                Some(last) if start < last.1 => return Err(invalid("overlapping ranges")),
                Some(last) if adjacency == Adjacency::Join && start == last.1 => last.1 = end,
                _ => ranges.push((start, end)),
            }
        }
        Ok(Self { ranges })
    }

    /// Single-range span `[start, end)`.
    pub fn range(start: usize, end: usize) -> Result<Self, SpanError> {
        Self::new(&[start, end])
    }

    pub(crate) fn token(index: usize) -> Self {
        Self::token_range(index, index + 1)
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    pub fn minstart(&self) -> usize {
        self.ranges[0].0
    }

    pub fn maxstop(&self) -> usize {
        self.ranges[self.ranges.len() - 1].1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| start <= index && index < end)
    }

    /// Covered indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..end)
    }

    pub fn len(&self) -> usize {
        self.ranges.iter().map(|&(start, end)| end - start).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contiguous(&self) -> bool {
        self.maxstop() - self.minstart() == self.len()
    }

    pub fn subspans(&self) -> Vec<Span> {
        self.ranges
            .iter()
            .map(|&range| Span {
                ranges: vec![range],
            })
            .collect()
    }

    pub fn encompasses(&self, other: &Span) -> bool {
        other.iter().all(|i| self.contains(i))
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        other.iter().any(|i| self.contains(i))
    }

    /// Non-empty intersection where neither side contains the other.
    pub fn overlaps_partially(&self, other: &Span) -> bool {
        self.overlaps(other) && !self.encompasses(other) && !other.encompasses(self)
    }

    /// Joins two single-range spans that meet end to start, in either order.
    pub fn concat(&self, other: &Span) -> Result<Span, SpanError> {
        let non_adjacent = || SpanError::NonAdjacent(self.to_string(), other.to_string());
        match (self.ranges.as_slice(), other.ranges.as_slice()) {
            ([(a_start, a_end)], [(b_start, b_end)]) if a_end == b_start => {
                Ok(Span::token_range(*a_start, *b_end))
            }
            ([(a_start, a_end)], [(b_start, b_end)]) if b_end == a_start => {
                Ok(Span::token_range(*b_start, *a_end))
            }
            _ => Err(non_adjacent()),
        }
    }

    fn token_range(start: usize, end: usize) -> Span {
        Span {
            ranges: vec![(start, end)],
        }
    }

    pub fn ensure_within(&self, len: usize) -> Result<(), SpanError> {
        if self.maxstop() > len {
            return Err(SpanError::OutOfBounds {
                span: self.to_string(),
                len,
            });
        }
        Ok(())
    }

    /// Elements of `sequence` at the covered indices, in order.
    pub fn select<'a, T>(&self, sequence: &'a [T]) -> Result<Vec<&'a T>, SpanError> {
        self.ensure_within(sequence.len())?;
        Ok(self.iter().map(|i| &sequence[i]).collect())
    }

    /// Covered elements joined by a single space.
    pub fn text<S: AsRef<str>>(&self, sequence: &[S]) -> Result<String, SpanError> {
        let selected = self.select(sequence)?;
        Ok(selected.into_iter().map(AsRef::<str>::as_ref).join(" "))
    }
}

impl Ord for Span {
    fn cmp(&self, other: &Self) -> Ordering {
        self.minstart()
            .cmp(&other.minstart())
            .then_with(|| self.maxstop().cmp(&other.maxstop()))
            .then_with(|| self.ranges.cmp(&other.ranges))
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|(start, end)| format!("{},{}", start, end))
            .collect();
        write!(f, "Span({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rng, seq::SliceRandom, Rng};
    use std::collections::{BTreeSet, HashSet};

    fn random_disjoint_bounds(rng: &mut impl Rng) -> Vec<usize> {
        let mut bounds = Vec::new();
        let mut cursor = rng.random_range(0..4);
        for _ in 0..rng.random_range(1..5) {
            let start = cursor + rng.random_range(0..3);
            let end = start + rng.random_range(1..4);
            bounds.push(start);
            bounds.push(end);
            cursor = end;
        }
        bounds
    }

    #[test]
    fn test_span_contains_and_iter() {
        let s = Span::new(&[3, 6]).unwrap();
        assert!(s.contains(5));
        assert!(!s.contains(6));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(
            Span::new(&[9, 12, 3, 6]).unwrap().iter().collect::<Vec<_>>(),
            vec![3, 4, 5, 9, 10, 11]
        );
    }

    #[test]
    fn test_span_iter_is_restartable() {
        let s = Span::new(&[0, 2, 4, 5]).unwrap();
        let first: Vec<_> = s.iter().collect();
        let second: Vec<_> = s.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_span_iter_matches_sorted_union() {
        let mut rng = rng();
        for _ in 0..200 {
            let bounds = random_disjoint_bounds(&mut rng);
            let mut pairs: Vec<[usize; 2]> = bounds.chunks(2).map(|c| [c[0], c[1]]).collect();
            pairs.shuffle(&mut rng);
            let shuffled: Vec<usize> = pairs.iter().flatten().copied().collect();

            let expected: BTreeSet<usize> = pairs.iter().flat_map(|p| p[0]..p[1]).collect();
            for adjacency in [Adjacency::Keep, Adjacency::Join] {
                let span = Span::with_adjacency(&shuffled, adjacency).unwrap();
                let covered: Vec<usize> = span.iter().collect();
                assert_eq!(covered, expected.iter().copied().collect::<Vec<_>>());
                assert_eq!(span.len(), covered.len());
                assert!(span.encompasses(&span));
            }
        }
    }

    #[test]
    fn test_span_overlaps_symmetric() {
        let mut rng = rng();
        for _ in 0..200 {
            let a = Span::new(&random_disjoint_bounds(&mut rng)).unwrap();
            let b = Span::new(&random_disjoint_bounds(&mut rng)).unwrap();
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
            assert_eq!(a.overlaps_partially(&b), b.overlaps_partially(&a));
        }
    }

    #[test]
    fn test_span_overlapping_ranges_err() {
        let result = Span::new(&[3, 6, 5, 9]);
        assert!(matches!(result, Err(SpanError::InvalidSpan { .. })));
    }

    #[test]
    fn test_span_odd_or_empty_bounds_err() {
        assert!(matches!(Span::new(&[3]), Err(SpanError::InvalidSpan { .. })));
        assert!(matches!(Span::new(&[]), Err(SpanError::InvalidSpan { .. })));
        assert!(matches!(
            Span::new(&[4, 4]),
            Err(SpanError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn test_span_adjacency_policy() {
        let kept = Span::new(&[3, 4, 4, 6]).unwrap();
        assert_eq!(kept.ranges(), &[(3, 4), (4, 6)]);
        assert_ne!(kept, Span::range(3, 6).unwrap());

        let joined = Span::with_adjacency(&[4, 6, 3, 4], Adjacency::Join).unwrap();
        assert_eq!(joined, Span::range(3, 6).unwrap());
        assert!(joined.contiguous());
    }

    #[test]
    fn test_span_concat() {
        let a = Span::range(3, 6).unwrap();
        assert_eq!(
            a.concat(&Span::range(6, 9).unwrap()).unwrap(),
            Span::range(3, 9).unwrap()
        );
        assert_eq!(
            a.concat(&Span::range(0, 3).unwrap()).unwrap(),
            Span::range(0, 6).unwrap()
        );
        assert!(matches!(
            a.concat(&Span::range(0, 2).unwrap()),
            Err(SpanError::NonAdjacent(_, _))
        ));
        let multi = Span::new(&[0, 1, 6, 7]).unwrap();
        assert!(matches!(
            a.concat(&multi),
            Err(SpanError::NonAdjacent(_, _))
        ));
    }

    #[test]
    fn test_span_encompasses_and_partial_overlap() {
        let outer = Span::range(3, 6).unwrap();
        let inner = Span::range(3, 4).unwrap();
        let straddle = Span::range(5, 8).unwrap();
        let disjoint = Span::range(8, 9).unwrap();

        assert!(outer.encompasses(&inner));
        assert!(!inner.encompasses(&outer));
        assert!(!outer.overlaps_partially(&inner));
        assert!(outer.overlaps_partially(&straddle));
        assert!(!outer.overlaps(&disjoint));
        assert!(!outer.overlaps_partially(&disjoint));
    }

    #[test]
    fn test_span_properties() {
        let s = Span::new(&[9, 12, 3, 6]).unwrap();
        assert_eq!(s.minstart(), 3);
        assert_eq!(s.maxstop(), 12);
        assert_eq!(s.len(), 6);
        assert!(!s.contiguous());
        assert_eq!(
            s.subspans(),
            vec![Span::range(3, 6).unwrap(), Span::range(9, 12).unwrap()]
        );
        assert_eq!(s.to_string(), "Span(3,6, 9,12)");
    }

    #[test]
    fn test_span_hash_and_order() {
        let set: HashSet<Span> = [
            Span::range(1, 2).unwrap(),
            Span::new(&[1, 2]).unwrap(),
            Span::range(0, 2).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);

        let mut spans = vec![
            Span::range(2, 5).unwrap(),
            Span::range(0, 3).unwrap(),
            Span::range(0, 1).unwrap(),
        ];
        spans.sort();
        assert_eq!(
            spans,
            vec![
                Span::range(0, 1).unwrap(),
                Span::range(0, 3).unwrap(),
                Span::range(2, 5).unwrap(),
            ]
        );
    }

    #[test]
    fn test_span_projection() {
        let tokens = ["the", "old", "barn", "roof", "leaked"];
        let s = Span::new(&[1, 2, 3, 4]).unwrap();
        assert_eq!(s.select(&tokens).unwrap(), vec![&"old", &"roof"]);
        assert_eq!(s.text(&tokens).unwrap(), "old roof");
        assert!(matches!(
            Span::range(4, 6).unwrap().text(&tokens),
            Err(SpanError::OutOfBounds { len: 5, .. })
        ));
    }
}
