use itertools::Itertools;
use std::{collections::HashMap, ops::AddAssign};

/// Missed and extra target counts keyed by surface form (with the POS tag
/// appended for single tokens) and by bare POS tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    pub miss: HashMap<String, usize>,
    pub extra: HashMap<String, usize>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_miss(&mut self, key: impl Into<String>) {
        *self.miss.entry(key.into()).or_default() += 1;
    }

    pub fn add_extra(&mut self, key: impl Into<String>) {
        *self.extra.entry(key.into()).or_default() += 1;
    }

    pub fn top_misses(&self, n: usize) -> Vec<(&str, usize)> {
        top(&self.miss, n)
    }

    pub fn top_extras(&self, n: usize) -> Vec<(&str, usize)> {
        top(&self.extra, n)
    }
}

fn top(counter: &HashMap<String, usize>, n: usize) -> Vec<(&str, usize)> {
    counter
        .iter()
        .map(|(key, count)| (key.as_str(), *count))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(n)
        .collect()
}

impl AddAssign<&ErrorTally> for ErrorTally {
    fn add_assign(&mut self, other: &ErrorTally) {
        for (key, count) in &other.miss {
            *self.miss.entry(key.clone()).or_default() += count;
        }
        for (key, count) in &other.extra {
            *self.extra.entry(key.clone()).or_default() += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_sorted_by_count_then_key() {
        let mut tally = ErrorTally::new();
        for key in ["of_PRP", "NN", "NN", "in_PRP", "in_PRP", "PRP", "PRP", "PRP"] {
            tally.add_miss(key);
        }
        assert_eq!(
            tally.top_misses(3),
            vec![("PRP", 3), ("NN", 2), ("in_PRP", 2)]
        );
        assert!(tally.top_extras(5).is_empty());
    }

    #[test]
    fn test_add_assign_merges_counts() {
        let mut first = ErrorTally::new();
        first.add_extra("roof_NN1");
        let mut second = ErrorTally::new();
        second.add_extra("roof_NN1");
        second.add_miss("VVD");
        first += &second;
        assert_eq!(first.extra["roof_NN1"], 2);
        assert_eq!(first.miss["VVD"], 1);
    }
}
