//! Per-category evaluation counts and the ratios derived from them.
//!
//! [`StatsTable`] only ever holds counts, so tables from different
//! sentences (or from different worker threads) can be added freely.
//! Ratios live in a separate [`RatesTable`] computed once the counts are
//! final, which gives corpus-level micro averages and keeps a category
//! with empty denominators undefined instead of zero.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
    ops::{Add, AddAssign},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    TargetsByToken,
    TargetsBySpan,
    FramesWithCorrectTargetsIgnoreP,
    ArgSpansWithCorrectTargets,
    ArgSpansWithCorrectTargetsAndFrames,
    LabeledArgsWithCorrectTargetsAndFrames,
    CoreArgsWithCorrectTargetsAndFrames,
    FramesCorrectTargetsOnly,
    ArgSpansCorrectTargetsOnly,
    ArgSpansCorrectTargetsAndFramesOnly,
    LabeledArgsCorrectTargetsAndFramesOnly,
    CoreArgsCorrectTargetsAndFramesOnly,
    Total,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::TargetsByToken,
        Category::TargetsBySpan,
        Category::FramesWithCorrectTargetsIgnoreP,
        Category::ArgSpansWithCorrectTargets,
        Category::ArgSpansWithCorrectTargetsAndFrames,
        Category::LabeledArgsWithCorrectTargetsAndFrames,
        Category::CoreArgsWithCorrectTargetsAndFrames,
        Category::FramesCorrectTargetsOnly,
        Category::ArgSpansCorrectTargetsOnly,
        Category::ArgSpansCorrectTargetsAndFramesOnly,
        Category::LabeledArgsCorrectTargetsAndFramesOnly,
        Category::CoreArgsCorrectTargetsAndFramesOnly,
        Category::Total,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::TargetsByToken => "Targets by token",
            Category::TargetsBySpan => "Targets by span",
            Category::FramesWithCorrectTargetsIgnoreP => "Frames with correct targets (ignore P)",
            Category::ArgSpansWithCorrectTargets => "Argument spans with correct targets",
            Category::ArgSpansWithCorrectTargetsAndFrames => {
                "Argument spans with correct targets and frames"
            }
            Category::LabeledArgsWithCorrectTargetsAndFrames => {
                "Arguments, labeled, with correct targets and frames"
            }
            Category::CoreArgsWithCorrectTargetsAndFrames => {
                "Core arguments, labeled, with correct targets and frames"
            }
            Category::FramesCorrectTargetsOnly => "Frames (correct targets only)",
            Category::ArgSpansCorrectTargetsOnly => "Argument spans (correct targets only)",
            Category::ArgSpansCorrectTargetsAndFramesOnly => {
                "Argument spans (correct targets and frames only)"
            }
            Category::LabeledArgsCorrectTargetsAndFramesOnly => {
                "Arguments, labeled (correct targets and frames only)"
            }
            Category::CoreArgsCorrectTargetsAndFramesOnly => {
                "Core arguments, labeled (correct targets and frames only)"
            }
            Category::Total => "Total frames and labeled arguments",
        }
    }
}

/// Correctly classified items `T` out of `N` compared items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, other: Tally) -> Tally {
        Tally {
            correct: self.correct + other.correct,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Counts {
    pub numer: f64,
    pub p_denom: f64,
    pub r_denom: f64,
    /// Only present for categories that compare a known number of items.
    pub tally: Option<Tally>,
}

impl Counts {
    pub fn rates(&self) -> Rates {
        let precision = ratio(self.numer, self.p_denom);
        let recall = ratio(self.numer, self.r_denom);
        let f_score = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            _ => None,
        };
        let accuracy = self
            .tally
            .and_then(|t| ratio(t.correct as f64, t.total as f64));
        Rates {
            precision,
            recall,
            f_score,
            accuracy,
        }
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        let tally = match (self.tally, other.tally) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(t), None) | (None, Some(t)) => Some(t),
            (None, None) => None,
        };
        Counts {
            numer: self.numer + other.numer,
            p_denom: self.p_denom + other.p_denom,
            r_denom: self.r_denom + other.r_denom,
            tally,
        }
    }
}

fn ratio(numer: f64, denom: f64) -> Option<f64> {
    if denom == 0.0 {
        None
    } else {
        Some(numer / denom)
    }
}

/// Ratios of one category; `None` means undefined (a zero denominator).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rates {
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f_score: Option<f64>,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsTable {
    rows: BTreeMap<Category, Counts>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Option<&Counts> {
        self.rows.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &Counts)> {
        self.rows.iter().map(|(category, counts)| (*category, counts))
    }

    /// Compares two sets drawn from a universe of `total` items and records
    /// accuracy alongside precision and recall.
    pub fn record_counted<K>(
        &mut self,
        category: Category,
        total: usize,
        gold: &HashSet<K>,
        pred: &HashSet<K>,
    ) where
        K: Eq + Hash + Debug,
    {
        if !gold.is_empty() || !pred.is_empty() {
            assert!(
                total > 0,
                "{}: non-empty sets with no items: gold={:?} pred={:?}",
                category.label(),
                gold,
                pred
            );
        }
        let matched = gold.intersection(pred).count();
        let correct = if gold.len() == total && pred.len() == total {
            matched
        } else {
            let false_pos = pred.difference(gold).count();
            let false_neg = gold.difference(pred).count();
            assert!(
                false_pos + false_neg <= total,
                "{}: more errors than items ({} + {} > {})",
                category.label(),
                false_pos,
                false_neg,
                total
            );
            total - false_pos - false_neg
        };
        self.rows.insert(
            category,
            Counts {
                numer: matched as f64,
                p_denom: pred.len() as f64,
                r_denom: gold.len() as f64,
                tally: Some(Tally { correct, total }),
            },
        );
    }

    /// Compares two sets where every element is worth one point.
    pub fn record_sets<K>(&mut self, category: Category, gold: &HashSet<K>, pred: &HashSet<K>)
    where
        K: Eq + Hash,
    {
        self.rows.insert(
            category,
            Counts {
                numer: gold.intersection(pred).count() as f64,
                p_denom: pred.len() as f64,
                r_denom: gold.len() as f64,
                tally: None,
            },
        );
    }

    /// Compares two point-weighted maps. An element present on both sides
    /// must carry the same weight on both.
    pub fn record_weighted<K>(
        &mut self,
        category: Category,
        gold: &HashMap<K, f64>,
        pred: &HashMap<K, f64>,
    ) where
        K: Eq + Hash + Debug,
    {
        let mut numer = 0.0;
        for (item, gold_points) in gold {
            if let Some(pred_points) = pred.get(item) {
                assert!(
                    gold_points == pred_points,
                    "{}: {:?} is worth {} in gold but {} in predictions",
                    category.label(),
                    item,
                    gold_points,
                    pred_points
                );
                numer += gold_points;
            }
        }
        self.rows.insert(
            category,
            Counts {
                numer,
                p_denom: pred.values().sum(),
                r_denom: gold.values().sum(),
                tally: None,
            },
        );
    }

    /// Adds counts category by category; a category missing on one side
    /// counts as zero there. Ratios are not touched.
    pub fn combine(&self, other: &StatsTable) -> StatsTable {
        let mut result = self.clone();
        result += other;
        result
    }

    pub fn compute_ratios(&self) -> RatesTable {
        RatesTable {
            rows: self
                .rows
                .iter()
                .map(|(category, counts)| RateRow {
                    category: *category,
                    counts: *counts,
                    rates: counts.rates(),
                })
                .collect(),
        }
    }
}

impl AddAssign<&StatsTable> for StatsTable {
    fn add_assign(&mut self, other: &StatsTable) {
        for (category, counts) in &other.rows {
            let entry = self.rows.entry(*category).or_default();
            *entry = *entry + *counts;
        }
    }
}

impl Add for StatsTable {
    type Output = StatsTable;

    fn add(mut self, other: StatsTable) -> StatsTable {
        self += &other;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub category: Category,
    pub counts: Counts,
    pub rates: Rates,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatesTable {
    pub rows: Vec<RateRow>,
}

impl RatesTable {
    pub fn get(&self, category: Category) -> Option<&RateRow> {
        self.rows.iter().find(|row| row.category == category)
    }
}
