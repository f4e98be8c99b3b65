//! Sentence-level scoring of a predicted frame-semantic parse against gold.
//!
//! Targets are compared both token by token and span by span. The gold
//! side of target identification is not just the annotated frame targets:
//! every token that is neither covered by an annotated target nor exempted
//! by the WSL/NER layers is a required single-token target as well.
//! Frames and arguments are then compared over all targets and over the
//! targets both sides agree on, and a final row rolls frame and labeled
//! argument credit into one score.

use super::{
    core_status::CoreStatus,
    error::{ScoreError, SpanError},
    record::{FrameAnnotation, SentenceRecord},
    span::{Adjacency, Span},
    stats::{Category, StatsTable},
    tally::ErrorTally,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const DAY_AND_MONTH_NAMES: [&str; 19] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const FRAME_POINTS: f64 = 1.0;

/// Day and month names plus their three-letter abbreviations, with and
/// without a trailing period.
pub fn default_date_names() -> HashSet<String> {
    let mut names = HashSet::new();
    for name in DAY_AND_MONTH_NAMES {
        names.insert(name.to_string());
        names.insert(name[..3].to_string());
        names.insert(format!("{}.", &name[..3]));
    }
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenCheck {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub adjacency: Adjacency,
    pub core_points: f64,
    /// Credit for a matched role that is not core, in the partial credit rows.
    pub non_core_points: f64,
    pub date_names: HashSet<String>,
    /// Lower-case NER types that evoke frames regardless of their text.
    pub frame_evoking_ner: HashSet<String>,
    pub token_check: TokenCheck,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            adjacency: Adjacency::Keep,
            core_points: 1.0,
            non_core_points: 0.5,
            date_names: default_date_names(),
            frame_evoking_ner: HashSet::from(["wea".to_string()]),
            token_check: TokenCheck::Strict,
        }
    }
}

type FrameName = Option<String>;
type ArgSpan = (Span, Span);
type FramedArgSpan = (Span, FrameName, Span);
type LabeledArg = (Span, FrameName, Span, String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Credit {
    Frame(Span, FrameName),
    Argument(LabeledArg),
}

#[derive(Debug, Clone, Default)]
struct FrameInstance {
    name: FrameName,
    args: BTreeMap<Span, String>,
}

/// One side's frames, keyed by target span.
#[derive(Debug, Clone, Default)]
struct Parse {
    targets: Vec<Span>,
    frames: BTreeMap<Span, FrameInstance>,
    coverage: HashSet<usize>,
}

impl Parse {
    fn has_frame_names(&self) -> bool {
        self.frames
            .values()
            .any(|frame| frame.name.as_deref().is_some_and(|name| !name.is_empty()))
    }

    fn has_args(&self) -> bool {
        self.frames.values().any(|frame| !frame.args.is_empty())
    }

    fn target_spans(&self) -> HashSet<Span> {
        self.frames.keys().cloned().collect()
    }

    fn frame_pairs(&self) -> HashSet<(Span, FrameName)> {
        self.frames
            .iter()
            .map(|(target, frame)| (target.clone(), frame.name.clone()))
            .collect()
    }

    fn arg_spans(&self) -> HashSet<ArgSpan> {
        self.frames
            .iter()
            .flat_map(|(target, frame)| {
                frame
                    .args
                    .keys()
                    .map(move |arg| (target.clone(), arg.clone()))
            })
            .collect()
    }

    fn framed_arg_spans(&self) -> HashSet<FramedArgSpan> {
        self.frames
            .iter()
            .flat_map(|(target, frame)| {
                frame
                    .args
                    .keys()
                    .map(move |arg| (target.clone(), frame.name.clone(), arg.clone()))
            })
            .collect()
    }

    fn restricted_to(&self, targets: &HashSet<Span>) -> Parse {
        let frames: BTreeMap<Span, FrameInstance> = self
            .frames
            .iter()
            .filter(|(target, _)| targets.contains(*target))
            .map(|(target, frame)| (target.clone(), frame.clone()))
            .collect();
        Parse {
            targets: self
                .targets
                .iter()
                .filter(|target| targets.contains(*target))
                .cloned()
                .collect(),
            coverage: frames.keys().flat_map(|target| target.iter()).collect(),
            frames,
        }
    }
}

/// Gold spans that need not be targets, and POS tags for diagnostics.
#[derive(Debug, Default)]
struct Exclusions {
    wsl: HashSet<Span>,
    excluded: HashSet<Span>,
    pos: HashMap<Span, String>,
}

struct ArgCategories {
    spans: Category,
    framed_spans: Category,
    labeled: Category,
    core: Category,
}

const ALL_TARGETS: ArgCategories = ArgCategories {
    spans: Category::ArgSpansWithCorrectTargets,
    framed_spans: Category::ArgSpansWithCorrectTargetsAndFrames,
    labeled: Category::LabeledArgsWithCorrectTargetsAndFrames,
    core: Category::CoreArgsWithCorrectTargetsAndFrames,
};

const CORRECT_TARGETS: ArgCategories = ArgCategories {
    spans: Category::ArgSpansCorrectTargetsOnly,
    framed_spans: Category::ArgSpansCorrectTargetsAndFramesOnly,
    labeled: Category::LabeledArgsCorrectTargetsAndFramesOnly,
    core: Category::CoreArgsCorrectTargetsAndFramesOnly,
};

#[derive(Debug, Clone, Default)]
pub struct SentenceScore {
    pub stats: StatsTable,
    pub errors: ErrorTally,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScorerConfig,
    core_status: CoreStatus,
}

impl Scorer {
    pub fn new(config: ScorerConfig, core_status: CoreStatus) -> Self {
        Self {
            config,
            core_status,
        }
    }

    pub fn score_sentence(
        &self,
        index: usize,
        gold: &SentenceRecord,
        pred: &SentenceRecord,
    ) -> Result<SentenceScore, ScoreError> {
        self.check_tokens(index, gold, pred)?;
        self.score_aligned(index, gold, pred)
            .map_err(|source| ScoreError::Span { index, source })
    }

    fn check_tokens(
        &self,
        index: usize,
        gold: &SentenceRecord,
        pred: &SentenceRecord,
    ) -> Result<(), ScoreError> {
        if gold.tokens == pred.tokens {
            return Ok(());
        }
        let reason = if gold.tokens.len() != pred.tokens.len() {
            format!(
                "{} gold tokens vs {} predicted tokens",
                gold.tokens.len(),
                pred.tokens.len()
            )
        } else {
            let position = gold
                .tokens
                .iter()
                .zip(&pred.tokens)
                .position(|(g, p)| g != p)
                .unwrap_or(0);
            format!(
                "token {} is {:?} in gold but {:?} in predictions",
                position, gold.tokens[position], pred.tokens[position]
            )
        };
        match self.config.token_check {
            TokenCheck::Strict => Err(ScoreError::InputMismatch { index, reason }),
            TokenCheck::Lenient => {
                log::warn!(
                    "Sentence {}: tokens differ ({}), scoring against gold tokens",
                    index,
                    reason
                );
                Ok(())
            }
        }
    }

    fn score_aligned(
        &self,
        index: usize,
        gold: &SentenceRecord,
        pred: &SentenceRecord,
    ) -> Result<SentenceScore, SpanError> {
        let tokens = &gold.tokens;
        let num_tokens = tokens.len();
        let mut stats = StatsTable::new();
        let mut errors = ErrorTally::new();

        let pred_parse = self.parse_frames(&pred.frames, num_tokens)?;
        let gold_parse = self.parse_frames(&gold.frames, num_tokens)?;
        let mut exclusions = self.non_targets(gold, num_tokens)?;
        reconcile_exclusions(index, gold, &gold_parse, &mut exclusions)?;

        let excluded_tokens: HashSet<usize> = exclusions
            .excluded
            .iter()
            .flat_map(|span| span.iter())
            .collect();
        let gold_target_coverage: HashSet<usize> = (0..num_tokens)
            .filter(|i| !excluded_tokens.contains(i))
            .collect();
        let mut gold_target_spans = gold_parse.target_spans();
        gold_target_spans.extend(
            gold_target_coverage
                .iter()
                .filter(|i| !gold_parse.coverage.contains(*i))
                .map(|&i| Span::token(i)),
        );
        let pred_target_spans = pred_parse.target_spans();

        stats.record_counted(
            Category::TargetsByToken,
            num_tokens,
            &gold_target_coverage,
            &pred_parse.coverage,
        );
        stats.record_sets(
            Category::TargetsBySpan,
            &gold_target_spans,
            &pred_target_spans,
        );

        for span in gold_target_spans.difference(&pred_target_spans) {
            let (key, pos) = error_keys(span, tokens, &exclusions.pos)?;
            if let Some(pos) = pos {
                errors.add_miss(pos);
            }
            errors.add_miss(key);
        }
        for span in pred_target_spans.difference(&gold_target_spans) {
            let (key, pos) = error_keys(span, tokens, &exclusions.pos)?;
            if let Some(pos) = pos {
                errors.add_extra(pos);
            }
            errors.add_extra(key);
        }

        if gold_parse.has_frame_names() || pred_parse.has_frame_names() {
            self.score_frames(&gold_parse, &pred_parse, &mut stats);
        }

        Ok(SentenceScore { stats, errors })
    }

    fn score_frames(&self, gold: &Parse, pred: &Parse, stats: &mut StatsTable) {
        stats.record_sets(
            Category::FramesWithCorrectTargetsIgnoreP,
            &gold.frame_pairs(),
            &pred.frame_pairs(),
        );

        let with_args = gold.has_args() || pred.has_args();
        let mut gold_total: HashMap<Credit, f64> = HashMap::new();
        let mut pred_total: HashMap<Credit, f64> = HashMap::new();
        if with_args {
            let (gold_labeled, pred_labeled) =
                self.score_arguments(gold, pred, &ALL_TARGETS, stats);
            gold_total.extend(
                gold_labeled
                    .into_iter()
                    .map(|(arg, points)| (Credit::Argument(arg), points)),
            );
            pred_total.extend(
                pred_labeled
                    .into_iter()
                    .map(|(arg, points)| (Credit::Argument(arg), points)),
            );
        }
        gold_total.extend(
            gold.frame_pairs()
                .into_iter()
                .map(|(target, name)| (Credit::Frame(target, name), FRAME_POINTS)),
        );
        pred_total.extend(
            pred.frame_pairs()
                .into_iter()
                .map(|(target, name)| (Credit::Frame(target, name), FRAME_POINTS)),
        );

        let correct_targets: HashSet<Span> = gold
            .frames
            .keys()
            .filter(|target| pred.frames.contains_key(*target))
            .cloned()
            .collect();
        let gold_correct = gold.restricted_to(&correct_targets);
        let pred_correct = pred.restricted_to(&correct_targets);
        assert!(
            gold_correct.frames.len() == correct_targets.len()
                && pred_correct.frames.len() == correct_targets.len(),
            "restricted frames disagree with correct targets: {} gold, {} predicted, {} targets",
            gold_correct.frames.len(),
            pred_correct.frames.len(),
            correct_targets.len()
        );
        stats.record_counted(
            Category::FramesCorrectTargetsOnly,
            correct_targets.len(),
            &gold_correct.frame_pairs(),
            &pred_correct.frame_pairs(),
        );

        if with_args {
            self.score_arguments(&gold_correct, &pred_correct, &CORRECT_TARGETS, stats);
        }

        stats.record_weighted(Category::Total, &gold_total, &pred_total);
    }

    /// Records the four argument rows and returns the partial credit maps.
    fn score_arguments(
        &self,
        gold: &Parse,
        pred: &Parse,
        categories: &ArgCategories,
        stats: &mut StatsTable,
    ) -> (HashMap<LabeledArg, f64>, HashMap<LabeledArg, f64>) {
        // Unlabeled rows give every span one point regardless of role
        stats.record_sets(categories.spans, &gold.arg_spans(), &pred.arg_spans());
        stats.record_sets(
            categories.framed_spans,
            &gold.framed_arg_spans(),
            &pred.framed_arg_spans(),
        );

        let non_core = self.config.non_core_points;
        let gold_labeled = self.labeled_args(gold, non_core);
        let pred_labeled = self.labeled_args(pred, non_core);
        stats.record_weighted(categories.labeled, &gold_labeled, &pred_labeled);
        stats.record_weighted(
            categories.core,
            &self.labeled_args(gold, 0.0),
            &self.labeled_args(pred, 0.0),
        );
        (gold_labeled, pred_labeled)
    }

    fn labeled_args(&self, parse: &Parse, non_core_points: f64) -> HashMap<LabeledArg, f64> {
        parse
            .frames
            .iter()
            .flat_map(|(target, frame)| {
                frame.args.iter().map(move |(span, role)| {
                    let points = self.arg_points(frame.name.as_deref(), role, non_core_points);
                    (
                        (target.clone(), frame.name.clone(), span.clone(), role.clone()),
                        points,
                    )
                })
            })
            .collect()
    }

    fn arg_points(&self, frame: Option<&str>, role: &str, non_core_points: f64) -> f64 {
        match frame {
            Some(frame) if self.core_status.is_core(frame, role) => self.config.core_points,
            _ => non_core_points,
        }
    }

    fn parse_frames(&self, frames: &[FrameAnnotation], num_tokens: usize) -> Result<Parse, SpanError> {
        let adjacency = self.config.adjacency;
        let mut parse = Parse::default();
        for frame in frames {
            let target = frame.target_span(adjacency)?;
            target.ensure_within(num_tokens)?;
            let mut args = BTreeMap::new();
            // Only the top-ranked annotation set counts
            for element in frame.top_frame_elements() {
                let span = element.span(adjacency)?;
                span.ensure_within(num_tokens)?;
                args.insert(span, element.name.clone());
            }
            parse.coverage.extend(target.iter());
            parse.targets.push(target.clone());
            parse.frames.insert(
                target,
                FrameInstance {
                    name: frame.target.name.clone(),
                    args,
                },
            );
        }
        Ok(parse)
    }

    fn non_targets(&self, gold: &SentenceRecord, num_tokens: usize) -> Result<Exclusions, SpanError> {
        let mut exclusions = Exclusions::default();
        for entry in &gold.wsl {
            let span = entry.span()?;
            span.ensure_within(num_tokens)?;
            exclusions.wsl.insert(span);
        }

        let mut ner: HashMap<Span, (String, String)> = HashMap::new();
        for entry in &gold.ner {
            let span = entry.span()?;
            span.ensure_within(num_tokens)?;
            ner.insert(span, (entry.name.to_lowercase(), entry.text.to_lowercase()));
        }

        for entry in &gold.pos {
            exclusions
                .pos
                .insert(entry.span()?, entry.name.to_uppercase());
        }

        exclusions.excluded = exclusions.wsl.clone();
        exclusions.excluded.extend(
            ner.into_iter()
                .filter(|(_, (kind, text))| !self.is_frame_evoking_entity(kind, text))
                .map(|(span, _)| span),
        );
        Ok(exclusions)
    }

    fn is_frame_evoking_entity(&self, kind: &str, text: &str) -> bool {
        self.config.frame_evoking_ner.contains(kind)
            || (kind == "date" && self.config.date_names.contains(text))
    }
}

/// A WSL span that is also a gold frame target is an annotation error; the
/// gold frame wins and the span stops being excluded.
fn reconcile_exclusions(
    index: usize,
    gold: &SentenceRecord,
    parse: &Parse,
    exclusions: &mut Exclusions,
) -> Result<(), SpanError> {
    let tokens = &gold.tokens;
    for target in &parse.targets {
        if exclusions.excluded.contains(target) {
            if exclusions.wsl.contains(target) {
                log::warn!(
                    "Sentence {}: WSL bug: {} {:?}",
                    index,
                    target,
                    target.text(tokens)?
                );
                exclusions.excluded.remove(target);
            } else {
                let entity_types: BTreeSet<&str> = gold
                    .ner
                    .iter()
                    .filter(|entry| entry.start == target.minstart())
                    .map(|entry| entry.name.as_str())
                    .collect();
                log::debug!(
                    "Sentence {}: gold target {:?} is a named entity {:?}",
                    index,
                    target.text(tokens)?,
                    entity_types
                );
            }
        } else if target.len() > 1 {
            for excluded in exclusions.excluded.iter().sorted() {
                if target.overlaps(excluded) {
                    log::warn!(
                        "Sentence {}: target span {} {:?} overlaps with excluded span {} {:?}",
                        index,
                        target,
                        target.text(tokens)?,
                        excluded,
                        excluded.text(tokens)?
                    );
                }
            }
        }
    }
    Ok(())
}

/// Surface key for a missed or extra target, plus its POS tag when the
/// target is a single token.
fn error_keys(
    span: &Span,
    tokens: &[String],
    poses: &HashMap<Span, String>,
) -> Result<(String, Option<String>), SpanError> {
    let text = span.text(tokens)?;
    if span.len() == 1 {
        let pos = poses.get(span).map_or("?", String::as_str);
        Ok((format!("{}_{}", text, pos), Some(pos.to_string())))
    } else {
        Ok((text, None))
    }
}
