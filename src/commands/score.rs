use crate::cli::ScoreArgs;
use crate::eval::{
    report::{sentence_line, write_error_report, write_table},
    Adjacency, Category, CoreStatus, ScoreError, Scorer, ScorerConfig, SentenceRecord,
    SentenceScore, TokenCheck,
};
use crate::utils::{create_report_writer, open_paired_lines, PairError, Result, Side};
use rayon::{
    iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{io::Write, path::Path, time};

pub type SentencePair = (SentenceRecord, SentenceRecord);

pub fn score(args: ScoreArgs) -> Result<()> {
    let start_timer = time::Instant::now();

    let core_status = match &args.core_status_path {
        Some(path) => {
            let table = CoreStatus::from_path(path)?;
            log::info!("Loaded core status for {} frames", table.len());
            table
        }
        None => {
            log::warn!("No core status table given, all frame elements are scored as non-core");
            CoreStatus::default()
        }
    };
    let config = ScorerConfig {
        adjacency: if args.join_adjacent {
            Adjacency::Join
        } else {
            Adjacency::Keep
        },
        non_core_points: args.non_core_points,
        token_check: if args.lenient_tokens {
            TokenCheck::Lenient
        } else {
            TokenCheck::Strict
        },
        ..ScorerConfig::default()
    };
    let scorer = Scorer::new(config, core_status);

    let pairs = read_sentence_pairs(&args.gold_path, &args.pred_path)?;
    log::info!("Scoring {} sentences", pairs.len());

    let scores = score_corpus(&scorer, &pairs, args.num_threads)?;
    if args.sentence_scores {
        write_sentence_scores(&mut std::io::stderr().lock(), &scores)
            .map_err(|e| format!("Failed to write sentence scores: {}", e))?;
    }
    let corpus = sum_scores(&scores);

    let mut writer = create_report_writer(args.output.as_deref())?;
    write_table(&mut writer, &corpus.stats.compute_ratios(), args.format)
        .map_err(|e| format!("Failed to write scores: {}", e))?;
    if let Some(top_n) = args.error_report {
        write_error_report(&mut writer, &corpus.errors, top_n)
            .map_err(|e| format!("Failed to write error report: {}", e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to write scores: {}", e))?;

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}

/// Reads both files in lock step; any unreadable or malformed line, or one
/// file ending early, aborts the whole run.
pub fn read_sentence_pairs(gold_path: &Path, pred_path: &Path) -> Result<Vec<SentencePair>> {
    let mut pairs = Vec::new();
    for item in open_paired_lines(gold_path, pred_path)? {
        let (index, gold_line, pred_line) = item.map_err(|e| match e {
            PairError::Exhausted { side, index } => ScoreError::StreamLength {
                index,
                side: side.to_string(),
            }
            .to_string(),
            PairError::Io {
                side,
                index,
                message,
            } => format!("Sentence {}: could not read {} line: {}", index, side, message),
        })?;
        let parse = |line: &str, side: Side| {
            SentenceRecord::from_json(line).map_err(|source| {
                ScoreError::Record {
                    index,
                    side: side.to_string(),
                    source,
                }
                .to_string()
            })
        };
        pairs.push((parse(&gold_line, Side::Gold)?, parse(&pred_line, Side::Predicted)?));
    }
    Ok(pairs)
}

/// Scores every pair, keeping the per-sentence results in file order.
pub fn score_corpus(
    scorer: &Scorer,
    pairs: &[SentencePair],
    num_threads: usize,
) -> Result<Vec<SentenceScore>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("framescore-{}", i))
        .build()
        .map_err(|e| format!("Failed to create thread pool: {}", e))?;

    pool.install(|| {
        pairs
            .par_iter()
            .enumerate()
            .map(|(index, (gold, pred))| {
                scorer
                    .score_sentence(index, gold, pred)
                    .map_err(|e| e.to_string())
            })
            .collect()
    })
}

/// Sums per-sentence counts in index order, so the total does not depend
/// on how many threads scored the corpus.
pub fn sum_scores(scores: &[SentenceScore]) -> SentenceScore {
    scores
        .iter()
        .fold(SentenceScore::default(), |mut acc, score| {
            acc.stats += &score.stats;
            acc.errors += &score.errors;
            acc
        })
}

pub fn write_sentence_scores<W: Write>(
    writer: &mut W,
    scores: &[SentenceScore],
) -> std::io::Result<()> {
    for (index, score) in scores.iter().enumerate() {
        if let Some(total) = score.stats.get(Category::Total) {
            writeln!(writer, "{}", sentence_line(index, total))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::CoreStatus;

    const GOLD: [&str; 2] = [
        r#"{"tokens": ["The", "barn", "roof", "leaked"], "frames": [{"target": {"name": "Building_subparts", "spans": [{"start": 2, "end": 3}]}, "annotationSets": [{"frameElements": [{"name": "Whole", "spans": [{"start": 1, "end": 2}]}]}]}], "wsl": [{"start": 0, "end": 1, "name": "NT", "text": "The"}], "ner": [], "pos": []}"#,
        r#"{"tokens": ["It", "rained", "Monday"], "frames": [{"target": {"name": "Precipitation", "spans": [{"start": 1, "end": 2}]}, "annotationSets": [{"frameElements": []}]}], "wsl": [{"start": 0, "end": 1, "name": "NT", "text": "It"}], "ner": [{"start": 2, "end": 3, "name": "DATE", "text": "Monday"}], "pos": []}"#,
    ];

    const PRED: [&str; 2] = [
        r#"{"tokens": ["The", "barn", "roof", "leaked"], "frames": [{"target": {"name": "Building_subparts", "spans": [{"start": 2, "end": 3}]}, "annotationSets": [{"frameElements": [{"name": "Whole", "spans": [{"start": 1, "end": 2}]}]}]}]}"#,
        r#"{"tokens": ["It", "rained", "Monday"], "frames": [{"target": {"name": "Weather", "spans": [{"start": 1, "end": 2}]}, "annotationSets": [{"frameElements": []}]}]}"#,
    ];

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn scorer() -> Scorer {
        let core_status =
            CoreStatus::from_json(r#"{"Building_subparts": {"Whole": "Core"}}"#).unwrap();
        Scorer::new(ScorerConfig::default(), core_status)
    }

    #[test]
    fn test_read_and_score_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &GOLD);
        let pred = write_lines(dir.path(), "pred.json", &PRED);

        let pairs = read_sentence_pairs(&gold, &pred).unwrap();
        assert_eq!(pairs.len(), 2);

        let corpus = sum_scores(&score_corpus(&scorer(), &pairs, 1).unwrap());
        let frames = corpus
            .stats
            .get(Category::FramesCorrectTargetsOnly)
            .unwrap();
        assert_eq!((frames.numer, frames.p_denom, frames.r_denom), (1.0, 2.0, 2.0));

        // Core "Whole" is matched in sentence 0; sentence 1 has no arguments
        let total = corpus.stats.get(Category::Total).unwrap();
        assert_eq!((total.numer, total.p_denom, total.r_denom), (2.0, 3.0, 3.0));

        // Monday is a frame-evoking date, so it is a required target
        assert_eq!(corpus.errors.miss.get("Monday_?"), Some(&1));
    }

    #[test]
    fn test_parallel_scoring_matches_sequential() {
        let gold_lines: Vec<&str> = GOLD.iter().cycle().take(40).copied().collect();
        let pred_lines: Vec<&str> = PRED.iter().cycle().take(40).copied().collect();
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &gold_lines);
        let pred = write_lines(dir.path(), "pred.json", &pred_lines);
        let pairs = read_sentence_pairs(&gold, &pred).unwrap();

        let sequential = sum_scores(&score_corpus(&scorer(), &pairs, 1).unwrap());
        let parallel = sum_scores(&score_corpus(&scorer(), &pairs, 4).unwrap());
        assert_eq!(sequential.stats, parallel.stats);
        assert_eq!(sequential.errors, parallel.errors);
    }

    #[test]
    fn test_inexact_points_sum_identically_across_threads() {
        let gold_lines: Vec<&str> = GOLD.iter().cycle().take(64).copied().collect();
        let pred_lines: Vec<&str> = PRED.iter().cycle().take(64).copied().collect();
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &gold_lines);
        let pred = write_lines(dir.path(), "pred.json", &pred_lines);
        let pairs = read_sentence_pairs(&gold, &pred).unwrap();

        let config = ScorerConfig {
            non_core_points: 0.1,
            ..ScorerConfig::default()
        };
        let scorer = Scorer::new(config, CoreStatus::default());
        let sequential = sum_scores(&score_corpus(&scorer, &pairs, 1).unwrap());
        for threads in [2, 3, 8] {
            let parallel = sum_scores(&score_corpus(&scorer, &pairs, threads).unwrap());
            assert_eq!(sequential.stats, parallel.stats);
        }
    }

    #[test]
    fn test_sentence_scores_in_file_order() {
        let gold_lines: Vec<&str> = GOLD.iter().cycle().take(20).copied().collect();
        let pred_lines: Vec<&str> = PRED.iter().cycle().take(20).copied().collect();
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &gold_lines);
        let pred = write_lines(dir.path(), "pred.json", &pred_lines);
        let pairs = read_sentence_pairs(&gold, &pred).unwrap();

        let scores = score_corpus(&scorer(), &pairs, 4).unwrap();
        let mut out = Vec::new();
        write_sentence_scores(&mut out, &scores).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 20);
        for (index, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("Sentence ID={}:", index)));
        }
        assert_eq!(
            lines[0],
            "Sentence ID=0: Recall=1.00000 (2.0/2.0) Precision=1.00000 (2.0/2.0) Fscore=1.00000"
        );
    }

    #[test]
    fn test_unequal_line_counts_err() {
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &GOLD);
        let pred = write_lines(dir.path(), "pred.json", &PRED[..1]);
        let err = read_sentence_pairs(&gold, &pred).unwrap_err();
        assert_eq!(
            err,
            "Sentence 1: predicted file ended before the other one"
        );
    }

    #[test]
    fn test_malformed_line_err() {
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &GOLD);
        let pred = write_lines(dir.path(), "pred.json", &[PRED[0], "{not json"]);
        let err = read_sentence_pairs(&gold, &pred).unwrap_err();
        assert!(err.starts_with("Sentence 1: malformed predicted record"));
    }

    #[test]
    fn test_token_mismatch_aborts_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let gold = write_lines(dir.path(), "gold.json", &GOLD);
        let pred = write_lines(dir.path(), "pred.json", &[PRED[1], PRED[0]]);
        let pairs = read_sentence_pairs(&gold, &pred).unwrap();
        let err = score_corpus(&scorer(), &pairs, 2).unwrap_err();
        assert!(err.contains("gold and predicted inputs do not match"));
    }
}
