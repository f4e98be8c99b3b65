use crate::cli::ValidateArgs;
use crate::eval::{Adjacency, SentenceRecord, SpanError};
use crate::utils::{open_record_reader, Result};
use std::io::BufRead;

pub fn validate(args: ValidateArgs) -> Result<()> {
    let reader = open_record_reader(&args.input_path)?;
    let adjacency = if args.join_adjacent {
        Adjacency::Join
    } else {
        Adjacency::Keep
    };
    let mut error_count = 0;
    let mut success_count = 0;
    let mut token_counts = Vec::new();
    let mut frame_counts = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading line {}: {}", index + 1, e))?;
        match check_record(&line, adjacency) {
            Ok(record) => {
                token_counts.push(record.tokens.len());
                frame_counts.push(record.frames.len());
                success_count += 1;
            }
            Err(e) => {
                log::error!("Sentence {}: {}", index, e);
                error_count += 1;
            }
        }
    }

    let total = success_count + error_count;
    if total == 0 {
        log::warn!("No sentence records in {}", args.input_path.display());
        return Ok(());
    }

    let token_stats = calculate_stats(&token_counts);
    let frame_stats = calculate_stats(&frame_counts);
    log::info!(
        "Tokens per sentence - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
        token_stats.min,
        token_stats.max,
        token_stats.median,
        token_stats.mean,
        token_stats.std_dev
    );
    log::info!(
        "Frames per sentence - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
        frame_stats.min,
        frame_stats.max,
        frame_stats.median,
        frame_stats.mean,
        frame_stats.std_dev
    );

    let success_percentage = (success_count as f64 / total as f64) * 100.0;
    let error_percentage = (error_count as f64 / total as f64) * 100.0;
    match error_count {
        0 => log::info!("Validation successful. Sentences pass={}", success_count),
        _ => log::info!(
            "Validation failed. Sentences pass={} ({:.2}%), fail={} ({:.2}%)",
            success_count,
            success_percentage,
            error_count,
            error_percentage
        ),
    }

    Ok(())
}

/// Parses a record and builds every span it mentions, checking that each
/// one lies within the sentence.
pub fn check_record(line: &str, adjacency: Adjacency) -> std::result::Result<SentenceRecord, String> {
    let record = SentenceRecord::from_json(line).map_err(|e| format!("Malformed record: {}", e))?;
    check_spans(&record, adjacency).map_err(|e| e.to_string())?;
    Ok(record)
}

fn check_spans(record: &SentenceRecord, adjacency: Adjacency) -> std::result::Result<(), SpanError> {
    let num_tokens = record.tokens.len();
    for frame in &record.frames {
        frame.target_span(adjacency)?.ensure_within(num_tokens)?;
        for element in frame.top_frame_elements() {
            element.span(adjacency)?.ensure_within(num_tokens)?;
        }
    }
    for entry in record.wsl.iter().chain(&record.ner).chain(&record.pos) {
        entry.span()?.ensure_within(num_tokens)?;
    }
    Ok(())
}

fn calculate_stats(data: &[usize]) -> Stats {
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let len = sorted.len();
    if len == 0 {
        return Stats::default();
    }
    let median = if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) as f64 / 2.0
    } else {
        sorted[len / 2] as f64
    };
    let sum: usize = sorted.iter().sum();
    let mean = sum as f64 / len as f64;
    let std_dev = (sorted
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / len as f64)
        .sqrt();
    Stats {
        min: *sorted.first().unwrap_or(&0),
        max: *sorted.last().unwrap_or(&0),
        mean,
        median,
        std_dev,
    }
}

#[derive(Debug, Default, PartialEq)]
struct Stats {
    min: usize,
    max: usize,
    mean: f64,
    median: f64,
    std_dev: f64,
}
