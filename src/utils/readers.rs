use super::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read as ioRead};
use std::path::Path;

pub type RecordReader = BufReader<Box<dyn ioRead>>;

pub fn open_record_reader(path: &Path) -> Result<RecordReader> {
    fn is_gzipped(path: &Path) -> bool {
        let path_str = path.to_string_lossy().to_lowercase();
        path_str.ends_with(".gz") || path_str.ends_with(".gzip")
    }
    let file = File::open(path).map_err(|e| format!("File {}: {}", path.display(), e))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(format!("Invalid gzip header: {}", path.to_string_lossy()))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

/// Which side of a gold/predicted pair a line or record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Gold,
    Predicted,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Gold => write!(f, "gold"),
            Side::Predicted => write!(f, "predicted"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum PairError {
    Io { side: Side, index: usize, message: String },
    Exhausted { side: Side, index: usize },
}

/// Lock-step iterator over the lines of a gold and a predicted file.
///
/// Yields `(sentence_index, gold_line, predicted_line)`. Blank lines are
/// passed through; the caller decides what a blank record means. If one
/// stream ends before the other the iterator yields a single
/// `PairError::Exhausted` naming the shorter side and then stops.
pub struct PairedLines<G: BufRead, P: BufRead> {
    gold: Lines<G>,
    predicted: Lines<P>,
    index: usize,
    done: bool,
}

impl<G: BufRead, P: BufRead> PairedLines<G, P> {
    pub fn new(gold: G, predicted: P) -> Self {
        Self {
            gold: gold.lines(),
            predicted: predicted.lines(),
            index: 0,
            done: false,
        }
    }
}

impl<G: BufRead, P: BufRead> Iterator for PairedLines<G, P> {
    type Item = std::result::Result<(usize, String, String), PairError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.index;
        self.index += 1;
        let io_err = |side, e: std::io::Error| PairError::Io {
            side,
            index,
            message: e.to_string(),
        };
        let item = match (self.gold.next(), self.predicted.next()) {
            (None, None) => {
                self.done = true;
                return None;
            }
            (Some(_), None) => Err(PairError::Exhausted {
                side: Side::Predicted,
                index,
            }),
            (None, Some(_)) => Err(PairError::Exhausted {
                side: Side::Gold,
                index,
            }),
            (Some(Err(e)), _) => Err(io_err(Side::Gold, e)),
            (_, Some(Err(e))) => Err(io_err(Side::Predicted, e)),
            (Some(Ok(gold)), Some(Ok(pred))) => Ok((index, gold, pred)),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

pub fn open_paired_lines(
    gold_path: &Path,
    pred_path: &Path,
) -> Result<PairedLines<RecordReader, RecordReader>> {
    let gold = open_record_reader(gold_path)?;
    let pred = open_record_reader(pred_path)?;
    Ok(PairedLines::new(gold, pred))
}
