use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("Invalid span {bounds:?}: {reason}")]
    InvalidSpan { bounds: Vec<usize>, reason: String },
    #[error("Cannot add non-adjacent spans: {0} + {1}")]
    NonAdjacent(String, String),
    #[error("Span {span} out of bounds for sequence of length {len}")]
    OutOfBounds { span: String, len: usize },
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Sentence {index}: {source}")]
    Span { index: usize, source: SpanError },
    #[error("Sentence {index}: gold and predicted inputs do not match ({reason})")]
    InputMismatch { index: usize, reason: String },
    #[error("Sentence {index}: {side} file ended before the other one")]
    StreamLength { index: usize, side: String },
    #[error("Sentence {index}: malformed {side} record: {source}")]
    Record {
        index: usize,
        side: String,
        source: serde_json::Error,
    },
}
