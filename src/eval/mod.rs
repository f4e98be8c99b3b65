pub mod core_status;
pub mod error;
pub mod record;
pub mod report;
pub mod scorer;
pub mod span;
pub mod stats;
pub mod tally;

pub use core_status::CoreStatus;
pub use error::{ScoreError, SpanError};
pub use record::SentenceRecord;
pub use report::OutputFormat;
pub use scorer::{Scorer, ScorerConfig, SentenceScore, TokenCheck};
pub use span::{Adjacency, Span};
pub use stats::{Category, Counts, Rates, RatesTable, StatsTable};
pub use tally::ErrorTally;
