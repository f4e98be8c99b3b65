mod io_utils;
mod readers;
mod util;

pub use io_utils::create_report_writer;
pub use readers::{open_paired_lines, open_record_reader, PairError, PairedLines, RecordReader, Side};
pub use util::{handle_error_and_exit, Result};
