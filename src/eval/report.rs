use super::{
    stats::{Counts, RateRow, RatesTable},
    tally::ErrorTally,
};
use std::{io, str::FromStr};

const COLUMNS: [&str; 9] = ["Numer", "PDenom", "RDenom", "P", "R", "F", "T", "N", "Acc"];
const LABEL_WIDTH: usize = 58;
const COLUMN_WIDTH: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Invalid output format: {}", format)),
        }
    }
}

fn ratio_text(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{:.5}", v))
}

fn row_fields(row: &RateRow, undefined: &str) -> Vec<String> {
    let ratio = |value: Option<f64>| value.map_or_else(|| undefined.to_string(), |v| format!("{:.5}", v));
    let counts = &row.counts;
    let (t, n, acc) = match counts.tally {
        Some(tally) => (
            tally.correct.to_string(),
            tally.total.to_string(),
            ratio(row.rates.accuracy),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    vec![
        format!("{:.1}", counts.numer),
        format!("{:.1}", counts.p_denom),
        format!("{:.1}", counts.r_denom),
        ratio(row.rates.precision),
        ratio(row.rates.recall),
        ratio(row.rates.f_score),
        t,
        n,
        acc,
    ]
}

pub fn write_table<W: io::Write>(
    writer: &mut W,
    table: &RatesTable,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            write!(writer, "{:<width$}", "", width = LABEL_WIDTH)?;
            for column in COLUMNS {
                write!(writer, "{:>width$}", column, width = COLUMN_WIDTH)?;
            }
            writeln!(writer)?;
            for row in &table.rows {
                write!(
                    writer,
                    "{:<width$}",
                    row.category.label(),
                    width = LABEL_WIDTH
                )?;
                for field in row_fields(row, "NaN") {
                    write!(writer, "{:>width$}", field, width = COLUMN_WIDTH)?;
                }
                writeln!(writer)?;
            }
        }
        OutputFormat::Csv => {
            writeln!(writer, "Category,{}", COLUMNS.join(","))?;
            for row in &table.rows {
                writeln!(
                    writer,
                    "\"{}\",{}",
                    row.category.label(),
                    row_fields(row, "").join(",")
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_error_report<W: io::Write>(
    writer: &mut W,
    errors: &ErrorTally,
    top_n: usize,
) -> io::Result<()> {
    for (heading, entries) in [
        ("Missed targets", errors.top_misses(top_n)),
        ("Extra targets", errors.top_extras(top_n)),
    ] {
        writeln!(writer)?;
        writeln!(writer, "{}:", heading)?;
        for (key, count) in entries {
            writeln!(writer, "{:>8}  {}", count, key)?;
        }
    }
    Ok(())
}

/// Per-sentence summary in the fnSemScore layout.
pub fn sentence_line(index: usize, counts: &Counts) -> String {
    let rates = counts.rates();
    format!(
        "Sentence ID={}: Recall={} ({:.1}/{:.1}) Precision={} ({:.1}/{:.1}) Fscore={}",
        index,
        ratio_text(rates.recall),
        counts.numer,
        counts.r_denom,
        ratio_text(rates.precision),
        counts.numer,
        counts.p_denom,
        ratio_text(rates.f_score)
    )
}
