use crate::{eval::OutputFormat, utils::Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="framescore",
          version=&**FULL_VERSION,
          about="Frame-semantic parse scorer",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Score predicted frame-semantic parses against gold annotations")]
    Score(ScoreArgs),
    #[clap(about = "Sentence Record Validator")]
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("score")))]
#[command(arg_required_else_help(true))]
pub struct ScoreArgs {
    #[clap(required = true)]
    #[clap(help = "Gold sentence records, one JSON object per line")]
    #[clap(value_name = "GOLD")]
    #[arg(value_parser = check_file_exists)]
    pub gold_path: PathBuf,

    #[clap(required = true)]
    #[clap(help = "Predicted sentence records, line-aligned with GOLD")]
    #[clap(value_name = "PREDICTIONS")]
    #[arg(value_parser = check_file_exists)]
    pub pred_path: PathBuf,

    #[clap(short = 'c')]
    #[clap(long = "core-status")]
    #[clap(help = "JSON table of frame element core status ({frame: {role: status}})")]
    #[clap(value_name = "CORE_STATUS")]
    #[arg(value_parser = check_file_exists)]
    pub core_status_path: Option<PathBuf>,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Write the score table to this file instead of stdout")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_output_path)]
    pub output: Option<PathBuf>,

    #[clap(long = "format")]
    #[clap(value_name = "FORMAT")]
    #[clap(help = "Score table format (text or csv)")]
    #[clap(default_value = "text")]
    pub format: OutputFormat,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(long = "sentence-scores")]
    #[clap(help = "Log total frame and argument scores of every sentence")]
    pub sentence_scores: bool,

    #[clap(long = "error-report")]
    #[clap(value_name = "N")]
    #[clap(help = "Append the N most frequent missed and extra targets to the report")]
    pub error_report: Option<usize>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "non-core-points")]
    #[clap(value_name = "POINTS")]
    #[clap(help = "Credit for a matched non-core frame element in partial credit rows")]
    #[clap(default_value = "0.5")]
    #[arg(value_parser = ensure_unit_float)]
    pub non_core_points: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "join-adjacent")]
    #[clap(help = "Merge end-to-start adjacent ranges when building spans")]
    pub join_adjacent: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "lenient-tokens")]
    #[clap(help = "Warn instead of failing when gold and predicted tokens differ")]
    pub lenient_tokens: bool,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("validate")))]
#[command(arg_required_else_help(true))]
pub struct ValidateArgs {
    #[clap(required = true)]
    #[clap(help = "Sentence records, one JSON object per line")]
    #[clap(value_name = "RECORDS")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: PathBuf,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "join-adjacent")]
    #[clap(help = "Merge end-to-start adjacent ranges when building spans")]
    pub join_adjacent: bool,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_output_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(path.to_path_buf())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}
