pub mod cli;
pub mod commands;
pub mod eval;
pub mod utils;
