//! Command line interface: argument definitions and value parsers

pub mod args;
pub mod memory_parser;

pub use args::{parse_args, validate_args, Args};
