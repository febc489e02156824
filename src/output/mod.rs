//! Output formatting and display module

pub mod formats;
pub mod reports;

pub use formats::{
    decode_binary, decode_report, encode_binary, render_decoded, render_metrics, serialize_document,
    DecodedReport, OutputFormat, REPORT_MAGIC,
};
pub use reports::{format_compact_table, render_generic, render_text, TextOptions, DEFAULT_SECTION_LIMIT};
