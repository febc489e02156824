//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{analyze_repository, rerender_report, run, AnalysisOptions};
pub use initialization::{
    build_shotness_config,
    colours_enabled,
    configure_logging,
    load_configuration,
    resolve_output_format,
};
