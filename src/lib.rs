pub mod app;
pub mod cli;
pub mod config;
pub mod git;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod shotness;
pub mod uast;
pub mod version;
