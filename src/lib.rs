pub mod cli;
pub mod detect;
pub mod error;
pub mod formatters;
pub mod ingest;
pub mod model;
pub mod output;
pub mod report;
pub mod resolve;
