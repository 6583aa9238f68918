mod client;
mod query;

pub use client::*;
pub use query::*;

/// Path of the report endpoint under the configured base URL.
pub const REPORT_PATH: &str = "api/graficos/dados-relatorio/";
