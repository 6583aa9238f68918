pub mod api;
pub mod application;
pub mod cli;
pub mod domain;

pub use api::{ReportClient, ReportQuery, ReportSource};
pub use domain::*;
