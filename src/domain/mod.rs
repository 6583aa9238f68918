pub mod charts;
pub mod format;
pub mod products;

mod delta;
mod report;

pub use delta::*;
pub use report::*;
