// Application layer - the dashboard controller and the view assembled
// from each fetched report.

pub mod controller;
pub mod error;
pub mod view;

pub use controller::*;
pub use error::*;
pub use view::*;
