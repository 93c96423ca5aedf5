//! User interface panels and controls

mod panels;
mod time_controls;

pub use panels::*;
pub use time_controls::*;
