//! Element-set ingestion, orbit regimes and fleet selection

mod element_set;
mod fleet;
mod regime;
pub(crate) mod source;

pub use element_set::*;
pub use fleet::*;
pub use regime::*;
pub use source::*;
