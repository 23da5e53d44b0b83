#![forbid(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod legacy;
pub mod model;
pub mod time;

pub use error::Error;
pub use evaluator::evaluate;
pub use legacy::{LegacyInput, adapt_legacy_slides};
pub use time::Clock;
