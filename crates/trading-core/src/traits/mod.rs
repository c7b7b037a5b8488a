//! Core traits.

mod indicator;
mod strategy;

pub use indicator::Indicator;
pub use strategy::{MarketView, Strategy};
