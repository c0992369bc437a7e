//! Configure-price-quote primitives: the static catalog definition and the
//! discount pricing engine.

pub mod catalog;
pub mod pricing;
