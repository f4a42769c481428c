//! Projection masks and their evaluation.

mod evaluator;
mod mask;

pub use evaluator::{decide, Decision, Projection};
pub use mask::{SelectMask, SelectMode, SelectValue};
